use ndarray::{Array1, ArrayView1, ArrayViewMut1};

/// A model whose state is a flat vector of compartments.
///
/// `pop` is the population the force of infection refers to and `y` the state being evolved;
/// for a single closed population both are the same vector. Derivative outputs are zeroed
/// before every call.
pub trait CompartmentalModel {
    fn get_initial_values(&self) -> Array1<f64>;

    fn get_derivatives(
        &self,
        pop: ArrayView1<f64>,
        y: ArrayView1<f64>,
        t: f64,
        dydt: ArrayViewMut1<f64>,
    );

    /// Log every invalid parameter or population value and return their number.
    fn check_constraints(&self) -> usize;

    /// Replace invalid values by valid defaults and return the number of replacements.
    fn apply_constraints(&mut self) -> usize;

    /// Names of the compartments in flat index order.
    fn compartment_names(&self) -> Vec<String>;

    fn get_num_compartments(&self) -> usize {
        self.get_initial_values().len()
    }
}

/// A model whose derivatives decompose into flows between compartments.
///
/// The flows accumulate the amount moved along each transition, the derivative of every
/// compartment is the sum of its incoming minus its outgoing flow derivatives.
pub trait FlowModel: CompartmentalModel {
    /// Source and target compartment of every flow.
    fn flow_transitions(&self) -> &[(usize, usize)];

    fn get_flows(
        &self,
        pop: ArrayView1<f64>,
        y: ArrayView1<f64>,
        t: f64,
        flows: ArrayViewMut1<f64>,
    );

    fn get_num_flows(&self) -> usize {
        self.flow_transitions().len()
    }

    fn get_initial_flows(&self) -> Array1<f64> {
        Array1::zeros(self.get_num_flows())
    }

    /// Map flows (or flow derivatives) onto compartments (or compartment derivatives).
    fn flows_to_derivatives(&self, flows: ArrayView1<f64>, mut dydt: ArrayViewMut1<f64>) {
        dydt.fill(0.);
        for (flow, &(source, target)) in flows.iter().zip(self.flow_transitions()) {
            dydt[source] -= flow;
            dydt[target] += flow;
        }
    }

    fn flow_names(&self) -> Vec<String> {
        let names = self.compartment_names();
        self.flow_transitions()
            .iter()
            .map(|&(source, target)| format!("{}->{}", names[source], names[target]))
            .collect()
    }
}

/// Derivatives of a flow model computed through its flows.
pub fn derivatives_from_flows<M: FlowModel + ?Sized>(
    model: &M,
    pop: ArrayView1<f64>,
    y: ArrayView1<f64>,
    t: f64,
    dydt: ArrayViewMut1<f64>,
) {
    let mut flows = Array1::<f64>::zeros(model.get_num_flows());
    model.get_flows(pop, y, t, flows.view_mut());
    model.flows_to_derivatives(flows.view(), dydt);
}
