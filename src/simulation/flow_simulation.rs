use ndarray::{Array1, ArrayView1, ArrayViewMut1};

use super::model::FlowModel;
use crate::core::TimeSeries;
use crate::errors::Result;
use crate::integrator::{IntegratorCore, OdeIntegrator};

/// Integrates the accumulated flows of a flow model.
///
/// The populations are reconstructed from the flows: every new flow time point yields the
/// population `population[last] + map(flows[t] - flows[last])`, where `last` is the last time
/// point before the call to `advance`. Existing population points are never recomputed, so the
/// last population may be edited between calls.
#[derive(Clone, Debug)]
pub struct FlowSimulation<M: FlowModel> {
    model: M,
    integrator: OdeIntegrator,
    result: TimeSeries,
    flows: TimeSeries,
    dt: f64,
}

impl<M: FlowModel> FlowSimulation<M> {
    pub fn new(model: M, t0: f64, dt: f64) -> Self {
        let result = TimeSeries::with_initial(t0, model.get_initial_values().view());
        let flows = TimeSeries::with_initial(t0, model.get_initial_flows().view());
        Self {
            model,
            integrator: OdeIntegrator::default(),
            result,
            flows,
            dt,
        }
    }

    pub fn set_integrator(&mut self, core: IntegratorCore) {
        self.integrator.set_core(core);
    }

    pub fn get_integrator(&self) -> &IntegratorCore {
        self.integrator.get_core()
    }

    /// Advance the flows to `tmax`, then fill in the populations of all new time points.
    ///
    /// # Panics
    ///
    /// Panics if populations and flows do not have the same number of time points.
    pub fn advance(&mut self, tmax: f64) -> Result<ArrayView1<'_, f64>> {
        assert_eq!(
            self.result.get_num_time_points(),
            self.flows.get_num_time_points(),
            "Populations and flows must have the same time points"
        );

        let model = &self.model;
        let initial_flows = self.flows.get_last_value().to_owned();
        let initial_population = self.result.get_last_value().to_owned();
        let mut flow_difference = Array1::<f64>::zeros(initial_flows.len());
        let mut population = Array1::<f64>::zeros(initial_population.len());

        let outcome = self.integrator.advance(
            |flows: ArrayView1<f64>, t: f64, dflows: ArrayViewMut1<f64>| {
                flow_difference.assign(&flows);
                flow_difference -= &initial_flows;
                model.flows_to_derivatives(flow_difference.view(), population.view_mut());
                population += &initial_population;
                model.get_flows(population.view(), population.view(), t, dflows);
            },
            tmax,
            &mut self.dt,
            &mut self.flows,
        );

        self.compute_population_results();
        outcome?;
        Ok(self.result.get_last_value())
    }

    fn compute_population_results(&mut self) {
        let last_index = self.result.get_num_time_points() - 1;
        let base_flows = self.flows.get_value(last_index).to_owned();
        let base_population = self.result.get_last_value().to_owned();
        let mut flow_difference = Array1::<f64>::zeros(base_flows.len());

        for index in last_index + 1..self.flows.get_num_time_points() {
            flow_difference.assign(&self.flows.get_value(index));
            flow_difference -= &base_flows;
            let mut population = self.result.add_time_point(self.flows.get_time(index));
            self.model
                .flows_to_derivatives(flow_difference.view(), population.view_mut());
            population += &base_population;
        }
    }

    pub fn get_result(&self) -> &TimeSeries {
        &self.result
    }

    pub fn get_result_mut(&mut self) -> &mut TimeSeries {
        &mut self.result
    }

    pub fn get_flows(&self) -> &TimeSeries {
        &self.flows
    }

    pub fn get_flows_mut(&mut self) -> &mut TimeSeries {
        &mut self.flows
    }

    pub fn into_results(self) -> (TimeSeries, TimeSeries) {
        (self.result, self.flows)
    }

    pub fn get_model(&self) -> &M {
        &self.model
    }

    pub fn get_model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn get_dt(&self) -> f64 {
        self.dt
    }
}

/// Simulate `model` from `t0` to `tmax`, returning populations and accumulated flows.
pub fn simulate_flows<M: FlowModel + Clone>(
    t0: f64,
    tmax: f64,
    dt: f64,
    model: &M,
    integrator: Option<IntegratorCore>,
) -> Result<(TimeSeries, TimeSeries)> {
    let violations = model.check_constraints();
    if violations > 0 {
        log::warn!("Simulating a model with {violations} constraint violations");
    }
    let mut simulation = FlowSimulation::new(model.clone(), t0, dt);
    if let Some(core) = integrator {
        simulation.set_integrator(core);
    }
    simulation.advance(tmax)?;
    Ok(simulation.into_results())
}
