//! Simulation drivers
//!
//! `Simulation` integrates the compartments of a `CompartmentalModel` directly, while
//! `FlowSimulation` integrates the accumulated flows of a `FlowModel` and reconstructs the
//! compartments from them.

mod flow_simulation;
mod model;
#[allow(clippy::module_inception)]
mod simulation;

pub use flow_simulation::{FlowSimulation, simulate_flows};
pub use model::{CompartmentalModel, FlowModel, derivatives_from_flows};
pub use simulation::{Simulation, simulate};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::{EulerIntegratorCore, IntegratorCore};
    use ndarray::{Array1, ArrayView1, ArrayViewMut1, array};

    /// Two-step decay chain A -> B -> C.
    #[derive(Clone, Debug)]
    struct Chain {
        initial: Array1<f64>,
        rates: [f64; 2],
        transitions: Vec<(usize, usize)>,
    }

    impl Chain {
        fn new() -> Self {
            Self {
                initial: array![100., 20., 0.],
                rates: [0.5, 0.25],
                transitions: vec![(0, 1), (1, 2)],
            }
        }
    }

    impl CompartmentalModel for Chain {
        fn get_initial_values(&self) -> Array1<f64> {
            self.initial.clone()
        }

        fn get_derivatives(
            &self,
            pop: ArrayView1<f64>,
            y: ArrayView1<f64>,
            t: f64,
            dydt: ArrayViewMut1<f64>,
        ) {
            derivatives_from_flows(self, pop, y, t, dydt);
        }

        fn check_constraints(&self) -> usize {
            self.rates.iter().filter(|&&rate| rate < 0.).count()
        }

        fn apply_constraints(&mut self) -> usize {
            0
        }

        fn compartment_names(&self) -> Vec<String> {
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        }
    }

    impl FlowModel for Chain {
        fn flow_transitions(&self) -> &[(usize, usize)] {
            &self.transitions
        }

        fn get_flows(
            &self,
            _pop: ArrayView1<f64>,
            y: ArrayView1<f64>,
            _t: f64,
            mut flows: ArrayViewMut1<f64>,
        ) {
            flows[0] = self.rates[0] * y[0];
            flows[1] = self.rates[1] * y[1];
        }
    }

    fn euler() -> Option<IntegratorCore> {
        Some(EulerIntegratorCore::new().into())
    }

    #[test]
    fn flow_names() {
        assert_eq!(Chain::new().flow_names(), vec!["A->B", "B->C"]);
    }

    #[test]
    fn simulation_conserves_total() {
        let result = simulate(0., 10., 0.5, &Chain::new(), None).unwrap();
        assert_eq!(result.get_last_time(), 10.);
        for (_, value) in result.iter() {
            assert!((value.sum() - 120.).abs() < 1e-9);
        }
    }

    #[test]
    fn advance_in_pieces() {
        let mut simulation = Simulation::new(Chain::new(), 0., 0.1);
        simulation.set_integrator(EulerIntegratorCore::new().into());
        simulation.advance(1.).unwrap();
        let points = simulation.get_result().get_num_time_points();
        simulation.advance(2.).unwrap();
        assert!(simulation.get_result().get_num_time_points() > points);
        assert_eq!(simulation.get_result().get_last_time(), 2.);
        assert_eq!(simulation.get_dt(), 0.1);
    }

    #[test]
    fn flows_match_populations() {
        let (populations, flows) = simulate_flows(0., 5., 0.1, &Chain::new(), euler()).unwrap();
        let reference = simulate(0., 5., 0.1, &Chain::new(), euler()).unwrap();

        assert_eq!(populations.get_num_time_points(), flows.get_num_time_points());
        assert_eq!(populations.get_num_time_points(), reference.get_num_time_points());
        for index in 0..flows.get_num_time_points() {
            let flow = flows.get_value(index);
            let population = populations.get_value(index);
            assert_eq!(populations.get_time(index), flows.get_time(index));
            assert!((population[0] - (100. - flow[0])).abs() < 1e-10);
            assert!((population[1] - (20. + flow[0] - flow[1])).abs() < 1e-10);
            assert!((population[2] - flow[1]).abs() < 1e-10);
            for (a, b) in population.iter().zip(reference.get_value(index).iter()) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn flow_simulation_keeps_edited_population() {
        let mut simulation = FlowSimulation::new(Chain::new(), 0., 0.1);
        simulation.set_integrator(EulerIntegratorCore::new().into());
        simulation.advance(1.).unwrap();

        // move ten individuals from outside into A
        simulation.get_result_mut().get_last_value_mut()[0] += 10.;
        let edited = simulation.get_result().get_last_value().to_owned();
        let index = simulation.get_result().get_num_time_points() - 1;

        simulation.advance(2.).unwrap();
        assert_eq!(simulation.get_result().get_value(index), edited);
        assert_eq!(
            simulation.get_result().get_num_time_points(),
            simulation.get_flows().get_num_time_points()
        );
        assert!((simulation.get_result().get_last_value().sum() - 130.).abs() < 1e-9);
    }
}
