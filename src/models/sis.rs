//! SIS model, infected individuals become susceptible again.

use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ParameterSampling;
use super::set_normal;
use crate::core::{Category, Populations, UncertainValue, categories};
use crate::simulation::CompartmentalModel;

pub use super::sir::SirParameters as SisParameters;

#[derive(Category, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfectionState {
    Susceptible,
    Infected,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SisModel {
    pub populations: Populations<(InfectionState,)>,
    pub parameters: SisParameters,
}

impl SisModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompartmentalModel for SisModel {
    fn get_initial_values(&self) -> Array1<f64> {
        self.populations.get_compartments()
    }

    fn get_derivatives(
        &self,
        pop: ArrayView1<f64>,
        y: ArrayView1<f64>,
        t: f64,
        mut dydt: ArrayViewMut1<f64>,
    ) {
        let susceptible = InfectionState::Susceptible.index();
        let infected = InfectionState::Infected.index();
        let coefficient = self
            .parameters
            .contact_coefficient(t, self.populations.get_total());

        let infections = coefficient * y[susceptible] * pop[infected];
        let recoveries = y[infected] / self.parameters.time_infected.value();
        dydt[susceptible] = recoveries - infections;
        dydt[infected] = infections - recoveries;
    }

    fn check_constraints(&self) -> usize {
        self.parameters.check_constraints() + self.populations.check_constraints()
    }

    fn apply_constraints(&mut self) -> usize {
        self.parameters.apply_constraints() + self.populations.apply_constraints()
    }

    fn compartment_names(&self) -> Vec<String> {
        categories::<InfectionState>()
            .map(|state| match state {
                InfectionState::Susceptible => "S".to_string(),
                InfectionState::Infected => "I".to_string(),
            })
            .collect()
    }
}

impl ParameterSampling for SisModel {
    fn set_params_distributions_normal(&mut self, relative_dev: f64) {
        self.parameters.set_distributions_normal(relative_dev);
        set_normal(
            self.populations.get_mut((InfectionState::Infected,)),
            relative_dev,
            None,
        );
    }

    fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.parameters.draw_sample(rng);
        self.populations
            .draw_sample_with_total_remainder(rng, (InfectionState::Susceptible,));
        self.apply_constraints();
    }

    fn uncertain_values(&self) -> Vec<(String, &UncertainValue)> {
        let mut values: Vec<(String, &UncertainValue)> = self
            .compartment_names()
            .into_iter()
            .zip(self.populations.iter())
            .collect();
        values.extend(self.parameters.uncertain_values());
        values
    }

    fn uncertain_values_mut(&mut self) -> Vec<(String, &mut UncertainValue)> {
        let names = self.compartment_names();
        let mut values: Vec<(String, &mut UncertainValue)> =
            names.into_iter().zip(self.populations.iter_mut()).collect();
        values.extend(self.parameters.uncertain_values_mut());
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::simulate;

    fn model(contacts: f64) -> SisModel {
        let mut model = SisModel::new();
        model.populations.set((InfectionState::Susceptible,), 990.);
        model.populations.set((InfectionState::Infected,), 10.);
        model.parameters.time_infected.set_value(5.);
        model
            .parameters
            .contact_patterns
            .get_contact_matrices_mut()[0]
            .get_baseline_mut()
            .fill(contacts);
        model
    }

    #[test]
    fn approaches_endemic_equilibrium() {
        // equilibrium S* = N / (contacts * transmission * time_infected) = 1000 / 2
        let result = simulate(0., 200., 0.1, &model(0.4), None).unwrap();
        let last = result.get_last_value();
        assert!((last.sum() - 1000.).abs() < 1e-6);
        assert!((last[0] - 500.).abs() < 1.);
        assert!((last[1] - 500.).abs() < 1.);
    }

    #[test]
    fn dies_out_below_threshold() {
        let result = simulate(0., 200., 0.1, &model(0.1), None).unwrap();
        assert!(result.get_last_value()[1] < 1.);
    }
}
