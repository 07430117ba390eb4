//! SIR model with a single population group.

use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    ParameterSampling, TOL_TIMES, apply_probability, apply_time, check_probability, check_time,
    set_normal,
};
use crate::contacts::{ContactMatrixGroup, UncertainContactMatrix};
use crate::core::{Category, Populations, UncertainValue, categories};
use crate::simulation::{CompartmentalModel, FlowModel, derivatives_from_flows};

#[derive(Category, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfectionState {
    Susceptible,
    Infected,
    Recovered,
}

impl InfectionState {
    pub fn short_name(&self) -> &'static str {
        match self {
            InfectionState::Susceptible => "S",
            InfectionState::Infected => "I",
            InfectionState::Recovered => "R",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SirParameters {
    /// Mean time in days an individual stays infected.
    pub time_infected: UncertainValue,
    pub transmission_probability_on_contact: UncertainValue,
    /// Contact rates of the single group, a 1x1 matrix group.
    pub contact_patterns: UncertainContactMatrix,
}

impl Default for SirParameters {
    fn default() -> Self {
        Self {
            time_infected: UncertainValue::new(1.),
            transmission_probability_on_contact: UncertainValue::new(1.),
            contact_patterns: ContactMatrixGroup::new(1, 1).into(),
        }
    }
}

impl SirParameters {
    pub fn check_constraints(&self) -> usize {
        check_time("TimeInfected", &self.time_infected)
            + check_probability(
                "TransmissionProbabilityOnContact",
                &self.transmission_probability_on_contact,
            )
    }

    pub fn apply_constraints(&mut self) -> usize {
        apply_time("TimeInfected", &mut self.time_infected, TOL_TIMES)
            + apply_probability(
                "TransmissionProbabilityOnContact",
                &mut self.transmission_probability_on_contact,
            )
    }

    pub fn set_distributions_normal(&mut self, relative_dev: f64) {
        set_normal(&mut self.time_infected, relative_dev, None);
        set_normal(
            &mut self.transmission_probability_on_contact,
            relative_dev,
            Some(1.),
        );
    }

    /// Draw all parameters and new contact dampings, configured dampings are kept.
    pub fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.time_infected.draw_sample(rng);
        self.transmission_probability_on_contact.draw_sample(rng);
        self.contact_patterns.draw_sample(rng, true);
    }

    pub(crate) fn uncertain_values(&self) -> Vec<(String, &UncertainValue)> {
        vec![
            ("TimeInfected".to_string(), &self.time_infected),
            (
                "TransmissionProbabilityOnContact".to_string(),
                &self.transmission_probability_on_contact,
            ),
        ]
    }

    pub(crate) fn uncertain_values_mut(&mut self) -> Vec<(String, &mut UncertainValue)> {
        vec![
            ("TimeInfected".to_string(), &mut self.time_infected),
            (
                "TransmissionProbabilityOnContact".to_string(),
                &mut self.transmission_probability_on_contact,
            ),
        ]
    }

    /// Effective contact rate per susceptible and infected individual at time `t`.
    pub(crate) fn contact_coefficient(&self, t: f64, total: f64) -> f64 {
        if total <= 0. {
            return 0.;
        }
        let contacts = self.contact_patterns.get_contact_matrices().get_matrix_at(t);
        contacts[[0, 0]] * self.transmission_probability_on_contact.value() / total
    }
}

/// Susceptible, infected and recovered individuals with flows S -> I -> R.
///
/// The force of infection is normalized by the total population of the initial values.
#[derive(Clone, Debug, PartialEq)]
pub struct SirModel {
    pub populations: Populations<(InfectionState,)>,
    pub parameters: SirParameters,
    transitions: Vec<(usize, usize)>,
}

impl Default for SirModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SirModel {
    pub fn new() -> Self {
        let flat = |state: InfectionState| state.index();
        Self {
            populations: Populations::new(),
            parameters: SirParameters::default(),
            transitions: vec![
                (
                    flat(InfectionState::Susceptible),
                    flat(InfectionState::Infected),
                ),
                (flat(InfectionState::Infected), flat(InfectionState::Recovered)),
            ],
        }
    }
}

impl CompartmentalModel for SirModel {
    fn get_initial_values(&self) -> Array1<f64> {
        self.populations.get_compartments()
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
        self.parameters.check_constraints() + self.populations.check_constraints()
    }

    fn apply_constraints(&mut self) -> usize {
        self.parameters.apply_constraints() + self.populations.apply_constraints()
    }

    fn compartment_names(&self) -> Vec<String> {
        categories::<InfectionState>()
            .map(|state| state.short_name().to_string())
            .collect()
    }
}

impl FlowModel for SirModel {
    fn flow_transitions(&self) -> &[(usize, usize)] {
        &self.transitions
    }

    fn get_flows(
        &self,
        pop: ArrayView1<f64>,
        y: ArrayView1<f64>,
        t: f64,
        mut flows: ArrayViewMut1<f64>,
    ) {
        let susceptible = InfectionState::Susceptible.index();
        let infected = InfectionState::Infected.index();
        let coefficient = self
            .parameters
            .contact_coefficient(t, self.populations.get_total());

        flows[0] = coefficient * y[susceptible] * pop[infected];
        flows[1] = y[infected] / self.parameters.time_infected.value();
    }
}

impl ParameterSampling for SirModel {
    fn set_params_distributions_normal(&mut self, relative_dev: f64) {
        self.parameters.set_distributions_normal(relative_dev);
        for state in [InfectionState::Infected, InfectionState::Recovered] {
            set_normal(self.populations.get_mut((state,)), relative_dev, None);
        }
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
    use crate::integrator::EulerIntegratorCore;
    use crate::simulation::{simulate, simulate_flows};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model() -> SirModel {
        let total = 1061000.;
        let mut model = SirModel::new();
        model.populations.set((InfectionState::Infected,), 1000.);
        model.populations.set((InfectionState::Recovered,), 1000.);
        model
            .populations
            .set_difference_from_total((InfectionState::Susceptible,), total);
        model.parameters.time_infected.set_value(2.);
        model
            .parameters
            .transmission_probability_on_contact
            .set_value(1.);
        let contacts = model.parameters.contact_patterns.get_contact_matrices_mut();
        contacts[0].get_baseline_mut().fill(2.7);
        contacts[0].add_damping_factor(0.6, 12.5);
        model
    }

    #[test]
    fn names_and_flows() {
        let model = model();
        assert_eq!(model.compartment_names(), vec!["S", "I", "R"]);
        assert_eq!(model.flow_names(), vec!["S->I", "I->R"]);
        assert_eq!(model.get_num_flows(), 2);
    }

    #[test]
    fn derivatives_at_start() {
        let model = model();
        let y = model.get_initial_values();
        let mut dydt = Array1::<f64>::zeros(3);
        model.get_derivatives(y.view(), y.view(), 0., dydt.view_mut());

        let infections = 2.7 * 1059000. * 1000. / 1061000.;
        let recoveries = 1000. / 2.;
        assert!((dydt[0] + infections).abs() < 1e-9);
        assert!((dydt[1] - (infections - recoveries)).abs() < 1e-9);
        assert!((dydt[2] - recoveries).abs() < 1e-9);
    }

    #[test]
    fn damped_contacts_slow_infection() {
        let model = model();
        let y = model.get_initial_values();
        let mut before = Array1::<f64>::zeros(3);
        let mut after = Array1::<f64>::zeros(3);
        model.get_derivatives(y.view(), y.view(), 12., before.view_mut());
        model.get_derivatives(y.view(), y.view(), 13., after.view_mut());
        assert!((after[0] / before[0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn euler_simulation() {
        let model = model();
        let result = simulate(0., 1., 0.1, &model, Some(EulerIntegratorCore::new().into())).unwrap();
        assert_eq!(result.get_num_time_points(), 11);
        assert!((result.get_last_time() - 1.).abs() < 1e-10);
        for (_, value) in result.iter() {
            assert!((value.sum() - 1061000.).abs() < 1e-6);
        }
        assert!(result.get_last_value()[2] > 1000.);
    }

    #[test]
    fn flows_reconstruct_populations() {
        let model = model();
        let (populations, flows) = simulate_flows(0., 5., 0.5, &model, None).unwrap();
        let initial = model.get_initial_values();
        let last = populations.get_last_value();
        let flow = flows.get_last_value();
        assert!((last[0] - (initial[0] - flow[0])).abs() < 1e-6);
        assert!((last[2] - (initial[2] + flow[1])).abs() < 1e-6);
    }

    #[test]
    fn constraints() {
        let mut model = model();
        assert_eq!(model.check_constraints(), 0);
        model.parameters.time_infected.set_value(0.);
        model
            .parameters
            .transmission_probability_on_contact
            .set_value(-0.5);
        model.populations.set((InfectionState::Recovered,), -1.);
        assert_eq!(model.check_constraints(), 3);
        assert_eq!(model.apply_constraints(), 3);
        assert_eq!(model.parameters.time_infected, TOL_TIMES);
        assert_eq!(model.parameters.transmission_probability_on_contact, 0.);
        assert_eq!(model.check_constraints(), 0);
    }

    #[test]
    fn draw_sample_keeps_total() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut model = model();
        model.set_params_distributions_normal(0.2);
        model.draw_sample(&mut rng);
        assert!((model.populations.get_total() - 1061000.).abs() < 1e-6);
        assert_eq!(model.check_constraints(), 0);
        assert!(model.parameters.time_infected != 2.);
    }

    #[test]
    fn named_uncertain_values() {
        let mut model = model();
        let names: Vec<String> = model
            .uncertain_values()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["S", "I", "R", "TimeInfected", "TransmissionProbabilityOnContact"]
        );
        assert_eq!(*model.uncertain_values()[1].1, 1000.);

        model.uncertain_values_mut()[3].1.set_value(4.);
        assert_eq!(model.parameters.time_infected, 4.);
    }
}
