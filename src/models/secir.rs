//! Age-resolved SECIR model
//!
//! Compartments per age group: susceptible, exposed, carrier (infected without symptoms),
//! infected with symptoms, hospitalized, in intensive care, recovered and dead. The force of
//! infection mixes all age groups through the contact matrices and is modulated by a yearly
//! seasonality. Two capacity effects are modelled: once testing and tracing of carriers exceeds
//! its capacity, symptomatic individuals become more infectious, and once intensive care is full,
//! severe cases that would need it die instead.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{
    ParameterSampling, TOL_TIMES, apply_non_negative, apply_probability, apply_time,
    check_non_negative, check_probability, check_time, group_name, set_normal, smoother_cosine,
};
use crate::contacts::{ContactMatrixGroup, UncertainContactMatrix};
use crate::core::{
    AgeGroup, Category, CustomIndexArray, MultiIndex, Populations, TimeSeries, UncertainValue,
    categories,
};
use crate::simulation::{CompartmentalModel, FlowModel, derivatives_from_flows};

/// Populations with a total below this do not transmit.
const EMPTY_GROUP: f64 = 1e-12;

const POWER_ITERATIONS: usize = 10000;
const POWER_TOLERANCE: f64 = 1e-14;

#[derive(Category, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfectionState {
    Susceptible,
    Exposed,
    Carrier,
    Infected,
    Hospitalized,
    IntensiveCare,
    Recovered,
    Dead,
}

impl InfectionState {
    pub fn short_name(&self) -> &'static str {
        match self {
            InfectionState::Susceptible => "S",
            InfectionState::Exposed => "E",
            InfectionState::Carrier => "C",
            InfectionState::Infected => "I",
            InfectionState::Hospitalized => "H",
            InfectionState::IntensiveCare => "U",
            InfectionState::Recovered => "R",
            InfectionState::Dead => "D",
        }
    }
}

/// Transitions of one age group, in the order of the flow vector.
pub const FLOWS: [(InfectionState, InfectionState); 11] = [
    (InfectionState::Susceptible, InfectionState::Exposed),
    (InfectionState::Exposed, InfectionState::Carrier),
    (InfectionState::Carrier, InfectionState::Infected),
    (InfectionState::Carrier, InfectionState::Recovered),
    (InfectionState::Infected, InfectionState::Hospitalized),
    (InfectionState::Infected, InfectionState::Recovered),
    (InfectionState::Hospitalized, InfectionState::IntensiveCare),
    (InfectionState::Hospitalized, InfectionState::Recovered),
    (InfectionState::Hospitalized, InfectionState::Dead),
    (InfectionState::IntensiveCare, InfectionState::Dead),
    (InfectionState::IntensiveCare, InfectionState::Recovered),
];

/// Position of a transition in `FLOWS`.
const fn flow_position(source: InfectionState, target: InfectionState) -> Option<usize> {
    use InfectionState::*;
    match (source, target) {
        (Susceptible, Exposed) => Some(0),
        (Exposed, Carrier) => Some(1),
        (Carrier, Infected) => Some(2),
        (Carrier, Recovered) => Some(3),
        (Infected, Hospitalized) => Some(4),
        (Infected, Recovered) => Some(5),
        (Hospitalized, IntensiveCare) => Some(6),
        (Hospitalized, Recovered) => Some(7),
        (Hospitalized, Dead) => Some(8),
        (IntensiveCare, Dead) => Some(9),
        (IntensiveCare, Recovered) => Some(10),
        _ => None,
    }
}

pub type AgeParameter<const N: usize> = CustomIndexArray<UncertainValue, (AgeGroup<N>,)>;

fn age_parameter<const N: usize>(value: f64) -> AgeParameter<N> {
    CustomIndexArray::new(UncertainValue::new(value))
}

#[derive(Clone, Debug, PartialEq)]
pub struct SecirParameters<const N: usize> {
    /// Day of the year at `t = 0`, shifts the seasonality.
    pub start_day: f64,
    /// Amplitude of the yearly modulation of transmission, in `[0, 0.5]`.
    pub seasonality: UncertainValue,
    pub icu_capacity: UncertainValue,
    /// Number of new carriers per day that can be tested and traced.
    pub test_and_trace_capacity: UncertainValue,
    pub contact_patterns: UncertainContactMatrix,

    pub incubation_time: AgeParameter<N>,
    /// Time between the infection of an individual and the infection of its contacts.
    pub serial_interval: AgeParameter<N>,
    pub time_infected_symptoms: AgeParameter<N>,
    pub time_infected_severe: AgeParameter<N>,
    pub time_infected_critical: AgeParameter<N>,

    pub transmission_probability_on_contact: AgeParameter<N>,
    pub relative_transmission_no_symptoms: AgeParameter<N>,
    pub recovered_per_infected_no_symptoms: AgeParameter<N>,
    pub risk_of_infection_from_symptomatic: AgeParameter<N>,
    /// Risk of infection from symptomatic cases once test and trace is overloaded.
    pub max_risk_of_infection_from_symptomatic: AgeParameter<N>,
    pub severe_per_infected_symptoms: AgeParameter<N>,
    pub critical_per_severe: AgeParameter<N>,
    pub deaths_per_critical: AgeParameter<N>,
}

impl<const N: usize> Default for SecirParameters<N> {
    fn default() -> Self {
        Self {
            start_day: 0.,
            seasonality: UncertainValue::new(0.),
            icu_capacity: UncertainValue::new(f64::MAX),
            test_and_trace_capacity: UncertainValue::new(f64::MAX),
            contact_patterns: ContactMatrixGroup::new(1, N).into(),
            incubation_time: age_parameter(5.2),
            serial_interval: age_parameter(4.2),
            time_infected_symptoms: age_parameter(5.8),
            time_infected_severe: age_parameter(9.5),
            time_infected_critical: age_parameter(7.1),
            transmission_probability_on_contact: age_parameter(1.),
            relative_transmission_no_symptoms: age_parameter(1.),
            recovered_per_infected_no_symptoms: age_parameter(0.),
            risk_of_infection_from_symptomatic: age_parameter(1.),
            max_risk_of_infection_from_symptomatic: age_parameter(1.),
            severe_per_infected_symptoms: age_parameter(0.),
            critical_per_severe: age_parameter(0.),
            deaths_per_critical: age_parameter(0.),
        }
    }
}

impl<const N: usize> SecirParameters<N> {
    fn times(&self) -> [(&'static str, &AgeParameter<N>); 3] {
        [
            ("TimeInfectedSymptoms", &self.time_infected_symptoms),
            ("TimeInfectedSevere", &self.time_infected_severe),
            ("TimeInfectedCritical", &self.time_infected_critical),
        ]
    }

    fn times_mut(&mut self) -> [(&'static str, &mut AgeParameter<N>); 3] {
        [
            ("TimeInfectedSymptoms", &mut self.time_infected_symptoms),
            ("TimeInfectedSevere", &mut self.time_infected_severe),
            ("TimeInfectedCritical", &mut self.time_infected_critical),
        ]
    }

    fn probabilities(&self) -> [(&'static str, &AgeParameter<N>); 8] {
        [
            (
                "TransmissionProbabilityOnContact",
                &self.transmission_probability_on_contact,
            ),
            (
                "RelativeTransmissionNoSymptoms",
                &self.relative_transmission_no_symptoms,
            ),
            (
                "RecoveredPerInfectedNoSymptoms",
                &self.recovered_per_infected_no_symptoms,
            ),
            (
                "RiskOfInfectionFromSymptomatic",
                &self.risk_of_infection_from_symptomatic,
            ),
            (
                "MaxRiskOfInfectionFromSymptomatic",
                &self.max_risk_of_infection_from_symptomatic,
            ),
            (
                "SeverePerInfectedSymptoms",
                &self.severe_per_infected_symptoms,
            ),
            ("CriticalPerSevere", &self.critical_per_severe),
            ("DeathsPerCritical", &self.deaths_per_critical),
        ]
    }

    fn probabilities_mut(&mut self) -> [(&'static str, &mut AgeParameter<N>); 8] {
        [
            (
                "TransmissionProbabilityOnContact",
                &mut self.transmission_probability_on_contact,
            ),
            (
                "RelativeTransmissionNoSymptoms",
                &mut self.relative_transmission_no_symptoms,
            ),
            (
                "RecoveredPerInfectedNoSymptoms",
                &mut self.recovered_per_infected_no_symptoms,
            ),
            (
                "RiskOfInfectionFromSymptomatic",
                &mut self.risk_of_infection_from_symptomatic,
            ),
            (
                "MaxRiskOfInfectionFromSymptomatic",
                &mut self.max_risk_of_infection_from_symptomatic,
            ),
            (
                "SeverePerInfectedSymptoms",
                &mut self.severe_per_infected_symptoms,
            ),
            ("CriticalPerSevere", &mut self.critical_per_severe),
            ("DeathsPerCritical", &mut self.deaths_per_critical),
        ]
    }

    /// All parameters stratified by age group, with their names.
    fn age_parameters(&self) -> [(&'static str, &AgeParameter<N>); 13] {
        let [symptoms, severe, critical] = self.times();
        let [p0, p1, p2, p3, p4, p5, p6, p7] = self.probabilities();
        [
            ("IncubationTime", &self.incubation_time),
            ("SerialInterval", &self.serial_interval),
            symptoms,
            severe,
            critical,
            p0,
            p1,
            p2,
            p3,
            p4,
            p5,
            p6,
            p7,
        ]
    }

    /// Scalar and age-stratified parameters, borrowed at once.
    #[allow(clippy::type_complexity)]
    fn parameters_mut(
        &mut self,
    ) -> (
        [(&'static str, &mut UncertainValue); 3],
        [(&'static str, &mut AgeParameter<N>); 13],
    ) {
        let Self {
            seasonality,
            icu_capacity,
            test_and_trace_capacity,
            incubation_time,
            serial_interval,
            time_infected_symptoms,
            time_infected_severe,
            time_infected_critical,
            transmission_probability_on_contact,
            relative_transmission_no_symptoms,
            recovered_per_infected_no_symptoms,
            risk_of_infection_from_symptomatic,
            max_risk_of_infection_from_symptomatic,
            severe_per_infected_symptoms,
            critical_per_severe,
            deaths_per_critical,
            ..
        } = self;
        (
            [
                ("Seasonality", seasonality),
                ("ICUCapacity", icu_capacity),
                ("TestAndTraceCapacity", test_and_trace_capacity),
            ],
            [
                ("IncubationTime", incubation_time),
                ("SerialInterval", serial_interval),
                ("TimeInfectedSymptoms", time_infected_symptoms),
                ("TimeInfectedSevere", time_infected_severe),
                ("TimeInfectedCritical", time_infected_critical),
                (
                    "TransmissionProbabilityOnContact",
                    transmission_probability_on_contact,
                ),
                (
                    "RelativeTransmissionNoSymptoms",
                    relative_transmission_no_symptoms,
                ),
                (
                    "RecoveredPerInfectedNoSymptoms",
                    recovered_per_infected_no_symptoms,
                ),
                (
                    "RiskOfInfectionFromSymptomatic",
                    risk_of_infection_from_symptomatic,
                ),
                (
                    "MaxRiskOfInfectionFromSymptomatic",
                    max_risk_of_infection_from_symptomatic,
                ),
                ("SeverePerInfectedSymptoms", severe_per_infected_symptoms),
                ("CriticalPerSevere", critical_per_severe),
                ("DeathsPerCritical", deaths_per_critical),
            ],
        )
    }

    pub(crate) fn uncertain_values(&self) -> Vec<(String, &UncertainValue)> {
        let mut values = vec![
            ("Seasonality".to_string(), &self.seasonality),
            ("ICUCapacity".to_string(), &self.icu_capacity),
            (
                "TestAndTraceCapacity".to_string(),
                &self.test_and_trace_capacity,
            ),
        ];
        for (name, parameter) in self.age_parameters() {
            for (group, value) in parameter.iter().enumerate() {
                values.push((group_name(name, group, N), value));
            }
        }
        values
    }

    pub(crate) fn uncertain_values_mut(&mut self) -> Vec<(String, &mut UncertainValue)> {
        let (scalars, age_parameters) = self.parameters_mut();
        let mut values: Vec<(String, &mut UncertainValue)> = scalars
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        for (name, parameter) in age_parameters {
            for (group, value) in parameter.iter_mut().enumerate() {
                values.push((group_name(name, group, N), value));
            }
        }
        values
    }

    fn serial_interval_valid(serial_interval: f64, incubation_time: f64) -> bool {
        serial_interval >= 0.5 * incubation_time + 0.05 && serial_interval <= incubation_time - 0.05
    }

    pub fn check_constraints(&self) -> usize {
        let mut violations = 0;
        if self.seasonality < 0. || self.seasonality > 0.5 {
            log::error!(
                "Constraint check: Parameter Seasonality {:.4} not in [0, 0.5]",
                self.seasonality
            );
            violations += 1;
        }
        violations += check_non_negative("ICUCapacity", &self.icu_capacity);
        violations += check_non_negative("TestAndTraceCapacity", &self.test_and_trace_capacity);

        for group in 0..N {
            let incubation_time = self.incubation_time[group].value();
            if incubation_time < TOL_TIMES {
                log::error!(
                    "Constraint check: Parameter IncubationTime {incubation_time:.4} of group {group} smaller than {TOL_TIMES:.4}"
                );
                violations += 1;
            }
            let serial_interval = self.serial_interval[group].value();
            if !Self::serial_interval_valid(serial_interval, incubation_time) {
                log::error!(
                    "Constraint check: Parameter SerialInterval {serial_interval:.4} of group {group} not in [{:.4}, {:.4}]",
                    0.5 * incubation_time + 0.05,
                    incubation_time - 0.05
                );
                violations += 1;
            }
            for (name, parameter) in self.times() {
                violations += check_time(name, &parameter[group]);
            }
            for (name, parameter) in self.probabilities() {
                violations += check_probability(name, &parameter[group]);
            }
        }
        violations
    }

    pub fn apply_constraints(&mut self) -> usize {
        let mut corrections = 0;
        if self.seasonality < 0. || self.seasonality > 0.5 {
            log::warn!(
                "Constraint check: Parameter Seasonality changed from {:.4} to 0",
                self.seasonality
            );
            self.seasonality.set_value(0.);
            corrections += 1;
        }
        corrections += apply_non_negative("ICUCapacity", &mut self.icu_capacity);
        corrections += apply_non_negative("TestAndTraceCapacity", &mut self.test_and_trace_capacity);

        for group in 0..N {
            corrections += apply_time(
                "IncubationTime",
                &mut self.incubation_time[group],
                2. * TOL_TIMES,
            );
            let incubation_time = self.incubation_time[group].value();
            let serial_interval = self.serial_interval[group].value();
            if !Self::serial_interval_valid(serial_interval, incubation_time) {
                log::warn!(
                    "Constraint check: Parameter SerialInterval of group {group} changed from {serial_interval:.4} to {:.4}",
                    0.75 * incubation_time
                );
                self.serial_interval[group].set_value(0.75 * incubation_time);
                corrections += 1;
            }
            for (name, parameter) in self.times_mut() {
                corrections += apply_time(name, &mut parameter[group], TOL_TIMES);
            }
            for (name, parameter) in self.probabilities_mut() {
                corrections += apply_probability(name, &mut parameter[group]);
            }
        }
        corrections
    }

    pub fn set_distributions_normal(&mut self, relative_dev: f64) {
        set_normal(&mut self.seasonality, relative_dev, Some(0.5));
        for group in 0..N {
            set_normal(&mut self.incubation_time[group], relative_dev, None);
            set_normal(&mut self.serial_interval[group], relative_dev, None);
            for (_, parameter) in self.times_mut() {
                set_normal(&mut parameter[group], relative_dev, None);
            }
            for (_, parameter) in self.probabilities_mut() {
                set_normal(&mut parameter[group], relative_dev, Some(1.));
            }
        }
    }

    /// Draw all parameters and new contact dampings, configured dampings are kept.
    pub fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.seasonality.draw_sample(rng);
        self.icu_capacity.draw_sample(rng);
        self.test_and_trace_capacity.draw_sample(rng);
        for value in self
            .incubation_time
            .iter_mut()
            .chain(self.serial_interval.iter_mut())
        {
            value.draw_sample(rng);
        }
        for (_, parameter) in self.times_mut() {
            for value in parameter.iter_mut() {
                value.draw_sample(rng);
            }
        }
        for (_, parameter) in self.probabilities_mut() {
            for value in parameter.iter_mut() {
                value.draw_sample(rng);
            }
        }
        self.contact_patterns.draw_sample(rng, true);
    }

    /// Factor of the yearly transmission cycle at time `t`.
    pub fn season_factor(&self, t: f64) -> f64 {
        1. + self.seasonality.value() * (PI * ((self.start_day + t) % 365. / 182.5 + 0.5)).sin()
    }
}

/// SECIR model with `N` age groups.
#[derive(Clone, Debug, PartialEq)]
pub struct SecirModel<const N: usize> {
    pub populations: Populations<(AgeGroup<N>, InfectionState)>,
    pub parameters: SecirParameters<N>,
    transitions: Vec<(usize, usize)>,
}

impl<const N: usize> Default for SecirModel<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SecirModel<N> {
    pub fn new() -> Self {
        let transitions = (0..N)
            .flat_map(|group| {
                FLOWS.iter().map(move |&(source, target)| {
                    (
                        Self::compartment(group, source),
                        Self::compartment(group, target),
                    )
                })
            })
            .collect();
        Self {
            populations: Populations::new(),
            parameters: SecirParameters::default(),
            transitions,
        }
    }

    /// Flat index of a compartment in the state vector.
    #[inline]
    pub fn compartment(group: usize, state: InfectionState) -> usize {
        (AgeGroup::<N>(group), state).flat_index()
    }

    /// Flat index of the flow from `source` to `target` of one age group.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such transition.
    #[inline]
    pub fn flow_index(group: usize, source: InfectionState, target: InfectionState) -> usize {
        match flow_position(source, target) {
            Some(position) => group * FLOWS.len() + position,
            None => panic!("No flow from {source:?} to {target:?}"),
        }
    }
}

impl<const N: usize> SecirModel<N> {
    /// All individuals of one age group that are alive in the state `y`.
    fn living_population(y: ArrayView1<f64>, group: usize) -> f64 {
        categories::<InfectionState>()
            .filter(|&state| state != InfectionState::Dead)
            .map(|state| y[Self::compartment(group, state)])
            .sum()
    }

    /// Risk of infection from symptomatic cases of every age group.
    ///
    /// The risk rises towards its maximum while the carriers that need to be tested and traced
    /// exceed the test and trace capacity up to five times.
    fn risks_from_symptomatic(&self, pop: ArrayView1<f64>) -> Vec<f64> {
        let params = &self.parameters;
        let test_and_trace_required: f64 = (0..N)
            .map(|group| {
                let rate_carrier = 0.5
                    / (params.incubation_time[group].value()
                        - params.serial_interval[group].value());
                (1. - params.recovered_per_infected_no_symptoms[group].value())
                    * rate_carrier
                    * pop[Self::compartment(group, InfectionState::Carrier)]
            })
            .sum();
        let capacity = params.test_and_trace_capacity.value();
        (0..N)
            .map(|group| {
                smoother_cosine(
                    test_and_trace_required,
                    capacity,
                    5. * capacity,
                    params.risk_of_infection_from_symptomatic[group].value(),
                    params.max_risk_of_infection_from_symptomatic[group].value(),
                )
            })
            .collect()
    }

    /// Share of symptomatic infected individuals in the total population of the state `y`.
    pub fn get_infections_relative(&self, y: ArrayView1<f64>) -> f64 {
        let total = y.sum();
        if total <= 0. {
            return 0.;
        }
        let infected: f64 = (0..N)
            .map(|group| y[Self::compartment(group, InfectionState::Infected)])
            .sum();
        infected / total
    }

    /// Effective reproduction number of the state `y` at time `t`.
    ///
    /// This is the spectral radius of the next generation matrix of new exposed individuals. An
    /// exposed individual of group `j` is on average `2 * (incubation_time - serial_interval)`
    /// days a carrier and, unless it recovers without symptoms, `time_infected_symptoms` days
    /// symptomatic. Contacts, seasonality and the test and trace capacity are evaluated at `t`
    /// and `y`.
    pub fn get_reproduction_number(&self, t: f64, y: ArrayView1<f64>) -> f64 {
        let params = &self.parameters;
        let contacts = params.contact_patterns.get_contact_matrices().get_matrix_at(t);
        let season = params.season_factor(t);
        let risks_from_symptomatic = self.risks_from_symptomatic(y);

        // infectious contacts of one new exposed individual, per contact and living individual
        let infectious_time: Vec<f64> = (0..N)
            .map(|group| {
                let living = Self::living_population(y, group);
                if living < EMPTY_GROUP {
                    return 0.;
                }
                let time_carrier = 2.
                    * (params.incubation_time[group].value() - params.serial_interval[group].value());
                let symptomatic_share = 1. - params.recovered_per_infected_no_symptoms[group].value();
                (params.relative_transmission_no_symptoms[group].value() * time_carrier
                    + risks_from_symptomatic[group]
                        * symptomatic_share
                        * params.time_infected_symptoms[group].value())
                    / living
            })
            .collect();

        let next_generation = Array2::from_shape_fn((N, N), |(group, other)| {
            season
                * params.transmission_probability_on_contact[group].value()
                * y[Self::compartment(group, InfectionState::Susceptible)]
                * contacts[[group, other]]
                * infectious_time[other]
        });
        spectral_radius(&next_generation)
    }

    /// Reproduction number at time `t` of a simulation result, interpolated linearly between
    /// time points.
    ///
    /// Returns `None` if `t` lies outside the time frame of `result`.
    pub fn get_reproduction_number_at(&self, result: &TimeSeries, t: f64) -> Option<f64> {
        let times = result.get_times();
        let (&first, &last) = (times.first()?, times.last()?);
        if t < first || t > last {
            return None;
        }
        let upper = times.partition_point(|&time| time < t);
        if times[upper] == t {
            return Some(self.get_reproduction_number(t, result.get_value(upper)));
        }
        let lower = upper - 1;
        let weight = (t - times[lower]) / (times[upper] - times[lower]);
        let state = &result.get_value(lower) * (1. - weight) + &result.get_value(upper) * weight;
        Some(self.get_reproduction_number(t, state.view()))
    }
}

/// Largest eigenvalue of a non-negative matrix.
///
/// Power iteration on `matrix + 1`, which shares the Perron vector of `matrix` and has a unique
/// dominant eigenvalue even for periodic or reducible matrices.
fn spectral_radius(matrix: &Array2<f64>) -> f64 {
    let size = matrix.nrows();
    if size == 0 {
        return 0.;
    }
    let shifted = matrix + &Array2::<f64>::eye(size);
    let mut vector = Array1::from_elem(size, 1. / size as f64);
    let mut eigenvalue = 1.;
    for _ in 0..POWER_ITERATIONS {
        let next = shifted.dot(&vector);
        let norm = next.sum();
        let converged = (norm - eigenvalue).abs() <= POWER_TOLERANCE * norm;
        vector = next / norm;
        eigenvalue = norm;
        if converged {
            break;
        }
    }
    eigenvalue - 1.
}

impl<const N: usize> CompartmentalModel for SecirModel<N> {
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
        (0..N)
            .flat_map(|group| {
                categories::<InfectionState>()
                    .map(move |state| group_name(state.short_name(), group, N))
            })
            .collect()
    }
}

impl<const N: usize> FlowModel for SecirModel<N> {
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
        use InfectionState::*;

        let params = &self.parameters;
        let contacts = params.contact_patterns.get_contact_matrices().get_matrix_at(t);
        debug_assert_eq!(contacts.nrows(), N, "Contact matrices do not match the age groups");
        let season = params.season_factor(t);
        let at = |group: usize, state: InfectionState| Self::compartment(group, state);

        let icu_occupancy: f64 = (0..N).map(|group| pop[at(group, IntensiveCare)]).sum();
        let risks_from_symptomatic = self.risks_from_symptomatic(pop);

        // infectiousness of every age group per contact
        let infectiousness: Vec<f64> = (0..N)
            .map(|group| {
                let living = Self::living_population(pop, group);
                if living < EMPTY_GROUP {
                    return 0.;
                }
                (params.relative_transmission_no_symptoms[group].value() * pop[at(group, Carrier)]
                    + risks_from_symptomatic[group] * pop[at(group, Infected)])
                    / living
            })
            .collect();

        for group in 0..N {
            let flow = |source, target| Self::flow_index(group, source, target);

            let force_of_infection: f64 = (0..N)
                .map(|other| contacts[[group, other]] * infectiousness[other])
                .sum::<f64>()
                * season
                * params.transmission_probability_on_contact[group].value();
            flows[flow(Susceptible, Exposed)] = force_of_infection * y[at(group, Susceptible)];

            let incubation_time = params.incubation_time[group].value();
            let serial_interval = params.serial_interval[group].value();
            let rate_exposed = 1. / (2. * serial_interval - incubation_time);
            let rate_carrier = 0.5 / (incubation_time - serial_interval);
            flows[flow(Exposed, Carrier)] = rate_exposed * y[at(group, Exposed)];

            let carriers = y[at(group, Carrier)];
            let recovered_per_carrier = params.recovered_per_infected_no_symptoms[group].value();
            flows[flow(Carrier, Infected)] = (1. - recovered_per_carrier) * rate_carrier * carriers;
            flows[flow(Carrier, Recovered)] = recovered_per_carrier * rate_carrier * carriers;

            let infected = y[at(group, Infected)];
            let severe_per_infected = params.severe_per_infected_symptoms[group].value();
            let time_infected = params.time_infected_symptoms[group].value();
            flows[flow(Infected, Hospitalized)] = severe_per_infected / time_infected * infected;
            flows[flow(Infected, Recovered)] = (1. - severe_per_infected) / time_infected * infected;

            // severe cases without a free intensive care bed die
            let critical_per_severe = params.critical_per_severe[group].value();
            let critical_per_severe_adjusted = smoother_cosine(
                icu_occupancy,
                0.9 * params.icu_capacity.value(),
                params.icu_capacity.value(),
                critical_per_severe,
                0.,
            );
            let deaths_per_severe_adjusted = critical_per_severe - critical_per_severe_adjusted;
            let hospitalized = y[at(group, Hospitalized)];
            let time_severe = params.time_infected_severe[group].value();
            flows[flow(Hospitalized, IntensiveCare)] =
                critical_per_severe_adjusted / time_severe * hospitalized;
            flows[flow(Hospitalized, Recovered)] =
                (1. - critical_per_severe) / time_severe * hospitalized;
            flows[flow(Hospitalized, Dead)] = deaths_per_severe_adjusted / time_severe * hospitalized;

            let critical = y[at(group, IntensiveCare)];
            let deaths_per_critical = params.deaths_per_critical[group].value();
            let time_critical = params.time_infected_critical[group].value();
            flows[flow(IntensiveCare, Dead)] = deaths_per_critical / time_critical * critical;
            flows[flow(IntensiveCare, Recovered)] = (1. - deaths_per_critical) / time_critical * critical;
        }
    }
}

impl<const N: usize> ParameterSampling for SecirModel<N> {
    fn set_params_distributions_normal(&mut self, relative_dev: f64) {
        self.parameters.set_distributions_normal(relative_dev);
        for group in 0..N {
            for state in categories::<InfectionState>() {
                if state != InfectionState::Susceptible && state != InfectionState::Dead {
                    set_normal(
                        self.populations.get_mut((AgeGroup(group), state)),
                        relative_dev,
                        None,
                    );
                }
            }
        }
    }

    /// Population totals of every age group are preserved, susceptibles take up the difference
    /// to the drawn compartments.
    fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.parameters.draw_sample(rng);
        self.populations
            .draw_sample_with_remainder(rng, |group: AgeGroup<N>| {
                (group, InfectionState::Susceptible)
            });
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
