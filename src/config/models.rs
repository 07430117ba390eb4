//! Scenario settings of the disease models.

use serde::{Deserialize, Serialize};

use super::contacts::ContactSettings;
use crate::core::{AgeGroup, UncertainValue};
use crate::errors::{CompartmentalError, Result};
use crate::models::secir::{InfectionState as SecirState, SecirModel};
use crate::models::sir::{InfectionState as SirState, SirModel};
use crate::models::sis::{InfectionState as SisState, SisModel};

/// Largest number of age groups a SECIR scenario may have.
pub const MAX_AGE_GROUPS: usize = 6;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ModelSettings {
    Sir(SirSettings),
    Sis(SisSettings),
    Secir(SecirSettings),
}

fn unlimited() -> UncertainValue {
    UncertainValue::new(f64::MAX)
}

fn remaining(total: f64, others: f64, name: &str) -> Result<f64> {
    if others > total {
        return Err(CompartmentalError::ConfigurationError(format!(
            "Compartments of {name} sum to {others}, exceeding the total population {total}"
        )));
    }
    Ok(total - others)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SirSettings {
    pub total_population: f64,
    pub infected: UncertainValue,
    #[serde(default)]
    pub recovered: UncertainValue,
    pub time_infected: UncertainValue,
    pub transmission_probability_on_contact: UncertainValue,
    pub contacts: ContactSettings,
}

impl SirSettings {
    pub fn build(&self) -> Result<SirModel> {
        let mut model = SirModel::new();
        model.populations.set((SirState::Infected,), self.infected.clone());
        model.populations.set((SirState::Recovered,), self.recovered.clone());
        let susceptible = remaining(
            self.total_population,
            self.infected.value() + self.recovered.value(),
            "the SIR model",
        )?;
        model.populations.set((SirState::Susceptible,), susceptible);

        model.parameters.time_infected = self.time_infected.clone();
        model.parameters.transmission_probability_on_contact =
            self.transmission_probability_on_contact.clone();
        model.parameters.contact_patterns = self.contacts.build(1)?;
        Ok(model)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SisSettings {
    pub total_population: f64,
    pub infected: UncertainValue,
    pub time_infected: UncertainValue,
    pub transmission_probability_on_contact: UncertainValue,
    pub contacts: ContactSettings,
}

impl SisSettings {
    pub fn build(&self) -> Result<SisModel> {
        let mut model = SisModel::new();
        model.populations.set((SisState::Infected,), self.infected.clone());
        let susceptible =
            remaining(self.total_population, self.infected.value(), "the SIS model")?;
        model.populations.set((SisState::Susceptible,), susceptible);

        model.parameters.time_infected = self.time_infected.clone();
        model.parameters.transmission_probability_on_contact =
            self.transmission_probability_on_contact.clone();
        model.parameters.contact_patterns = self.contacts.build(1)?;
        Ok(model)
    }
}

/// Initial compartments and parameters of one age group, missing fields take the defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SecirGroupSettings {
    pub total_population: f64,
    pub exposed: UncertainValue,
    pub carrier: UncertainValue,
    pub infected: UncertainValue,
    pub hospitalized: UncertainValue,
    pub intensive_care: UncertainValue,
    pub recovered: UncertainValue,
    pub dead: UncertainValue,

    pub incubation_time: UncertainValue,
    pub serial_interval: UncertainValue,
    pub time_infected_symptoms: UncertainValue,
    pub time_infected_severe: UncertainValue,
    pub time_infected_critical: UncertainValue,
    pub transmission_probability_on_contact: UncertainValue,
    pub relative_transmission_no_symptoms: UncertainValue,
    pub recovered_per_infected_no_symptoms: UncertainValue,
    pub risk_of_infection_from_symptomatic: UncertainValue,
    pub max_risk_of_infection_from_symptomatic: UncertainValue,
    pub severe_per_infected_symptoms: UncertainValue,
    pub critical_per_severe: UncertainValue,
    pub deaths_per_critical: UncertainValue,
}

impl Default for SecirGroupSettings {
    fn default() -> Self {
        let parameters = crate::models::SecirParameters::<1>::default();
        Self {
            total_population: 0.,
            exposed: UncertainValue::default(),
            carrier: UncertainValue::default(),
            infected: UncertainValue::default(),
            hospitalized: UncertainValue::default(),
            intensive_care: UncertainValue::default(),
            recovered: UncertainValue::default(),
            dead: UncertainValue::default(),
            incubation_time: parameters.incubation_time[0].clone(),
            serial_interval: parameters.serial_interval[0].clone(),
            time_infected_symptoms: parameters.time_infected_symptoms[0].clone(),
            time_infected_severe: parameters.time_infected_severe[0].clone(),
            time_infected_critical: parameters.time_infected_critical[0].clone(),
            transmission_probability_on_contact: parameters.transmission_probability_on_contact
                [0]
            .clone(),
            relative_transmission_no_symptoms: parameters.relative_transmission_no_symptoms[0]
                .clone(),
            recovered_per_infected_no_symptoms: parameters.recovered_per_infected_no_symptoms
                [0]
            .clone(),
            risk_of_infection_from_symptomatic: parameters.risk_of_infection_from_symptomatic
                [0]
            .clone(),
            max_risk_of_infection_from_symptomatic: parameters
                .max_risk_of_infection_from_symptomatic[0]
                .clone(),
            severe_per_infected_symptoms: parameters.severe_per_infected_symptoms[0].clone(),
            critical_per_severe: parameters.critical_per_severe[0].clone(),
            deaths_per_critical: parameters.deaths_per_critical[0].clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SecirSettings {
    #[serde(default)]
    pub start_day: f64,
    #[serde(default)]
    pub seasonality: UncertainValue,
    #[serde(default = "unlimited")]
    pub icu_capacity: UncertainValue,
    #[serde(default = "unlimited")]
    pub test_and_trace_capacity: UncertainValue,
    pub contacts: ContactSettings,
    /// One entry per age group.
    pub groups: Vec<SecirGroupSettings>,
}

impl SecirSettings {
    /// Build the model with `N` age groups.
    ///
    /// Fails if the scenario does not configure exactly `N` groups.
    pub fn build<const N: usize>(&self) -> Result<SecirModel<N>> {
        if self.groups.len() != N {
            return Err(CompartmentalError::ConfigurationError(format!(
                "Expected {N} age groups, got {}",
                self.groups.len()
            )));
        }

        let mut model = SecirModel::<N>::new();
        let parameters = &mut model.parameters;
        parameters.start_day = self.start_day;
        parameters.seasonality = self.seasonality.clone();
        parameters.icu_capacity = self.icu_capacity.clone();
        parameters.test_and_trace_capacity = self.test_and_trace_capacity.clone();
        parameters.contact_patterns = self.contacts.build(N)?;

        for (group, settings) in self.groups.iter().enumerate() {
            parameters.incubation_time[group] = settings.incubation_time.clone();
            parameters.serial_interval[group] = settings.serial_interval.clone();
            parameters.time_infected_symptoms[group] = settings.time_infected_symptoms.clone();
            parameters.time_infected_severe[group] = settings.time_infected_severe.clone();
            parameters.time_infected_critical[group] = settings.time_infected_critical.clone();
            parameters.transmission_probability_on_contact[group] =
                settings.transmission_probability_on_contact.clone();
            parameters.relative_transmission_no_symptoms[group] =
                settings.relative_transmission_no_symptoms.clone();
            parameters.recovered_per_infected_no_symptoms[group] =
                settings.recovered_per_infected_no_symptoms.clone();
            parameters.risk_of_infection_from_symptomatic[group] =
                settings.risk_of_infection_from_symptomatic.clone();
            parameters.max_risk_of_infection_from_symptomatic[group] =
                settings.max_risk_of_infection_from_symptomatic.clone();
            parameters.severe_per_infected_symptoms[group] =
                settings.severe_per_infected_symptoms.clone();
            parameters.critical_per_severe[group] = settings.critical_per_severe.clone();
            parameters.deaths_per_critical[group] = settings.deaths_per_critical.clone();
        }

        for (group, settings) in self.groups.iter().enumerate() {
            let age = AgeGroup::<N>(group);
            let compartments = [
                (SecirState::Exposed, &settings.exposed),
                (SecirState::Carrier, &settings.carrier),
                (SecirState::Infected, &settings.infected),
                (SecirState::Hospitalized, &settings.hospitalized),
                (SecirState::IntensiveCare, &settings.intensive_care),
                (SecirState::Recovered, &settings.recovered),
                (SecirState::Dead, &settings.dead),
            ];
            let mut others = 0.;
            for (state, value) in compartments {
                model.populations.set((age, state), value.clone());
                others += value.value();
            }
            let susceptible = remaining(
                settings.total_population,
                others,
                &format!("age group {group}"),
            )?;
            model
                .populations
                .set((age, SecirState::Susceptible), susceptible);
        }
        Ok(model)
    }
}
