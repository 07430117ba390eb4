//! Settings module.

use super::models::ModelSettings;

use serde::{Deserialize, Serialize};
use std::fs;

use crate::errors::{CompartmentalError, Result};
use crate::integrator::IntegratorCore;

/// Monte-Carlo ensemble of simulations with resampled parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnsembleSettings {
    pub runs: usize,
    /// Seed of the first run; run `i` is seeded with `seed + i`.
    pub seed: Option<u64>,
    /// Attach normal distributions with this relative deviation to all parameters.
    pub relative_deviation: Option<f64>,
    /// Also record the accumulated flows of flow models.
    pub flows: bool,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            runs: 1,
            seed: None,
            relative_deviation: None,
            flows: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub t0: f64,
    pub tmax: f64,
    /// Initial step size.
    pub dt: f64,
    #[serde(default)]
    pub integrator: IntegratorCore,
    #[serde(default)]
    pub ensemble: EnsembleSettings,
    pub model: ModelSettings,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(
            formatter,
            "{}",
            String::from_utf8(output).map_err(|_| std::fmt::Error)?
        )
    }
}

impl Settings {
    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self).map_err(CompartmentalError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<Settings> {
        let settings: Settings =
            serde_yaml::from_reader(reader).map_err(CompartmentalError::YamlError)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn write_to_file(&self, filename: &str) -> Result<()> {
        let file = fs::File::create(filename).map_err(CompartmentalError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> Result<Settings> {
        let file = fs::File::open(filename).map_err(CompartmentalError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Check the time frame, integrator and ensemble size.
    pub fn validate(&self) -> Result<()> {
        if self.tmax <= self.t0 {
            return Err(CompartmentalError::ConfigurationError(format!(
                "tmax = {} must be after t0 = {}",
                self.tmax, self.t0
            )));
        }
        if self.dt <= 0. {
            return Err(CompartmentalError::ConfigurationError(format!(
                "Initial step size dt = {} must be positive",
                self.dt
            )));
        }
        self.integrator.validate()?;
        if self.ensemble.runs == 0 {
            return Err(CompartmentalError::ConfigurationError(
                "An ensemble needs at least one run".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{ContactSettings, SecirGroupSettings, SecirSettings, SirSettings};
    use crate::core::{ParameterDistribution, UncertainValue};
    use crate::integrator::{EulerIntegratorCore, ImplicitEulerIntegratorCore};

    fn settings() -> Settings {
        Settings {
            t0: 0.,
            tmax: 50.,
            dt: 0.1,
            integrator: EulerIntegratorCore::new().into(),
            ensemble: EnsembleSettings {
                runs: 10,
                seed: Some(42),
                relative_deviation: Some(0.2),
                flows: true,
            },
            model: ModelSettings::Secir(SecirSettings {
                start_day: 40.,
                seasonality: UncertainValue::with_distribution(
                    0.1,
                    ParameterDistribution::uniform(0., 0.2),
                ),
                icu_capacity: UncertainValue::new(50.),
                test_and_trace_capacity: UncertainValue::new(100.),
                contacts: ContactSettings::constant(2, 5.),
                groups: vec![SecirGroupSettings::default(), SecirGroupSettings::default()],
            }),
        }
    }

    #[test]
    fn read_write() {
        let settings = settings();
        let mut output = vec![];
        settings.write(&mut output).unwrap();
        let settings2 = Settings::read(&mut &output[..]).unwrap();
        assert_eq!(settings, settings2);
        assert!(settings.to_string().contains("tmax: 50"));
    }

    #[test]
    fn read_minimal() {
        let yaml = r#"
t0: 0
tmax: 10
dt: 0.5
model: !Sir
  total_population: 1000
  infected: 10
  time_infected: 2
  transmission_probability_on_contact:
    value: 0.5
    distribution:
      type: Uniform
      lower_bound: 0.4
      upper_bound: 0.6
  contacts:
    baselines: [[[3.0]]]
"#;
        let settings = Settings::read(&mut yaml.as_bytes()).unwrap();
        assert_eq!(settings.integrator, IntegratorCore::default());
        assert_eq!(settings.ensemble, EnsembleSettings::default());
        let ModelSettings::Sir(sir) = &settings.model else {
            panic!("Expected SIR settings");
        };
        assert_eq!(sir.recovered, 0.);
        assert!(sir.transmission_probability_on_contact.get_distribution().is_some());
    }

    #[test]
    fn reject_invalid_time_frame() {
        let mut settings = settings();
        settings.tmax = 0.;
        assert!(settings.validate().is_err());

        let mut output = vec![];
        settings.write(&mut output).unwrap();
        assert!(Settings::read(&mut &output[..]).is_err());
    }

    #[test]
    fn reject_invalid_integrator() {
        let yaml = r#"
t0: 0
tmax: 10
dt: 0.5
integrator: !RungeKutta
  abs_tol: 1.0e-10
  rel_tol: 1.0e-5
  dt_min: 1.0
  dt_max: 0.5
model: !Sis
  total_population: 1000
  infected: 10
  time_infected: 2
  transmission_probability_on_contact: 0.5
  contacts:
    baselines: [[[3.0]]]
"#;
        assert!(matches!(
            Settings::read(&mut yaml.as_bytes()),
            Err(CompartmentalError::ConfigurationError(_))
        ));
        let valid = yaml.replace("dt_min: 1.0", "dt_min: 0.1");
        assert!(Settings::read(&mut valid.as_bytes()).is_ok());

        let mut settings = settings();
        settings.integrator = ImplicitEulerIntegratorCore::new(1e-10, 1e-10, 100, 0.).into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn sir_settings_serialize() {
        let settings = Settings {
            model: ModelSettings::Sir(SirSettings {
                total_population: 100.,
                infected: UncertainValue::new(1.),
                recovered: UncertainValue::new(0.),
                time_infected: UncertainValue::new(2.),
                transmission_probability_on_contact: UncertainValue::new(1.),
                contacts: ContactSettings::constant(1, 1.),
            }),
            ..settings()
        };
        let yaml = settings.to_string();
        assert!(yaml.contains("!Sir"));
        let mut reader = yaml.as_bytes();
        assert_eq!(Settings::read(&mut reader).unwrap(), settings);
    }
}
