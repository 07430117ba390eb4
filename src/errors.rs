//! All errors that can occur in the compartmental library.

use std::fmt;

pub type Result<T> = std::result::Result<T, CompartmentalError>;

#[derive(Debug)]
pub enum CompartmentalError {
    ConfigurationError(String),
    ReadError(String),
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
    CsvError(csv::Error),
    /// An integration step was rejected although the step size could not shrink any further.
    IntegrationError { time: f64, dt: f64 },
}

impl fmt::Display for CompartmentalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompartmentalError::ConfigurationError(message) => {
                write!(f, "ConfigurationError: {}", message)
            }
            CompartmentalError::ReadError(message) => write!(f, "ReadError: {}", message),
            CompartmentalError::IoError(error) => write!(f, "IO error: {}", error),
            CompartmentalError::YamlError(error) => write!(f, "YAML error: {}", error),
            CompartmentalError::CsvError(error) => write!(f, "CSV error: {}", error),
            CompartmentalError::IntegrationError { time, dt } => write!(
                f,
                "IntegrationError: step at t = {} rejected with minimal step size dt = {}",
                time, dt
            ),
        }
    }
}

impl std::error::Error for CompartmentalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompartmentalError::IoError(error) => Some(error),
            CompartmentalError::YamlError(error) => Some(error),
            CompartmentalError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}
