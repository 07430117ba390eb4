//! Compartmental disease models built on the core types.
//!
//! Parameters follow two validity rules: time constants must be at least `TOL_TIMES` days, and
//! probabilities must lie in `[0, 1]`. `check_constraints` logs and counts violations,
//! `apply_constraints` logs and replaces invalid values.

pub mod secir;
pub mod sir;
pub mod sis;

pub use secir::{SecirModel, SecirParameters};
pub use sir::{SirModel, SirParameters};
pub use sis::SisModel;

use rand::Rng;

use crate::core::{NormalParameters, ParameterDistribution, UncertainValue};

/// Smallest valid time constant in days.
pub const TOL_TIMES: f64 = 0.1;

/// Models with uncertain parameters that can be resampled for ensemble runs.
pub trait ParameterSampling {
    /// Attach normal distributions with standard deviation `relative_dev * value` to all
    /// uncertain parameters and populations.
    fn set_params_distributions_normal(&mut self, relative_dev: f64);

    /// Draw new parameters, dampings and populations, then apply the constraints.
    fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// All populations and scalar parameters with their names, in a fixed order.
    fn uncertain_values(&self) -> Vec<(String, &UncertainValue)>;

    /// Mutable access in the order of `uncertain_values`.
    fn uncertain_values_mut(&mut self) -> Vec<(String, &mut UncertainValue)>;
}

/// Name of a parameter or compartment of one age group, plain if there is only one group.
pub(crate) fn group_name(name: &str, group: usize, num_groups: usize) -> String {
    match num_groups {
        1 => name.to_string(),
        _ => format!("{name}_{group}"),
    }
}

/// Cosine interpolation between `(x_left, y_left)` and `(x_right, y_right)`.
///
/// Constant `y_left` left of `x_left` and `y_right` right of `x_right`.
pub fn smoother_cosine(x: f64, x_left: f64, x_right: f64, y_left: f64, y_right: f64) -> f64 {
    if x <= x_left {
        return y_left;
    }
    if x >= x_right {
        return y_right;
    }
    0.5 * (y_left - y_right) * (std::f64::consts::PI / (x_right - x_left) * (x - x_left)).cos()
        + 0.5 * (y_left + y_right)
}

pub(crate) fn check_time(name: &str, value: &UncertainValue) -> usize {
    if *value < TOL_TIMES {
        log::error!("Constraint check: Parameter {name} {value:.4} smaller than {TOL_TIMES:.4}");
        return 1;
    }
    0
}

pub(crate) fn apply_time(name: &str, value: &mut UncertainValue, replacement: f64) -> usize {
    if *value < TOL_TIMES {
        log::warn!("Constraint check: Parameter {name} changed from {value:.4} to {replacement:.4}");
        value.set_value(replacement);
        return 1;
    }
    0
}

pub(crate) fn check_probability(name: &str, value: &UncertainValue) -> usize {
    if *value < 0. || *value > 1. {
        log::error!("Constraint check: Parameter {name} {value:.4} not in [0, 1]");
        return 1;
    }
    0
}

pub(crate) fn apply_probability(name: &str, value: &mut UncertainValue) -> usize {
    if *value < 0. || *value > 1. {
        log::warn!("Constraint check: Parameter {name} changed from {value:.4} to 0");
        value.set_value(0.);
        return 1;
    }
    0
}

pub(crate) fn check_non_negative(name: &str, value: &UncertainValue) -> usize {
    if *value < 0. {
        log::error!("Constraint check: Parameter {name} {value:.4} smaller than 0");
        return 1;
    }
    0
}

pub(crate) fn apply_non_negative(name: &str, value: &mut UncertainValue) -> usize {
    if *value < 0. {
        log::warn!("Constraint check: Parameter {name} changed from {value:.4} to 0");
        value.set_value(0.);
        return 1;
    }
    0
}

/// Attach a relative normal distribution, with the upper bound capped at `upper_limit`.
///
/// Non-positive values keep their value without distribution.
pub(crate) fn set_normal(value: &mut UncertainValue, relative_dev: f64, upper_limit: Option<f64>) {
    if *value <= 0. {
        return;
    }
    let distribution = match ParameterDistribution::normal_relative(value.value(), relative_dev) {
        ParameterDistribution::Normal(parameters) => ParameterDistribution::Normal(NormalParameters {
            upper_bound: upper_limit.map_or(parameters.upper_bound, |limit| {
                parameters.upper_bound.min(limit)
            }),
            ..parameters
        }),
        distribution => distribution,
    };
    value.set_distribution(&distribution);
}
