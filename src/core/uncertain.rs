//! Uncertain values
//!
//! An `UncertainValue` is a scalar that optionally owns a `ParameterDistribution`. The
//! distribution is only consulted by `draw_sample`; comparisons, arithmetic and formatting
//! use the current value alone.

use derive_more::{Deref, DerefMut};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Number of redraws before a normal sample outside its bounds is clamped.
const NORMAL_RETRIES: usize = 10;

/// Multiple of the standard deviation covered by relative normal distributions.
const RELATIVE_BOUND_FACTOR: f64 = 2.6;

/// Parameters of a normal distribution truncated to `[lower_bound, upper_bound]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NormalParameters {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub mean: f64,
    pub standard_dev: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UniformParameters {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Distribution with bounded support used to resample uncertain values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ParameterDistribution {
    Normal(NormalParameters),
    Uniform(UniformParameters),
}

impl ParameterDistribution {
    pub fn normal(lower_bound: f64, upper_bound: f64, mean: f64, standard_dev: f64) -> Self {
        ParameterDistribution::Normal(NormalParameters {
            lower_bound,
            upper_bound,
            mean,
            standard_dev,
        })
    }

    pub fn uniform(lower_bound: f64, upper_bound: f64) -> Self {
        ParameterDistribution::Uniform(UniformParameters {
            lower_bound,
            upper_bound,
        })
    }

    /// Normal distribution around `value` with standard deviation `relative_dev * value`.
    ///
    /// The support is `relative_dev * 2.6` standard deviations wide on both sides, with the
    /// lower bound kept positive. A zero value yields the point distribution at zero.
    pub fn normal_relative(value: f64, relative_dev: f64) -> Self {
        if value == 0. {
            return Self::normal(0., 0., 0., 0.);
        }
        let lower_bound = f64::max(1e-6, (1. - relative_dev * RELATIVE_BOUND_FACTOR) * value);
        let upper_bound = (1. + relative_dev * RELATIVE_BOUND_FACTOR) * value;
        Self::normal(lower_bound, upper_bound, value, relative_dev * value)
    }

    pub fn lower_bound(&self) -> f64 {
        match self {
            ParameterDistribution::Normal(parameters) => parameters.lower_bound,
            ParameterDistribution::Uniform(parameters) => parameters.lower_bound,
        }
    }

    pub fn upper_bound(&self) -> f64 {
        match self {
            ParameterDistribution::Normal(parameters) => parameters.upper_bound,
            ParameterDistribution::Uniform(parameters) => parameters.upper_bound,
        }
    }

    /// Draw one value within `[lower_bound, upper_bound]`.
    pub fn get_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ParameterDistribution::Normal(parameters) => Self::sample_normal(parameters, rng),
            ParameterDistribution::Uniform(parameters) => Self::sample_uniform(parameters, rng),
        }
    }

    fn sample_normal<R: Rng + ?Sized>(parameters: &NormalParameters, rng: &mut R) -> f64 {
        let lower = parameters.lower_bound;
        let upper = parameters.upper_bound;
        if upper <= lower {
            return lower;
        }

        let normal = match Normal::new(parameters.mean, parameters.standard_dev) {
            Ok(normal) => normal,
            Err(error) => {
                log::error!("Invalid normal distribution {parameters:?}: {error}");
                return parameters.mean.clamp(lower, upper);
            }
        };

        let mut sample = normal.sample(rng);
        let mut retries = 0;
        while (sample < lower || sample > upper) && retries < NORMAL_RETRIES {
            sample = normal.sample(rng);
            retries += 1;
        }
        if sample < lower || sample > upper {
            log::warn!(
                "Normal sample {sample} not within [{lower}, {upper}] after {NORMAL_RETRIES} retries"
            );
            sample = sample.clamp(lower, upper);
        }
        sample
    }

    fn sample_uniform<R: Rng + ?Sized>(parameters: &UniformParameters, rng: &mut R) -> f64 {
        match Uniform::new_inclusive(parameters.lower_bound, parameters.upper_bound) {
            Ok(uniform) => uniform.sample(rng),
            Err(error) => {
                log::warn!("Invalid uniform distribution {parameters:?}: {error}");
                parameters.lower_bound
            }
        }
    }
}

/// A scalar with an optional distribution it can be resampled from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Deref, DerefMut)]
#[serde(from = "UncertainValueField", into = "UncertainValueField")]
pub struct UncertainValue {
    #[deref]
    #[deref_mut]
    value: f64,
    distribution: Option<ParameterDistribution>,
}

/// Serialized form, a bare number unless a distribution is attached.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum UncertainValueField {
    Value(f64),
    Uncertain {
        value: f64,
        distribution: Option<ParameterDistribution>,
    },
}

impl From<UncertainValueField> for UncertainValue {
    fn from(field: UncertainValueField) -> Self {
        match field {
            UncertainValueField::Value(value) => UncertainValue::new(value),
            UncertainValueField::Uncertain {
                value,
                distribution,
            } => UncertainValue {
                value,
                distribution,
            },
        }
    }
}

impl From<UncertainValue> for UncertainValueField {
    fn from(uncertain: UncertainValue) -> Self {
        match uncertain.distribution {
            None => UncertainValueField::Value(uncertain.value),
            distribution => UncertainValueField::Uncertain {
                value: uncertain.value,
                distribution,
            },
        }
    }
}

impl UncertainValue {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            distribution: None,
        }
    }

    pub fn with_distribution(value: f64, distribution: ParameterDistribution) -> Self {
        Self {
            value,
            distribution: Some(distribution),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Assign a new value, the distribution is kept.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn get_distribution(&self) -> Option<&ParameterDistribution> {
        self.distribution.as_ref()
    }

    /// Attach a copy of `distribution`, replacing any previous one.
    pub fn set_distribution(&mut self, distribution: &ParameterDistribution) {
        self.distribution = Some(distribution.clone());
    }

    pub fn remove_distribution(&mut self) {
        self.distribution = None;
    }

    /// Replace the value with a draw from the distribution and return it.
    ///
    /// Without a distribution the value is left untouched.
    pub fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if let Some(distribution) = &self.distribution {
            self.value = distribution.get_sample(rng);
        }
        self.value
    }
}

impl From<f64> for UncertainValue {
    fn from(value: f64) -> Self {
        UncertainValue::new(value)
    }
}

impl From<&UncertainValue> for f64 {
    fn from(uncertain: &UncertainValue) -> Self {
        uncertain.value
    }
}

impl PartialEq for UncertainValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq<f64> for UncertainValue {
    fn eq(&self, other: &f64) -> bool {
        self.value == *other
    }
}

impl PartialOrd for UncertainValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl PartialOrd<f64> for UncertainValue {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.value.partial_cmp(other)
    }
}

impl fmt::Display for UncertainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn compare_values_only() {
        let plain = UncertainValue::new(3.);
        let uncertain =
            UncertainValue::with_distribution(3., ParameterDistribution::uniform(1., 5.));
        assert_eq!(plain, uncertain);
        assert_eq!(uncertain, 3.);
        assert!(uncertain < 4.);
        assert!(UncertainValue::new(2.) < plain);
        assert_eq!(*uncertain + 1., 4.);
    }

    #[test]
    fn draw_without_distribution() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut value = UncertainValue::new(1.5);
        assert_eq!(value.draw_sample(&mut rng), 1.5);
        assert_eq!(value, 1.5);
    }

    #[test]
    fn relative_normal_of_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let distribution = ParameterDistribution::normal_relative(0., 0.2);
        assert_eq!(distribution.lower_bound(), 0.);
        assert_eq!(distribution.upper_bound(), 0.);
        for _ in 0..10 {
            assert_eq!(distribution.get_sample(&mut rng), 0.);
        }
    }

    #[test]
    fn normal_samples_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let value = 3.;
        let relative_dev = 0.2;
        let distribution = ParameterDistribution::normal_relative(value, relative_dev);
        assert!((distribution.lower_bound() - (1. - 0.2 * 2.6) * value).abs() < 1e-12);
        assert!((distribution.upper_bound() - (1. + 0.2 * 2.6) * value).abs() < 1e-12);

        let mut uncertain = UncertainValue::new(value);
        uncertain.set_distribution(&distribution);
        for _ in 0..1000 {
            let sample = uncertain.draw_sample(&mut rng);
            assert!(sample >= distribution.lower_bound());
            assert!(sample <= distribution.upper_bound());
            assert_eq!(uncertain, sample);
        }
    }

    #[test]
    fn normal_clamped_when_bounds_are_narrow() {
        let mut rng = StdRng::seed_from_u64(1);
        let distribution = ParameterDistribution::normal(10., 10.5, 0., 1.);
        for _ in 0..20 {
            let sample = distribution.get_sample(&mut rng);
            assert!((10. ..=10.5).contains(&sample));
        }
    }

    #[test]
    fn uniform_samples_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let distribution = ParameterDistribution::uniform(0.6, 1.4);
        for _ in 0..1000 {
            let sample = distribution.get_sample(&mut rng);
            assert!((0.6..=1.4).contains(&sample));
        }
        let degenerate = ParameterDistribution::uniform(2., 1.);
        assert_eq!(degenerate.get_sample(&mut rng), 2.);
    }

    #[test]
    fn copies_own_their_distribution() {
        let mut original =
            UncertainValue::with_distribution(1., ParameterDistribution::uniform(0., 1.));
        let copy = original.clone();
        original.set_distribution(&ParameterDistribution::uniform(5., 6.));

        assert_eq!(
            copy.get_distribution(),
            Some(&ParameterDistribution::uniform(0., 1.))
        );
        assert_eq!(
            original.get_distribution(),
            Some(&ParameterDistribution::uniform(5., 6.))
        );
    }

    #[test]
    fn deserialize_plain_and_uncertain() {
        let plain: UncertainValue = serde_yaml::from_str("2.5").unwrap();
        assert_eq!(plain, 2.5);
        assert!(plain.get_distribution().is_none());

        let uncertain: UncertainValue = serde_yaml::from_str(
            "value: 2.5\ndistribution:\n  type: Uniform\n  lower_bound: 2\n  upper_bound: 3.0\n",
        )
        .unwrap();
        assert_eq!(
            uncertain.get_distribution(),
            Some(&ParameterDistribution::uniform(2., 3.))
        );

        let written = serde_yaml::to_string(&plain).unwrap();
        assert_eq!(written.trim(), "2.5");
    }
}
