//! Post-processing of simulation results and ensembles.

use itertools::Itertools;

use crate::core::TimeSeries;
use crate::models::ParameterSampling;

/// Times this close to a full day count as that day.
const DAY_TOLERANCE: f64 = 1e-10;

/// Linearly interpolate a result on every full day between its first and last time point.
pub fn interpolate_simulation_result(result: &TimeSeries) -> TimeSeries {
    let mut interpolated = TimeSeries::new(result.get_num_elements());
    if result.is_empty() {
        return interpolated;
    }

    let times = result.get_times();
    let first_day = (times[0] - DAY_TOLERANCE).ceil() as i64;
    let last_day = (result.get_last_time() + DAY_TOLERANCE).floor() as i64;

    for day in first_day..=last_day {
        let t = day as f64;
        let upper = times.partition_point(|&time| time < t);
        let mut value = interpolated.add_time_point(t);
        if upper == 0 {
            value.assign(&result.get_value(0));
        } else if upper == times.len() {
            value.assign(&result.get_last_value());
        } else {
            let lower = upper - 1;
            let weight = (t - times[lower]) / (times[upper] - times[lower]);
            let before = result.get_value(lower);
            let after = result.get_value(upper);
            value.assign(&(&before + &((&after - &before) * weight)));
        }
    }
    interpolated
}

fn check_ensemble(ensemble: &[TimeSeries]) {
    assert!(!ensemble.is_empty(), "Ensemble contains no results");
    let first = &ensemble[0];
    for result in ensemble.iter().skip(1) {
        assert!(
            result.get_num_elements() == first.get_num_elements()
                && result.get_times() == first.get_times(),
            "Ensemble results do not share their time points and elements"
        );
    }
}

/// Mean over all results of the ensemble at every time point.
///
/// # Panics
///
/// Panics if the ensemble is empty or its results differ in time points or elements.
pub fn ensemble_mean(ensemble: &[TimeSeries]) -> TimeSeries {
    check_ensemble(ensemble);
    let num_runs = ensemble.len() as f64;
    let mut mean = TimeSeries::new(ensemble[0].get_num_elements());
    for (index, &time) in ensemble[0].get_times().iter().enumerate() {
        let mut value = mean.add_time_point(time);
        for result in ensemble {
            value += &result.get_value(index);
        }
        value /= num_runs;
    }
    mean
}

/// Percentile `p` over all results of the ensemble, per time point and element.
///
/// The percentile is the value at position `floor(n * p)` of the sorted `n` results.
///
/// # Panics
///
/// Panics if `p` is not within `[0, 1]`, or for ensembles rejected by `ensemble_mean`.
pub fn ensemble_percentile(ensemble: &[TimeSeries], p: f64) -> TimeSeries {
    assert!((0. ..=1.).contains(&p), "Percentile {p} not within [0, 1]");
    check_ensemble(ensemble);
    let num_runs = ensemble.len();
    let position = ((num_runs as f64 * p).floor() as usize).min(num_runs - 1);

    let mut percentile = TimeSeries::new(ensemble[0].get_num_elements());
    for (index, &time) in ensemble[0].get_times().iter().enumerate() {
        let mut value = percentile.add_time_point(time);
        for (element, entry) in value.iter_mut().enumerate() {
            *entry = ensemble
                .iter()
                .map(|result| result.get_value(index)[element])
                .sorted_by(f64::total_cmp)
                .nth(position)
                .unwrap_or_default();
        }
    }
    percentile
}

/// Percentile `p` of every uncertain parameter over an ensemble of sampled models.
///
/// Each parameter is chosen independently, at the same position as in `ensemble_percentile`,
/// so the returned model need not be a member of the ensemble. All other properties are those
/// of the first model.
///
/// # Panics
///
/// Panics if `p` is not within `[0, 1]` or the ensemble is empty.
pub fn ensemble_params_percentile<M: ParameterSampling + Clone>(ensemble: &[M], p: f64) -> M {
    assert!((0. ..=1.).contains(&p), "Percentile {p} not within [0, 1]");
    assert!(!ensemble.is_empty(), "Ensemble contains no models");
    let num_runs = ensemble.len();
    let position = ((num_runs as f64 * p).floor() as usize).min(num_runs - 1);

    let samples: Vec<Vec<f64>> = ensemble
        .iter()
        .map(|model| {
            model
                .uncertain_values()
                .into_iter()
                .map(|(_, value)| value.value())
                .collect()
        })
        .collect();

    let mut percentile = ensemble[0].clone();
    for (index, (name, value)) in percentile.uncertain_values_mut().into_iter().enumerate() {
        debug_assert!(
            samples.iter().all(|sample| sample.len() > index),
            "Model of the ensemble has no parameter {name}"
        );
        let entries = samples.iter().map(|sample| sample[index]);
        if let Some(entry) = entries.sorted_by(f64::total_cmp).nth(position) {
            value.set_value(entry);
        }
    }
    percentile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SirModel;
    use crate::models::sir::InfectionState;
    use ndarray::array;

    fn series(points: &[(f64, f64)]) -> TimeSeries {
        let mut series = TimeSeries::new(2);
        for &(time, value) in points {
            series.add_time_point_with(time, array![value, 2. * value].view());
        }
        series
    }

    #[test]
    fn interpolate_on_days() {
        let result = series(&[(0.5, 1.), (1.5, 3.), (2.25, 4.5), (3.5, 7.)]);
        let interpolated = interpolate_simulation_result(&result);
        assert_eq!(interpolated.get_times(), &[1., 2., 3.]);
        assert!((interpolated.get_value(0)[0] - 2.).abs() < 1e-12);
        assert!((interpolated.get_value(1)[1] - 8.).abs() < 1e-12);
        assert!((interpolated.get_value(2)[0] - 6.).abs() < 1e-12);
    }

    #[test]
    fn interpolate_keeps_full_days() {
        let result = series(&[(0., 1.), (0.4, 2.), (1. - 1e-12, 5.)]);
        let interpolated = interpolate_simulation_result(&result);
        assert_eq!(interpolated.get_times(), &[0., 1.]);
        assert_eq!(interpolated.get_value(0)[0], 1.);
        assert_eq!(interpolated.get_value(1)[0], 5.);
        assert!(interpolate_simulation_result(&TimeSeries::new(2)).is_empty());
    }

    #[test]
    fn mean_and_percentiles() {
        let ensemble: Vec<TimeSeries> = [3., 1., 4., 2.]
            .iter()
            .map(|&value| series(&[(0., value), (1., 10. * value)]))
            .collect();

        let mean = ensemble_mean(&ensemble);
        assert_eq!(mean.get_value(0), array![2.5, 5.]);
        assert_eq!(mean.get_value(1), array![25., 50.]);

        assert_eq!(ensemble_percentile(&ensemble, 0.).get_value(0), array![1., 2.]);
        assert_eq!(ensemble_percentile(&ensemble, 0.5).get_value(0), array![3., 6.]);
        assert_eq!(ensemble_percentile(&ensemble, 0.7).get_value(1), array![30., 60.]);
        assert_eq!(ensemble_percentile(&ensemble, 0.95).get_value(1), array![40., 80.]);
        assert_eq!(ensemble_percentile(&ensemble, 1.).get_value(1), array![40., 80.]);
    }

    #[test]
    fn parameter_percentiles() {
        let ensemble: Vec<SirModel> = [(3., 0.4), (1., 0.1), (4., 0.2), (2., 0.3)]
            .iter()
            .map(|&(time_infected, transmission)| {
                let mut model = SirModel::new();
                model.populations.set((InfectionState::Infected,), time_infected);
                model.parameters.time_infected.set_value(time_infected);
                model
                    .parameters
                    .transmission_probability_on_contact
                    .set_value(transmission);
                model
            })
            .collect();

        let low = ensemble_params_percentile(&ensemble, 0.);
        assert_eq!(low.parameters.time_infected, 1.);
        assert_eq!(low.parameters.transmission_probability_on_contact, 0.1);
        assert_eq!(*low.populations.get((InfectionState::Infected,)), 1.);

        let median = ensemble_params_percentile(&ensemble, 0.5);
        assert_eq!(median.parameters.time_infected, 3.);
        assert_eq!(median.parameters.transmission_probability_on_contact, 0.3);

        let high = ensemble_params_percentile(&ensemble, 1.);
        assert_eq!(high.parameters.time_infected, 4.);
        assert_eq!(high.parameters.transmission_probability_on_contact, 0.4);
    }

    #[test]
    #[should_panic]
    fn empty_parameter_ensemble() {
        ensemble_params_percentile::<SirModel>(&[], 0.5);
    }

    #[test]
    #[should_panic]
    fn mismatched_ensemble() {
        ensemble_mean(&[series(&[(0., 1.)]), series(&[(1., 1.)])]);
    }
}
