use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use super::validate_tolerances;
use crate::errors::{CompartmentalError, Result};

/// Number of stages of the Fehlberg 4(5) pair.
const STAGES: usize = 6;

const NODES: [f64; STAGES] = [0., 1. / 4., 3. / 8., 12. / 13., 1., 1. / 2.];

const COUPLING: [[f64; STAGES - 1]; STAGES] = [
    [0., 0., 0., 0., 0.],
    [1. / 4., 0., 0., 0., 0.],
    [3. / 32., 9. / 32., 0., 0., 0.],
    [1932. / 2197., -7200. / 2197., 7296. / 2197., 0., 0.],
    [439. / 216., -8., 3680. / 513., -845. / 4104., 0.],
    [-8. / 27., 2., -3544. / 2565., 1859. / 4104., -11. / 40.],
];

const WEIGHTS_LOW: [f64; STAGES] = [25. / 216., 0., 1408. / 2565., 2197. / 4104., -1. / 5., 0.];

const WEIGHTS_HIGH: [f64; STAGES] = [
    16. / 135.,
    0.,
    6656. / 12825.,
    28561. / 56430.,
    -9. / 50.,
    2. / 55.,
];

const SAFETY: f64 = 0.9;
const MIN_SCALE: f64 = 0.25;
const MAX_SCALE: f64 = 4.;

/// Adaptive Runge-Kutta-Fehlberg 4(5) method.
///
/// Steps advance with the fourth order solution, the difference to the fifth order solution
/// estimates the local error. A step is accepted if the error of every component `i` satisfies
/// `error_i <= abs_tol + rel_tol * |y_i|`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RungeKuttaIntegratorCore {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    #[serde(skip)]
    stages: Array2<f64>,
    #[serde(skip)]
    eval: Array1<f64>,
    #[serde(skip)]
    solution: Array1<f64>,
}

impl Default for RungeKuttaIntegratorCore {
    fn default() -> Self {
        Self::new(1e-10, 1e-5, f64::EPSILON, f64::MAX)
    }
}

impl RungeKuttaIntegratorCore {
    pub fn new(abs_tol: f64, rel_tol: f64, dt_min: f64, dt_max: f64) -> Self {
        assert!(
            0. < dt_min && dt_min <= dt_max,
            "Step size bounds [{dt_min}, {dt_max}] are invalid"
        );
        Self {
            abs_tol,
            rel_tol,
            dt_min,
            dt_max,
            stages: Array2::zeros((STAGES, 0)),
            eval: Array1::zeros(0),
            solution: Array1::zeros(0),
        }
    }

    /// Check the tolerances and step size bounds, e.g. after deserialization.
    pub fn validate(&self) -> Result<()> {
        if !(0. < self.dt_min && self.dt_min <= self.dt_max) {
            return Err(CompartmentalError::ConfigurationError(format!(
                "Step size bounds [{}, {}] of the Runge-Kutta integrator are invalid",
                self.dt_min, self.dt_max
            )));
        }
        validate_tolerances(self.abs_tol, self.rel_tol)
    }

    /// Attempt one step of size `dt`, restricted to at most `dt_max`.
    ///
    /// On acceptance `t` is advanced, `ytp1` receives the new state and `dt` is set to the
    /// proposed next step size within `[dt_min, dt_max]`. On rejection only `dt` shrinks; it is
    /// left unchanged if it is already at or below `dt_min`. A step shorter than `dt_min` is
    /// taken as requested, never lengthened.
    pub fn step<F>(
        &mut self,
        f: &mut F,
        yt: ArrayView1<f64>,
        t: &mut f64,
        dt: &mut f64,
        mut ytp1: ArrayViewMut1<f64>,
    ) -> bool
    where
        F: FnMut(ArrayView1<f64>, f64, ArrayViewMut1<f64>),
    {
        let num_elements = yt.len();
        if self.eval.len() != num_elements {
            self.stages = Array2::zeros((STAGES, num_elements));
            self.eval = Array1::zeros(num_elements);
            self.solution = Array1::zeros(num_elements);
        }

        if *dt > self.dt_max {
            log::debug!("Restricting step size dt = {} to {}", dt, self.dt_max);
        }
        // steps below dt_min are only requested to end exactly on a final time point
        let step_size = dt.min(self.dt_max);

        for stage in 0..STAGES {
            self.eval.assign(&yt);
            for (previous, &coupling) in COUPLING[stage].iter().enumerate().take(stage) {
                if coupling != 0. {
                    self.eval
                        .scaled_add(step_size * coupling, &self.stages.row(previous));
                }
            }
            let mut derivative = self.stages.row_mut(stage);
            derivative.fill(0.);
            f(self.eval.view(), *t + NODES[stage] * step_size, derivative);
        }

        self.solution.assign(&yt);
        for (stage, &weight) in WEIGHTS_LOW.iter().enumerate() {
            if weight != 0. {
                self.solution
                    .scaled_add(step_size * weight, &self.stages.row(stage));
            }
        }

        // smallest ratio of tolerance to error estimate over all components
        let mut ratio = f64::INFINITY;
        for component in 0..num_elements {
            let difference: f64 = (0..STAGES)
                .map(|stage| {
                    (WEIGHTS_HIGH[stage] - WEIGHTS_LOW[stage]) * self.stages[[stage, component]]
                })
                .sum();
            let error = (step_size * difference).abs();
            let tolerance = self.abs_tol + self.rel_tol * self.solution[component].abs();
            ratio = ratio.min(tolerance / error);
            if error.is_nan() {
                ratio = f64::NAN;
                break;
            }
        }

        let accepted = ratio >= 1.;
        let scale = if ratio.is_nan() {
            MIN_SCALE
        } else {
            (SAFETY * ratio.powf(0.2)).clamp(MIN_SCALE, MAX_SCALE)
        };

        if accepted {
            ytp1.assign(&self.solution);
            *t += step_size;
            *dt = (step_size * scale).clamp(self.dt_min, self.dt_max);
            true
        } else {
            *dt = f64::max(step_size * scale.min(1.), self.dt_min.min(step_size));
            log::trace!(
                "Step at t = {} with dt = {} rejected, retry with dt = {}",
                t,
                step_size,
                dt
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_large_step() {
        let mut core = RungeKuttaIntegratorCore::new(1e-10, 1e-10, 1e-6, 10.);
        let mut f = |y: ArrayView1<f64>, _t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = y[0];
        };
        let yt = array![1.];
        let mut ytp1 = array![-1.];
        let mut t = 0.;
        let mut dt = 2.;

        assert!(!core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert!(dt < 2.);
        assert!(dt >= 1e-6);
        assert_eq!(t, 0.);
        assert_eq!(ytp1[0], -1.);
    }

    #[test]
    fn accepts_small_step() {
        let mut core = RungeKuttaIntegratorCore::new(1e-8, 1e-8, 1e-6, 1.);
        let mut f = |y: ArrayView1<f64>, _t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = -y[0];
        };
        let yt = array![1.];
        let mut ytp1 = array![0.];
        let mut t = 0.;
        let mut dt = 0.01;

        assert!(core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert_eq!(t, 0.01);
        assert!((ytp1[0] - (-0.01f64).exp()).abs() < 1e-10);
        assert!(dt > 0.01);
        assert!(dt <= 1.);
    }

    #[test]
    fn polynomial_integrated_exactly() {
        let mut core = RungeKuttaIntegratorCore::default();
        let mut f = |_y: ArrayView1<f64>, t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = 3. * t * t;
        };
        let yt = array![0.];
        let mut ytp1 = array![0.];
        let mut t = 0.;
        let mut dt = 1.;

        assert!(core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert!((ytp1[0] - 1.).abs() < 1e-12);
    }

    #[test]
    fn floor_keeps_step_size() {
        let mut core = RungeKuttaIntegratorCore::new(1e-14, 0., 0.5, 1.);
        let mut f = |y: ArrayView1<f64>, _t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = 10. * y[0];
        };
        let yt = array![1.];
        let mut ytp1 = array![0.];
        let mut t = 0.;
        let mut dt = 0.5;

        assert!(!core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert_eq!(dt, 0.5);
    }

    #[test]
    fn short_step_not_lengthened() {
        let mut core = RungeKuttaIntegratorCore::new(1e-3, 1e-3, 1., 1.);
        let mut f = |y: ArrayView1<f64>, _t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = -0.1 * y[0];
        };
        let yt = array![1.];
        let mut ytp1 = array![0.];
        let mut t = 0.;
        let mut dt = 0.1;

        assert!(core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert_eq!(t, 0.1);
        assert!((ytp1[0] - (-0.01f64).exp()).abs() < 1e-10);
        assert_eq!(dt, 1.);
    }

    #[test]
    fn validate_bounds() {
        assert!(RungeKuttaIntegratorCore::default().validate().is_ok());
        let mut core = RungeKuttaIntegratorCore::default();
        core.dt_min = 1.;
        core.dt_max = 0.5;
        assert!(core.validate().is_err());
        core.dt_max = 1.;
        core.rel_tol = -1e-5;
        assert!(core.validate().is_err());
        core.rel_tol = 0.;
        core.abs_tol = 0.;
        assert!(core.validate().is_err());
        core.dt_min = 0.;
        core.abs_tol = 1e-10;
        assert!(core.validate().is_err());
    }
}
