use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

use super::validate_tolerances;
use crate::errors::{CompartmentalError, Result};

/// Implicit Euler method, `y(t + dt) = y(t) + dt * f(y(t + dt), t + dt)`.
///
/// The implicit equation is solved by fixed-point iteration starting from an explicit Euler
/// predictor. The iteration converges if `dt` times the Lipschitz constant of `f` is below one;
/// a step that does not converge within `max_iterations` is rejected and `dt` is halved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImplicitEulerIntegratorCore {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iterations: usize,
    pub dt_min: f64,
    #[serde(skip)]
    iterate: Array1<f64>,
    #[serde(skip)]
    next: Array1<f64>,
    #[serde(skip)]
    derivative: Array1<f64>,
}

impl Default for ImplicitEulerIntegratorCore {
    fn default() -> Self {
        Self::new(1e-10, 1e-10, 100, 1e-8)
    }
}

impl ImplicitEulerIntegratorCore {
    pub fn new(abs_tol: f64, rel_tol: f64, max_iterations: usize, dt_min: f64) -> Self {
        Self {
            abs_tol,
            rel_tol,
            max_iterations,
            dt_min,
            iterate: Array1::zeros(0),
            next: Array1::zeros(0),
            derivative: Array1::zeros(0),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CompartmentalError::ConfigurationError(
                "The implicit Euler integrator needs at least one iteration".to_string(),
            ));
        }
        if self.dt_min.is_nan() || self.dt_min <= 0. {
            return Err(CompartmentalError::ConfigurationError(format!(
                "Minimal step size dt_min = {} of the implicit Euler integrator must be positive",
                self.dt_min
            )));
        }
        validate_tolerances(self.abs_tol, self.rel_tol)
    }

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
        if self.iterate.len() != num_elements {
            self.iterate = Array1::zeros(num_elements);
            self.next = Array1::zeros(num_elements);
            self.derivative = Array1::zeros(num_elements);
        }

        // explicit predictor
        self.derivative.fill(0.);
        f(yt.view(), *t, self.derivative.view_mut());
        self.iterate.assign(&yt);
        self.iterate.scaled_add(*dt, &self.derivative);

        for iteration in 0..self.max_iterations {
            self.derivative.fill(0.);
            f(self.iterate.view(), *t + *dt, self.derivative.view_mut());
            self.next.assign(&yt);
            self.next.scaled_add(*dt, &self.derivative);

            let converged = Zip::from(&self.next)
                .and(&self.iterate)
                .all(|&next, &iterate| (next - iterate).abs() <= self.abs_tol + self.rel_tol * next.abs());
            std::mem::swap(&mut self.iterate, &mut self.next);

            if converged {
                log::trace!("Implicit Euler converged after {} iterations", iteration + 1);
                ytp1.assign(&self.iterate);
                *t += *dt;
                return true;
            }
        }

        let shrunk = f64::max(0.5 * *dt, self.dt_min.min(*dt));
        log::debug!(
            "Implicit Euler did not converge at t = {} with dt = {}, retry with dt = {}",
            t,
            dt,
            shrunk
        );
        *dt = shrunk;
        false
    }
}
