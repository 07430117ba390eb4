//! ODE integration
//!
//! An `IntegratorCore` performs single steps of one of the supported methods. The
//! `OdeIntegrator` repeats steps until a requested end time is reached and records every
//! accepted step in a `TimeSeries`.
//!
//! Derivative functions have the signature `f(y, t, dydt)`; `dydt` is zeroed before every call.

mod euler;
mod implicit_euler;
mod ode_integrator;
mod runge_kutta;

pub use euler::EulerIntegratorCore;
pub use implicit_euler::ImplicitEulerIntegratorCore;
pub use ode_integrator::OdeIntegrator;
pub use runge_kutta::RungeKuttaIntegratorCore;

use ndarray::{ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use crate::errors::{CompartmentalError, Result};

/// The available integration methods.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum IntegratorCore {
    Euler(EulerIntegratorCore),
    ImplicitEuler(ImplicitEulerIntegratorCore),
    RungeKutta(RungeKuttaIntegratorCore),
}

impl Default for IntegratorCore {
    fn default() -> Self {
        IntegratorCore::RungeKutta(RungeKuttaIntegratorCore::default())
    }
}

impl From<EulerIntegratorCore> for IntegratorCore {
    fn from(core: EulerIntegratorCore) -> Self {
        IntegratorCore::Euler(core)
    }
}

impl From<ImplicitEulerIntegratorCore> for IntegratorCore {
    fn from(core: ImplicitEulerIntegratorCore) -> Self {
        IntegratorCore::ImplicitEuler(core)
    }
}

impl From<RungeKuttaIntegratorCore> for IntegratorCore {
    fn from(core: RungeKuttaIntegratorCore) -> Self {
        IntegratorCore::RungeKutta(core)
    }
}

/// Tolerances must be non-negative and not both zero.
fn validate_tolerances(abs_tol: f64, rel_tol: f64) -> Result<()> {
    if !(abs_tol >= 0. && rel_tol >= 0. && abs_tol + rel_tol > 0.) {
        return Err(CompartmentalError::ConfigurationError(format!(
            "Integrator tolerances abs_tol = {abs_tol} and rel_tol = {rel_tol} are invalid"
        )));
    }
    Ok(())
}

impl IntegratorCore {
    /// Check the configuration of the method.
    pub fn validate(&self) -> Result<()> {
        match self {
            IntegratorCore::Euler(_) => Ok(()),
            IntegratorCore::ImplicitEuler(core) => core.validate(),
            IntegratorCore::RungeKutta(core) => core.validate(),
        }
    }

    /// Attempt one step from `(t, yt)`.
    ///
    /// Returns whether the step was accepted. Only accepted steps advance `t` and write
    /// `ytp1`; adaptive methods also update `dt` to the step size proposed for the next step.
    pub fn step<F>(
        &mut self,
        f: &mut F,
        yt: ArrayView1<f64>,
        t: &mut f64,
        dt: &mut f64,
        ytp1: ArrayViewMut1<f64>,
    ) -> bool
    where
        F: FnMut(ArrayView1<f64>, f64, ArrayViewMut1<f64>),
    {
        match self {
            IntegratorCore::Euler(core) => core.step(f, yt, t, dt, ytp1),
            IntegratorCore::ImplicitEuler(core) => core.step(f, yt, t, dt, ytp1),
            IntegratorCore::RungeKutta(core) => core.step(f, yt, t, dt, ytp1),
        }
    }
}
