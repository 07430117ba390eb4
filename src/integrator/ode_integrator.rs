use ndarray::{Array1, ArrayView1, ArrayViewMut1};

use super::IntegratorCore;
use crate::core::TimeSeries;
use crate::errors::{CompartmentalError, Result};

/// Remaining intervals below this fraction of the whole interval are not integrated.
const TIME_TOLERANCE: f64 = 1e-10;

/// Repeats integrator steps and records the accepted ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OdeIntegrator {
    core: IntegratorCore,
}

impl OdeIntegrator {
    pub fn new(core: IntegratorCore) -> Self {
        Self { core }
    }

    pub fn get_core(&self) -> &IntegratorCore {
        &self.core
    }

    pub fn set_core(&mut self, core: IntegratorCore) {
        self.core = core;
    }

    /// Integrate from the last time point of `results` up to `tmax`.
    ///
    /// Every accepted step is appended to `results`, the last step is shortened to end at
    /// `tmax`. `dt` is the initial step size and receives the step size proposed for the next
    /// call. If a step is rejected without the step size shrinking, integration stops with an
    /// `IntegrationError` and `results` holds all points accepted so far. An invalid integrator
    /// configuration is reported as `ConfigurationError` before any step.
    ///
    /// # Panics
    ///
    /// Panics if `results` is empty, `tmax` is not after its last time point or `dt` is not
    /// positive.
    pub fn advance<F>(
        &mut self,
        mut f: F,
        tmax: f64,
        dt: &mut f64,
        results: &mut TimeSeries,
    ) -> Result<()>
    where
        F: FnMut(ArrayView1<f64>, f64, ArrayViewMut1<f64>),
    {
        self.core.validate()?;
        let t0 = results.get_last_time();
        assert!(tmax > t0, "End time {tmax} must be after the last time point {t0}");
        assert!(*dt > 0., "Step size must be positive, got {dt}");

        let mut t = t0;
        let mut ytp1 = Array1::<f64>::zeros(results.get_num_elements());
        let mut num_steps = 0usize;
        let mut num_rejected = 0usize;

        while tmax - t > TIME_TOLERANCE * (tmax - t0) {
            let truncated = t + *dt > tmax;
            let requested = if truncated { tmax - t } else { *dt };
            let mut step_size = requested;
            let mut t_step = t;

            let accepted = self.core.step(
                &mut f,
                results.get_last_value(),
                &mut t_step,
                &mut step_size,
                ytp1.view_mut(),
            );

            if accepted {
                t = if truncated { tmax } else { t_step };
                results.add_time_point_with(t, ytp1.view());
                if !truncated {
                    *dt = step_size;
                }
                num_steps += 1;
            } else {
                num_rejected += 1;
                if step_size >= requested {
                    log::error!(
                        "Integration stopped at t = {t}, step of size {requested} rejected at the minimal step size"
                    );
                    return Err(CompartmentalError::IntegrationError {
                        time: t,
                        dt: requested,
                    });
                }
                *dt = step_size;
            }
        }

        // snap the final time point onto tmax if the loop stopped within tolerance
        *results.get_last_time_mut() = tmax;

        log::debug!(
            "Integrated from t = {t0} to t = {tmax} in {num_steps} steps ({num_rejected} rejected)"
        );
        Ok(())
    }
}
