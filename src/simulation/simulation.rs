use ndarray::ArrayView1;

use super::model::CompartmentalModel;
use crate::core::TimeSeries;
use crate::errors::Result;
use crate::integrator::{IntegratorCore, OdeIntegrator};

/// Integrates a compartmental model and records its states.
#[derive(Clone, Debug)]
pub struct Simulation<M: CompartmentalModel> {
    model: M,
    integrator: OdeIntegrator,
    result: TimeSeries,
    dt: f64,
}

impl<M: CompartmentalModel> Simulation<M> {
    /// Start at `t0` from the model's initial values with initial step size `dt`.
    pub fn new(model: M, t0: f64, dt: f64) -> Self {
        let result = TimeSeries::with_initial(t0, model.get_initial_values().view());
        Self {
            model,
            integrator: OdeIntegrator::default(),
            result,
            dt,
        }
    }

    pub fn set_integrator(&mut self, core: IntegratorCore) {
        self.integrator.set_core(core);
    }

    pub fn get_integrator(&self) -> &IntegratorCore {
        self.integrator.get_core()
    }

    /// Advance the simulation to `tmax` and return the final state.
    pub fn advance(&mut self, tmax: f64) -> Result<ArrayView1<'_, f64>> {
        let model = &self.model;
        self.integrator.advance(
            |y, t, dydt| model.get_derivatives(y, y, t, dydt),
            tmax,
            &mut self.dt,
            &mut self.result,
        )?;
        Ok(self.result.get_last_value())
    }

    pub fn get_result(&self) -> &TimeSeries {
        &self.result
    }

    /// The result may be edited between calls to `advance`, e.g. to move individuals.
    pub fn get_result_mut(&mut self) -> &mut TimeSeries {
        &mut self.result
    }

    pub fn into_result(self) -> TimeSeries {
        self.result
    }

    pub fn get_model(&self) -> &M {
        &self.model
    }

    pub fn get_model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Step size proposed for the next step.
    pub fn get_dt(&self) -> f64 {
        self.dt
    }
}

/// Simulate `model` from `t0` to `tmax`.
///
/// Uses the adaptive Runge-Kutta method unless another integrator is given.
pub fn simulate<M: CompartmentalModel + Clone>(
    t0: f64,
    tmax: f64,
    dt: f64,
    model: &M,
    integrator: Option<IntegratorCore>,
) -> Result<TimeSeries> {
    let violations = model.check_constraints();
    if violations > 0 {
        log::warn!("Simulating a model with {violations} constraint violations");
    }
    let mut simulation = Simulation::new(model.clone(), t0, dt);
    if let Some(core) = integrator {
        simulation.set_integrator(core);
    }
    simulation.advance(tmax)?;
    Ok(simulation.into_result())
}
