use ndarray::{ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// Explicit Euler method, `y(t + dt) = y(t) + dt * f(y(t), t)`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EulerIntegratorCore {}

impl EulerIntegratorCore {
    pub fn new() -> Self {
        Self {}
    }

    /// Always accepted, `dt` is not changed.
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
        ytp1.fill(0.);
        f(yt.view(), *t, ytp1.view_mut());
        ytp1 *= *dt;
        ytp1 += &yt;
        *t += *dt;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    #[test]
    fn single_step() {
        let mut core = EulerIntegratorCore::new();
        let mut f = |y: ArrayView1<f64>, _t: f64, mut dydt: ArrayViewMut1<f64>| {
            dydt[0] = -y[0];
            dydt[1] = 2.;
        };
        let yt = array![1., 0.];
        let mut ytp1 = Array1::<f64>::zeros(2);
        let mut t = 1.;
        let mut dt = 0.1;

        assert!(core.step(&mut f, yt.view(), &mut t, &mut dt, ytp1.view_mut()));
        assert!((ytp1[0] - 0.9).abs() < 1e-15);
        assert!((ytp1[1] - 0.2).abs() < 1e-15);
        assert_eq!(t, 1.1);
        assert_eq!(dt, 0.1);
    }
}
