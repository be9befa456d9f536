use crate::state::State;

/// Dense-output coefficients for a single accepted step, fit from the
/// endpoint states and slopes plus a midpoint sample. Evaluation is a
/// quartic Hermite polynomial in `theta = (t - t0) / dt`.
pub struct DenseOutput {
    t0: f64,
    dt: f64,
    c0: State,
    c1: State,
    c2: State,
    c3: State,
    c4: State,
}

impl DenseOutput {
    /// Fit dense-output coefficients from the endpoint states/slopes
    /// `(x0, f0)`, `(x1, f1)` and the midpoint state `xmid` of a step
    /// `[t0, t0 + dt]`.
    pub fn fit(t0: f64, dt: f64, x0: &State, f0: &State, x1: &State, f1: &State, xmid: &State) -> Self {
        let a = x1 - x0 - &(f0 * dt);
        let b = &(f1 * dt) - &(f0 * dt);
        let c = xmid - x0 - &(f0 * (0.5 * dt));

        let c0 = x0.clone();
        let c1 = f0 * dt;
        let c2 = &(&a * -5.0) + &b + &(&c * 16.0);
        let c3 = &(&b * -3.0) + &(&a * 14.0) - &(&c * 32.0);
        let c4 = &(&c * 16.0) - &(&a * 8.0) + &(&b * 2.0);

        Self { t0, dt, c0, c1, c2, c3, c4 }
    }

    /// Evaluate the interpolant at time `t`, which must lie in `[t0, t0+dt]`.
    pub fn evaluate(&self, t: f64) -> State {
        let theta = (t - self.t0) / self.dt;
        let mut out = self.c0.clone();
        out += &(&self.c1 * theta);
        out += &(&self.c2 * theta.powi(2));
        out += &(&self.c3 * theta.powi(3));
        out += &(&self.c4 * theta.powi(4));
        out
    }
}
