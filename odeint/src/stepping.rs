use ndarray::{Axis, Zip};
use tolerance::Tolerances;

use crate::error::OdeResult;
use crate::state::{State, VectorField};

/// Step-size strategy selected for a driver run.
#[derive(Clone)]
pub enum StepMethod {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

/// Fixed step size; the driver walks the requested time grid directly and
/// this control carries no tunable state beyond the initial step.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedStepControl {
    pub dt: f64,
}

impl FixedStepControl {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

/// Hairer-style adaptive step-size control: a power-law update on the scaled
/// local error ratio, clamped by growth factors and (optionally) absolute
/// step bounds.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveStepControl {
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    pub min_dt: Option<f64>,
    pub max_dt: Option<f64>,
    /// When `Some(d)`, only the first `d` components of the trailing state
    /// axis contribute to the error norm (augmented/adjoint state).
    pub seminorm: Option<usize>,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            rel_tol: 1e-3,
            abs_tol: 1e-3,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
            min_dt: None,
            max_dt: None,
            seminorm: None,
        }
    }
}

impl AdaptiveStepControl {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol, ..Default::default() }
    }

    pub fn with_tolerances(mut self, rel_tol: f64, abs_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_seminorm(mut self, dim: usize) -> Self {
        self.seminorm = Some(dim);
        self
    }

    fn scale(&self, x0: &State, x1: &State) -> State {
        let tol = Tolerances::new(self.rel_tol, self.abs_tol);
        Zip::from(x0).and(x1).map_collect(|&a, &b| tol.scale(a, b))
    }

    /// Scaled Hairer RMS error ratio for a trial step from `x0` to `x1` with
    /// local error estimate `err`. A ratio `<= 1.0` means the step is
    /// acceptable.
    pub fn error_ratio(&self, x0: &State, x1: &State, err: &State) -> f64 {
        let scale = self.scale(x0, x1);
        error_norm(err, &scale, self.seminorm)
    }

    /// Propose the next step size given the just-taken `dt` and its error
    /// ratio, clamped to the configured growth and absolute bounds.
    pub fn adapt(&self, dt: f64, error_ratio: f64, order: usize) -> f64 {
        let r = error_ratio.max(1e-10);
        let factor = (self.safety * r.powf(-1.0 / order as f64))
            .clamp(self.min_factor, self.max_factor);
        let mut new_dt = dt * factor;
        if let Some(min_dt) = self.min_dt {
            new_dt = new_dt.max(min_dt);
        }
        if let Some(max_dt) = self.max_dt {
            new_dt = new_dt.min(max_dt);
        }
        new_dt
    }
}

/// Root-mean-square error norm over the (optionally seminorm-restricted)
/// trailing axis of `err`, scaled componentwise by `scale`.
pub fn error_norm(err: &State, scale: &State, seminorm: Option<usize>) -> f64 {
    if err.ndim() == 0 {
        let e = *err.first().expect("0-dim array has exactly one element");
        let s = *scale.first().expect("0-dim array has exactly one element");
        return (e / s).abs();
    }
    let last = Axis(err.ndim() - 1);
    let mut sum = 0.0;
    let mut count = 0usize;
    for (e_lane, s_lane) in err.lanes(last).into_iter().zip(scale.lanes(last)) {
        let take = seminorm.unwrap_or(e_lane.len()).min(e_lane.len());
        for i in 0..take {
            let v = e_lane[i] / s_lane[i];
            sum += v * v;
            count += 1;
        }
    }
    (sum / count.max(1) as f64).sqrt()
}

/// Hairer's initial-step heuristic: probe the vector field twice to estimate
/// the curvature of `f` near `(t, x)` and derive a step size that should
/// already land close to the requested tolerance.
pub fn init_step(
    field: &mut dyn VectorField,
    k1: &State,
    x: &State,
    t: f64,
    order: usize,
    control: &AdaptiveStepControl,
) -> OdeResult<f64> {
    let scale = control.scale(x, x);
    let d0 = error_norm(x, &scale, control.seminorm);
    let d1 = error_norm(k1, &scale, control.seminorm);

    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let x1 = x + &(k1 * h0);
    let f1 = field.eval(t + h0, &x1)?;
    let diff = &f1 - k1;
    let d2 = error_norm(&diff, &scale, control.seminorm) / h0;

    let dt1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (order as f64 + 1.0))
    };

    Ok((100.0 * h0).min(dt1))
}
