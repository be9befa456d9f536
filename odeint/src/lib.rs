//! Initial-value problem integration: fixed-step and adaptive explicit
//! Runge-Kutta methods, symplectic leapfrog integration, event-driven hybrid
//! systems, and Parareal multiple shooting over batched array state.

pub mod driver;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod mshooting;
pub mod solver;
pub mod state;
pub mod stepping;
pub mod tableau;

use std::str::FromStr;

use log::warn;

pub use error::{OdeError, OdeResult};
pub use events::EventCallback;
pub use mshooting::MsSolver;
pub use solver::{Solver, SteppingClass};
pub use state::{Order, State, VectorField};
pub use stepping::{AdaptiveStepControl, FixedStepControl};

use state::Reversed;

/// Tunable knobs shared by the `odeint*` entry points, built with the
/// workspace's usual `with_*` builder style.
#[derive(Clone, Debug)]
pub struct OdeOptions {
    pub atol: f64,
    pub rtol: f64,
    pub interpolator: bool,
    pub return_all_eval: bool,
    pub seminorm: Option<usize>,
    pub min_dt: Option<f64>,
    pub max_dt: Option<f64>,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            atol: 1e-3,
            rtol: 1e-3,
            interpolator: false,
            return_all_eval: false,
            seminorm: None,
            min_dt: None,
            max_dt: None,
        }
    }
}

impl OdeOptions {
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_interpolator(mut self, enabled: bool) -> Self {
        self.interpolator = enabled;
        self
    }

    pub fn with_return_all_eval(mut self, enabled: bool) -> Self {
        self.return_all_eval = enabled;
        self
    }

    pub fn with_seminorm(mut self, dim: usize) -> Self {
        self.seminorm = Some(dim);
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

    fn adaptive_control(&self) -> AdaptiveStepControl {
        let mut control = AdaptiveStepControl::new(self.rtol, self.atol);
        if let Some(d) = self.seminorm {
            control = control.with_seminorm(d);
        }
        if let Some(min_dt) = self.min_dt {
            control = control.with_min_dt(min_dt);
        }
        if let Some(max_dt) = self.max_dt {
            control = control.with_max_dt(max_dt);
        }
        control
    }
}

/// Returns `(t_span negated and reversed to ascending order, was_reversed)`.
fn normalize_time_domain(t_span: &[f64]) -> OdeResult<(Vec<f64>, bool)> {
    if t_span.len() < 2 {
        return Err(OdeError::EmptyTimeSpan);
    }
    if t_span[1] < t_span[0] {
        warn!("integrating on a reversed time domain");
        Ok((t_span.iter().map(|&t| -t).collect(), true))
    } else {
        Ok((t_span.to_vec(), false))
    }
}

/// Solve an initial-value problem over `t_span` with the named solver.
///
/// `t_span` may be descending, in which case integration runs on `-f(-t, x)`
/// over the negated, ascending grid and the reported times are negated back.
pub fn odeint(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver_name: &str,
    options: &OdeOptions,
) -> OdeResult<(Vec<f64>, State)> {
    let solver = Solver::from_str(solver_name)?;
    let (t_span, reversed) = normalize_time_domain(t_span)?;

    let (mut times, states) = if reversed {
        let mut rev = Reversed { inner: field };
        run_odeint(&mut rev, x0, &t_span, solver, options)?
    } else {
        run_odeint(field, x0, &t_span, solver, options)?
    };

    if reversed {
        for t in times.iter_mut() {
            *t = -*t;
        }
    }
    Ok((times, states))
}

fn run_odeint(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver: Solver,
    options: &OdeOptions,
) -> OdeResult<(Vec<f64>, State)> {
    match solver.stepping_class() {
        SteppingClass::Fixed => {
            if options.atol != OdeOptions::default().atol || options.rtol != OdeOptions::default().rtol {
                warn!("tolerances have no effect on a fixed-step solver");
            }
            driver::fixed_odeint(field, x0, t_span, solver)
        }
        SteppingClass::Adaptive => {
            let control = options.adaptive_control();
            driver::adaptive_odeint(field, x0, t_span, solver, &control, options.interpolator, options.return_all_eval)
        }
    }
}

/// Solve a symplectic initial-value problem. `field` must declare its
/// [`Order`]; `alf` additionally requires a first-order field, whose `eval`
/// is defined over position space only — the driver slices the leapfrog
/// state's position half before every probe evaluation it performs outside
/// the solver's own step function.
pub fn odeint_symplectic(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver_name: &str,
    options: &OdeOptions,
) -> OdeResult<(Vec<f64>, State)> {
    let order = state::require_order(field)?;
    if matches!(solver_name, "alf" | "AsynchronousLeapfrog") && order == Order::Second {
        return Err(OdeError::IncompatibleOrder(order));
    }
    odeint(field, x0, t_span, solver_name, options)
}

/// Solve a hybrid (event-driven) initial-value problem. Integration stops at
/// `t_span`'s end or once `j_span` jumps have fired, whichever comes first.
#[allow(clippy::too_many_arguments)]
pub fn odeint_hybrid(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    j_span: usize,
    solver_name: &str,
    callbacks: Vec<Box<dyn EventCallback>>,
    options: &OdeOptions,
    event_tol: f64,
) -> OdeResult<(Vec<f64>, State)> {
    let solver = Solver::from_str(solver_name)?;
    let control = options.adaptive_control();
    driver::hybrid_odeint(field, x0, t_span, j_span, solver, &callbacks, &control, event_tol)
}

/// Solve a boundary-value problem by Parareal multiple shooting.
///
/// `t_span` lists the subinterval boundary times. When `b0` is `None`, an
/// initial boundary-state guess is obtained by a single coarse pass over the
/// whole span.
pub fn odeint_mshooting(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver_name: &str,
    b0: Option<Vec<State>>,
    fine_steps: usize,
    maxiter: usize,
) -> OdeResult<(Vec<f64>, State)> {
    let ms_solver = MsSolver::from_str(solver_name)?;
    let MsSolver::MsZero = ms_solver;

    let b0 = match b0 {
        Some(b) => b,
        None => mshooting::initial_guess(field, t_span, x0, Solver::Euler)?,
    };

    let boundaries = mshooting::ms_zero_root_solve(field, t_span, &b0, Solver::Euler, Solver::Rk4, fine_steps, maxiter)?;
    let times = t_span.to_vec();
    let views: Vec<_> = boundaries.iter().map(|s| s.view()).collect();
    let states = ndarray::stack(ndarray::Axis(0), &views).expect("boundary states share the initial state's shape");
    Ok((times, states))
}
