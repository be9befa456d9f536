use std::str::FromStr;

use ndarray::Axis;

use crate::driver::fixed_odeint;
use crate::error::{OdeError, OdeResult};
use crate::solver::Solver;
use crate::state::{State, VectorField};

/// Multiple-shooting (parallel-in-time) solver selection. Only the
/// zero-order Parareal update is implemented; `MSDirect`/`MSRoot` are
/// reserved registry entries, see the crate's design notes.
#[derive(Debug, Clone, Copy)]
pub enum MsSolver {
    MsZero,
}

impl FromStr for MsSolver {
    type Err = OdeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "mszero" | "zero" | "parareal" => Ok(MsSolver::MsZero),
            "msdirect" | "direct" => Err(OdeError::NotImplemented("MSDirect")),
            "msroot" | "root" => Err(OdeError::NotImplemented("MSRoot")),
            other => Err(OdeError::UnknownMsSolver(other.to_string())),
        }
    }
}

fn propagate(field: &mut dyn VectorField, solver: Solver, x0: &State, sub_t_span: &[f64]) -> OdeResult<State> {
    let (_, states) = fixed_odeint(field, x0, sub_t_span, solver)?;
    Ok(states.index_axis(Axis(0), states.shape()[0] - 1).to_owned())
}

/// Parareal fixed-point iteration over subinterval boundary states.
///
/// `t_span` lists the `N + 1` subinterval boundary times; `b0` is the
/// initial guess for each boundary (obtained from a single coarse pass over
/// the whole span when the caller has none). Returns the refined boundary
/// states, one per entry of `t_span`.
pub fn ms_zero_root_solve(
    field: &mut dyn VectorField,
    t_span: &[f64],
    b0: &[State],
    coarse: Solver,
    fine: Solver,
    fine_steps: usize,
    maxiter: usize,
) -> OdeResult<Vec<State>> {
    if t_span.len() < 2 {
        return Err(OdeError::EmptyTimeSpan);
    }
    let dt = t_span[1] - t_span[0];
    let n_sub = t_span.len() - 1;
    let sub_t_span: Vec<f64> = (0..fine_steps)
        .map(|i| dt * i as f64 / (fine_steps - 1).max(1) as f64)
        .collect();

    let mut b = b0.to_vec();

    let mut i = 0usize;
    while i <= maxiter {
        i += 1;
        let mut b_out = b.clone();
        let mut b_in = b[i - 1].clone();

        for m in i..n_sub {
            let coarse_from_in = propagate(field, coarse, &b_in, &sub_t_span)?;
            let coarse_from_prev = propagate(field, coarse, &b[m - 1], &sub_t_span)?;
            let fine_from_prev = propagate(field, fine, &b[m - 1], &sub_t_span)?;

            let mut next = coarse_from_in;
            next -= &coarse_from_prev;
            next += &fine_from_prev;
            b_in = next;
            b_out[m] = b_in.clone();
        }

        b = b_out;
    }

    Ok(b)
}

/// Runs the coarse solver once over the whole span to produce an initial
/// boundary-state guess when the caller supplies none.
pub fn initial_guess(
    field: &mut dyn VectorField,
    t_span: &[f64],
    x0: &State,
    coarse: Solver,
) -> OdeResult<Vec<State>> {
    let (_, states) = fixed_odeint(field, x0, t_span, coarse)?;
    Ok(states.axis_iter(Axis(0)).map(|v| v.to_owned()).collect())
}
