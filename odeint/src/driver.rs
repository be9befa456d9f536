use log::{debug, trace, warn};
use ndarray::{stack, Axis};

use crate::error::{OdeError, OdeResult};
use crate::events::{check_all, first_rising, EventCallback, EventState, MAX_BISECTION_ITERS};
use crate::interpolate::DenseOutput;
use crate::solver::{position_half, Solver};
use crate::state::{Order, State, VectorField};
use crate::stepping::AdaptiveStepControl;

/// Steps below this size indicate the controller cannot satisfy tolerances;
/// integration aborts rather than spin toward zero forever.
const EMERGENCY_MIN_DT: f64 = 1e-12;

/// An order-1 field's `eval` is contractually defined over position space
/// only (`alf_step` itself calls it with the position half of `[x; v]`), so
/// any probe evaluation a driver performs outside the solver's own step
/// function — seeding `k1`, `init_step`'s curvature probe — must slice down
/// to that same position half first, mirroring the order check the original
/// `odeint_symplectic` makes before seeding.
fn seed_state(solver: Solver, field: &dyn VectorField, x: &State) -> State {
    if matches!(solver, Solver::Alf) && field.order() == Some(Order::First) {
        position_half(x)
    } else {
        x.clone()
    }
}

fn materialize(times: Vec<f64>, states: Vec<State>) -> (Vec<f64>, State) {
    let views: Vec<_> = states.iter().map(|s| s.view()).collect();
    let stacked = stack(Axis(0), &views).expect("accumulated samples share the initial state's shape");
    (times, stacked)
}

/// Walks the prescribed time grid with a fixed-step solver. Tolerances are
/// ignored; the caller is expected to have selected a fixed-step method.
pub fn fixed_odeint(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver: Solver,
) -> OdeResult<(Vec<f64>, State)> {
    if t_span.len() < 2 {
        return Err(OdeError::EmptyTimeSpan);
    }

    let mut x = x0.clone();
    let mut times = vec![t_span[0]];
    let mut states = vec![x.clone()];

    for window in t_span.windows(2) {
        let (t, t_next) = (window[0], window[1]);
        let dt = t_next - t;
        let (_, x_new, _) = solver.step(field, &x, t, dt, None)?;
        x = x_new;
        times.push(t_next);
        states.push(x.clone());
    }

    Ok(materialize(times, states))
}

/// Step/accept/reject/adapt loop for an adaptive solver, with checkpointing
/// to hit every requested time in `t_span` either by interpolation (when
/// `use_interpolation` is set and the solver is FSAL) or by clipping the
/// trial step to land exactly on it.
#[allow(clippy::too_many_arguments)]
pub fn adaptive_odeint(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    solver: Solver,
    control: &AdaptiveStepControl,
    use_interpolation: bool,
    return_all_eval: bool,
) -> OdeResult<(Vec<f64>, State)> {
    if t_span.len() < 2 {
        return Err(OdeError::EmptyTimeSpan);
    }
    let t_eval = &t_span[1..];
    let big_t = *t_span.last().unwrap();

    let mut t = t_span[0];
    let mut x = x0.clone();
    let seed0 = seed_state(solver, field, &x);
    let mut k1 = field.eval(t, &seed0)?;
    let mut dt = crate::stepping::init_step(field, &k1, &seed0, t, solver.order(), control)?;

    let mut times = vec![t];
    let mut states = vec![x.clone()];
    let mut c = 0usize;

    while t < big_t {
        if t + dt > big_t {
            dt = big_t - t;
        }

        let mut ckpt_flag = false;
        let mut dt_old = dt;
        if !use_interpolation && c < t_eval.len() && t + dt > t_eval[c] {
            dt_old = dt;
            ckpt_flag = true;
            dt = t_eval[c] - t;
        }

        let (k_last, x_new, x_err) = solver.step(field, &x, t, dt, Some(k1.clone()))?;

        let ratio = match &x_err {
            Some(err) => control.error_ratio(&x, &x_new, err),
            None => 0.0,
        };
        let accept = ratio <= 1.0;

        if accept {
            let t_next = t + dt;
            trace!("accepted step t={t} dt={dt} error_ratio={ratio}");

            if use_interpolation {
                let (_, x_mid, _) = solver.step(field, &x, t, 0.5 * dt, Some(k1.clone()))?;
                let f1 = match &k_last {
                    Some(k) => k.clone(),
                    None => field.eval(t_next, &seed_state(solver, field, &x_new))?,
                };
                let dense = DenseOutput::fit(t, dt, &x, &k1, &x_new, &f1, &x_mid);
                while c < t_eval.len() && t_eval[c] < t_next {
                    times.push(t_eval[c]);
                    states.push(dense.evaluate(t_eval[c]));
                    c += 1;
                }
                if c < t_eval.len() && (t_eval[c] - t_next).abs() < 1e-9 {
                    times.push(t_eval[c]);
                    states.push(x_new.clone());
                    c += 1;
                }
            } else if ckpt_flag {
                times.push(t_next);
                states.push(x_new.clone());
                c += 1;
            } else if return_all_eval {
                times.push(t_next);
                states.push(x_new.clone());
            }

            k1 = match k_last {
                Some(k) => k,
                None => field.eval(t_next, &seed_state(solver, field, &x_new))?,
            };
            x = x_new;
            t = t_next;

            if ckpt_flag {
                dt = dt_old - dt;
            } else {
                dt = control.adapt(dt, ratio, solver.order());
            }
        } else {
            trace!("rejected step t={t} dt={dt} error_ratio={ratio}");
            dt = control.adapt(dt, ratio, solver.order());
        }

        if dt < EMERGENCY_MIN_DT {
            return Err(OdeError::StepSizeCollapsed { t, error_ratio: ratio });
        }
    }

    Ok(materialize(times, states))
}

/// Adaptive integration interleaved with event detection: on a rising-edge
/// event the trial step is discarded, the crossing time is bisected, and a
/// pre/post-jump sample pair is recorded before stepping resumes. Interior
/// `t_span` entries are hit by clipping the trial step to land exactly on
/// them, the same clip-step checkpointing `adaptive_odeint` uses — there is
/// no dense-output variant here, every sample is either a checkpoint, an
/// event crossing, or a plain accepted step.
#[allow(clippy::too_many_arguments)]
pub fn hybrid_odeint(
    field: &mut dyn VectorField,
    x0: &State,
    t_span: &[f64],
    j_span: usize,
    solver: Solver,
    callbacks: &[Box<dyn EventCallback>],
    control: &AdaptiveStepControl,
    event_tol: f64,
) -> OdeResult<(Vec<f64>, State)> {
    if t_span.len() < 2 {
        return Err(OdeError::EmptyTimeSpan);
    }
    let t_eval = &t_span[1..];
    let big_t = *t_span.last().unwrap();

    let mut t = t_span[0];
    let mut x = x0.clone();
    let mut jnum = 0usize;
    let mut c = 0usize;

    let mut times = vec![];
    let mut states = vec![];

    let mut event_state: EventState = vec![false; callbacks.len()];
    let initial_state = check_all(callbacks, t, &x);
    if let Some(i) = first_rising(&event_state, &initial_state) {
        debug!("initial event {i} active at t0");
        x = callbacks[i].jump_map(t, &x);
        jnum += 1;
    }
    event_state = check_all(callbacks, t, &x);
    times.push(t);
    states.push(x.clone());
    while c < t_eval.len() && t_eval[c] <= t {
        c += 1;
    }

    let seed0 = seed_state(solver, field, &x);
    let mut k1 = field.eval(t, &seed0)?;
    let mut dt = crate::stepping::init_step(field, &k1, &seed0, t, solver.order(), control)?;

    while t < big_t && jnum < j_span {
        if t + dt > big_t {
            dt = big_t - t;
        }

        let mut ckpt_flag = false;
        let mut dt_old = dt;
        if c < t_eval.len() && t + dt > t_eval[c] {
            dt_old = dt;
            ckpt_flag = true;
            dt = t_eval[c] - t;
        }

        let (k_last, x_new, x_err) = solver.step(field, &x, t, dt, Some(k1.clone()))?;
        let new_state = check_all(callbacks, t + dt, &x_new);

        if first_rising(&event_state, &new_state).is_some() {
            let (t_event, x_event) =
                bisect_event(field, &x, t, dt, &k1, solver, callbacks, &event_state, event_tol)?;

            let state_at_event = check_all(callbacks, t_event, &x_event);
            let event_index = first_rising(&event_state, &state_at_event).unwrap_or(0);

            times.push(t_event);
            states.push(x_event.clone());

            let x_post = callbacks[event_index].jump_map(t_event, &x_event);
            times.push(t_event);
            states.push(x_post.clone());

            x = x_post;
            t = t_event;
            while c < t_eval.len() && t_eval[c] <= t {
                c += 1;
            }
            event_state = check_all(callbacks, t, &x);
            k1 = field.eval(t, &seed_state(solver, field, &x))?;
            jnum += 1;
        } else {
            let ratio = match &x_err {
                Some(err) => control.error_ratio(&x, &x_new, err),
                None => 0.0,
            };
            let accept = ratio <= 1.0;
            if accept {
                t += dt;
                x = x_new;
                k1 = match k_last {
                    Some(k) => k,
                    None => field.eval(t, &seed_state(solver, field, &x))?,
                };
                times.push(t);
                states.push(x.clone());
                event_state = new_state;
                if ckpt_flag {
                    c += 1;
                }
            }
            dt = if ckpt_flag && accept {
                dt_old - dt
            } else {
                control.adapt(dt, ratio, solver.order())
            };
            if dt < EMERGENCY_MIN_DT {
                return Err(OdeError::StepSizeCollapsed { t, error_ratio: ratio });
            }
        }
    }

    Ok(materialize(times, states))
}

#[allow(clippy::too_many_arguments)]
fn bisect_event(
    field: &mut dyn VectorField,
    x: &State,
    t: f64,
    dt: f64,
    k1: &State,
    solver: Solver,
    callbacks: &[Box<dyn EventCallback>],
    event_state: &EventState,
    event_tol: f64,
) -> OdeResult<(f64, State)> {
    let mut t_inner = t;
    let mut x_inner = x.clone();
    let mut dt_inner = dt;
    let mut k_inner = k1.clone();
    let mut niters = 0;

    while niters < MAX_BISECTION_ITERS && dt_inner > event_tol {
        dt_inner /= 2.0;
        let (k_last, x_trial, _) = solver.step(field, &x_inner, t_inner, dt_inner, Some(k_inner.clone()))?;
        let trial_state = check_all(callbacks, t_inner + dt_inner, &x_trial);
        let triggered = first_rising(event_state, &trial_state).is_some();
        niters += 1;

        if !triggered {
            x_inner = x_trial;
            t_inner += dt_inner;
            dt_inner = dt;
            k_inner = match k_last {
                Some(k) => k,
                None => field.eval(t_inner, &seed_state(solver, field, &x_inner))?,
            };
        }
    }

    if niters >= MAX_BISECTION_ITERS {
        warn!("event bisection exhausted {MAX_BISECTION_ITERS} iterations near t={t_inner}");
    }

    Ok((t_inner, x_inner))
}
