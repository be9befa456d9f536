use std::str::FromStr;

use ndarray::{Axis, Slice};

use crate::error::{OdeError, OdeResult};
use crate::state::{State, VectorField};
use crate::tableau::ButcherTableau;

/// Whether a solver advances with a caller-chosen fixed step, or is driven
/// by the adaptive controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteppingClass {
    Fixed,
    Adaptive,
}

/// The explicit Runge-Kutta family and the symplectic leapfrog, selected by
/// name through the registry in [`Solver::from_str`].
#[derive(Debug, Clone, Copy)]
pub enum Solver {
    Euler,
    Rk4,
    DoPri5,
    Tsit5,
    Alf,
}

impl Solver {
    pub fn order(&self) -> usize {
        match self {
            Solver::Euler => 1,
            Solver::Rk4 => 4,
            Solver::DoPri5 | Solver::Tsit5 => 5,
            Solver::Alf => 2,
        }
    }

    pub fn stepping_class(&self) -> SteppingClass {
        match self {
            Solver::Euler | Solver::Rk4 => SteppingClass::Fixed,
            Solver::DoPri5 | Solver::Tsit5 | Solver::Alf => SteppingClass::Adaptive,
        }
    }

    /// Advance one step. Returns `(k_last, x_sol, x_err)`: `k_last` is the
    /// reusable final-stage slope for FSAL methods, and `x_err` is the
    /// embedded local-error estimate, both `None` where the method has no
    /// such concept (fixed-step methods, and leapfrog in fixed mode).
    pub fn step(
        &self,
        field: &mut dyn VectorField,
        x: &State,
        t: f64,
        dt: f64,
        k1: Option<State>,
    ) -> OdeResult<(Option<State>, State, Option<State>)> {
        match self {
            Solver::Euler => {
                let k1 = match k1 {
                    Some(k) => k,
                    None => field.eval(t, x)?,
                };
                let mut x_sol = x.clone();
                x_sol.scaled_add(dt, &k1);
                Ok((None, x_sol, None))
            }
            Solver::Rk4 => rk_step(&ButcherTableau::<4>::RK4, field, x, t, dt, k1),
            Solver::DoPri5 => rk_step(&ButcherTableau::<7>::DORMAND_PRINCE_45, field, x, t, dt, k1),
            Solver::Tsit5 => rk_step(&ButcherTableau::<7>::TSITOURAS_45, field, x, t, dt, k1),
            Solver::Alf => {
                let adaptive = self.stepping_class() == SteppingClass::Adaptive;
                alf_step(field, x, t, dt, adaptive)
            }
        }
    }
}

impl FromStr for Solver {
    type Err = OdeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "euler" => Ok(Solver::Euler),
            "rk4" | "rk-4" | "RungeKutta4" => Ok(Solver::Rk4),
            "dopri5" | "DormandPrince45" | "DormandPrince5" => Ok(Solver::DoPri5),
            "tsit5" | "Tsitouras45" | "Tsitouras5" => Ok(Solver::Tsit5),
            "alf" | "AsynchronousLeapfrog" => Ok(Solver::Alf),
            other => Err(OdeError::UnknownSolver(other.to_string())),
        }
    }
}

fn rk_step<const STAGES: usize>(
    tableau: &ButcherTableau<STAGES>,
    field: &mut dyn VectorField,
    x: &State,
    t: f64,
    dt: f64,
    k1: Option<State>,
) -> OdeResult<(Option<State>, State, Option<State>)> {
    let mut k: Vec<State> = Vec::with_capacity(STAGES);
    k.push(match k1 {
        Some(k0) => k0,
        None => field.eval(t, x)?,
    });

    for s in 1..STAGES {
        let mut stage_x = x.clone();
        for i in 0..s {
            stage_x.scaled_add(tableau.a[s][i] * dt, &k[i]);
        }
        let k_s = field.eval(t + tableau.c[s] * dt, &stage_x)?;
        k.push(k_s);
    }

    let mut x_sol = x.clone();
    for s in 0..STAGES {
        x_sol.scaled_add(tableau.b[s] * dt, &k[s]);
    }

    let x_err = tableau.err_weights().map(|berr| {
        let mut e = State::zeros(x.raw_dim());
        for s in 0..STAGES {
            e.scaled_add(berr[s] * dt, &k[s]);
        }
        e
    });

    let k_last = tableau.fsal.then(|| k[STAGES - 1].clone());

    Ok((k_last, x_sol, x_err))
}

/// The position half of a leapfrog state `[x; v]`, split along the trailing
/// axis the way [`alf_step`] itself splits it. Used to seed an order-1
/// field's probe evaluations, which are contractually defined over position
/// space only.
pub(crate) fn position_half(xv: &State) -> State {
    let last = Axis(xv.ndim() - 1);
    let half = xv.len_of(last) / 2;
    xv.slice_axis(last, Slice::from(0..half as isize)).to_owned()
}

fn alf_step(
    field: &mut dyn VectorField,
    xv: &State,
    t: f64,
    dt: f64,
    adaptive: bool,
) -> OdeResult<(Option<State>, State, Option<State>)> {
    let last = Axis(xv.ndim() - 1);
    let d = xv.len_of(last);
    if d % 2 != 0 {
        return Err(OdeError::OddSymplecticState(d));
    }
    let half = d / 2;

    let x = xv.slice_axis(last, Slice::from(0..half as isize)).to_owned();
    let v = xv.slice_axis(last, Slice::from(half as isize..d as isize)).to_owned();

    let mut x1 = x.clone();
    x1.scaled_add(0.5 * dt, &v);

    let vt1 = field.eval(t + 0.5 * dt, &x1)?;
    let mut v1 = v.clone();
    v1.scaled_add(-2.0, &v);
    v1.scaled_add(2.0, &vt1);

    let mut x2 = x1;
    x2.scaled_add(0.5 * dt, &v1);

    let x_sol = ndarray::concatenate(last, &[x2.view(), v1.view()])
        .expect("kick-drift-kick halves reassemble to the original state shape");

    let x_err = match adaptive {
        true => {
            let zeros_x = State::zeros(x.raw_dim());
            Some(
                ndarray::concatenate(last, &[zeros_x.view(), v.view()])
                    .expect("kick-drift-kick halves reassemble to the original state shape"),
            )
        }
        false => None,
    };

    Ok((None, x_sol, x_err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    struct Decay(f64);
    impl VectorField for Decay {
        fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
            Ok(x * self.0)
        }
    }

    #[test]
    fn euler_matches_closed_form_for_small_steps() {
        let solver = Solver::Euler;
        let mut field = Decay(-1.0);
        let x0 = arr1(&[1.0]).into_dyn();
        let (_, x1, _) = solver.step(&mut field, &x0, 0.0, 1e-4, None).unwrap();
        assert_relative_eq!(x1[0], 1.0 - 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn rk4_has_no_error_estimate() {
        let solver = Solver::Rk4;
        let mut field = Decay(-1.0);
        let x0 = arr1(&[1.0]).into_dyn();
        let (k_last, _, err) = solver.step(&mut field, &x0, 0.0, 0.1, None).unwrap();
        assert!(k_last.is_none());
        assert!(err.is_none());
    }

    #[test]
    fn dopri5_is_fsal_with_error_estimate() {
        let solver = Solver::DoPri5;
        let mut field = Decay(-1.0);
        let x0 = arr1(&[1.0]).into_dyn();
        let (k_last, _, err) = solver.step(&mut field, &x0, 0.0, 0.1, None).unwrap();
        assert!(k_last.is_some());
        assert!(err.is_some());
    }

    #[test]
    fn registry_resolves_known_aliases() {
        assert!(matches!("dopri5".parse::<Solver>().unwrap(), Solver::DoPri5));
        assert!(matches!("zero".parse::<Solver>(), Err(_)));
    }

    #[test]
    fn alf_advances_harmonic_oscillator() {
        let solver = Solver::Alf;
        // dv/dt = -x, velocity-only vector field evaluated on the position half.
        let mut field = |_t: f64, x: &State| -x;
        let xv0 = arr1(&[1.0, 0.0]).into_dyn();
        let (k_last, xv1, err) = solver.step(&mut field, &xv0, 0.0, 1e-3, None).unwrap();
        assert!(k_last.is_none());
        assert!(err.is_some());
        assert!(xv1[0] < 1.0);
    }

    #[test]
    fn position_half_splits_leapfrog_state() {
        let xv = arr1(&[1.0, 2.0, 3.0, 4.0]).into_dyn();
        assert_eq!(position_half(&xv), arr1(&[1.0, 2.0]).into_dyn());
    }
}
