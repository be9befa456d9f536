use approx::assert_relative_eq;
use ndarray::{array, linspace, Axis};
use odeint::{
    odeint, odeint_hybrid, odeint_mshooting, odeint_symplectic, EventCallback, OdeOptions, OdeResult, Order, State,
    VectorField,
};

struct Decay(f64);
impl VectorField for Decay {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        Ok(x * self.0)
    }
}

struct Harmonic;
impl VectorField for Harmonic {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        Ok(array![x[1], -x[0]].into_dyn())
    }
}

/// `dv/dt = -x`, the acceleration half of a harmonic oscillator; contractually
/// evaluated at the leapfrog state's position half only.
struct HarmonicAccel;
impl VectorField for HarmonicAccel {
    fn eval(&mut self, _t: f64, pos: &State) -> OdeResult<State> {
        Ok(pos.mapv(|p| -p))
    }

    fn order(&self) -> Option<Order> {
        Some(Order::First)
    }
}

struct SecondOrderField;
impl VectorField for SecondOrderField {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        Ok(x.clone())
    }

    fn order(&self) -> Option<Order> {
        Some(Order::Second)
    }
}

// Scenario 1: exponential decay with dopri5.
#[test]
fn dopri5_matches_closed_form_decay() {
    let mut field = Decay(-1.0);
    let x0 = array![1.0].into_dyn();
    let t_span = [0.0, 0.5, 1.0];
    let options = OdeOptions::default().with_tolerances(1e-6, 1e-6);
    let (times, states) = odeint(&mut field, &x0, &t_span, "dopri5", &options).unwrap();

    assert_eq!(times, t_span);
    assert_relative_eq!(states[[0, 0]], 1.0, epsilon = 1e-5);
    assert_relative_eq!(states[[1, 0]], (-0.5_f64).exp(), epsilon = 1e-5);
    assert_relative_eq!(states[[2, 0]], (-1.0_f64).exp(), epsilon = 1e-5);
}

// Scenario 2: harmonic oscillator with tsit5 returns to its starting point
// after one full period.
#[test]
fn tsit5_harmonic_oscillator_returns_to_start() {
    let mut field = Harmonic;
    let x0 = array![1.0, 0.0].into_dyn();
    let t_span: Vec<f64> = linspace(0.0, 2.0 * std::f64::consts::PI, 65).unwrap().to_vec();
    let options = OdeOptions::default().with_tolerances(1e-8, 1e-8);
    let (_, states) = odeint(&mut field, &x0, &t_span, "tsit5", &options).unwrap();

    let last = states.index_axis(Axis(0), states.shape()[0] - 1);
    assert_relative_eq!(last[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(last[1], 0.0, epsilon = 1e-6);
}

// Scenario 4: reversed-time integration of exponential growth lands back on
// the decayed value.
#[test]
fn rk4_reversed_time_matches_forward_decay() {
    let mut field = Decay(1.0);
    let x0 = array![1.0].into_dyn();
    let t_span = [1.0, 0.0];
    let options = OdeOptions::default();
    let (times, states) = odeint(&mut field, &x0, &t_span, "rk4", &options).unwrap();

    assert_eq!(times[0], 1.0);
    assert_eq!(*times.last().unwrap(), 0.0);
    assert_relative_eq!(states[[1, 0]], (-1.0_f64).exp(), epsilon = 1e-6);
}

// Scenario 5: MSZero converges to the single-shot trajectory for a linear
// system.
#[test]
fn mszero_converges_to_single_shot_trajectory() {
    let mut field = Decay(-1.0);
    let x0 = array![1.0].into_dyn();
    let t_span: Vec<f64> = linspace(0.0, 1.0, 5).unwrap().to_vec();
    let (_, states) = odeint_mshooting(&mut field, &x0, &t_span, "mszero", None, 4, 4).unwrap();

    let last = states.index_axis(Axis(0), states.shape()[0] - 1);
    assert_relative_eq!(last[0], (-1.0_f64).exp(), epsilon = 1e-3);
}

struct Constant(f64);
impl VectorField for Constant {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        Ok(State::from_elem(x.raw_dim(), self.0))
    }
}

struct UnitJump;
impl EventCallback for UnitJump {
    fn check_event(&self, _t: f64, x: &State) -> bool {
        x[0] >= 1.0
    }
    fn jump_map(&self, _t: f64, x: &State) -> State {
        x - 1.0
    }
}

// Scenario 3: a constant-rate field with a unit jump fires five evenly
// spaced events, each producing a (pre-jump, post-jump) sample pair.
#[test]
fn hybrid_driver_fires_expected_number_of_jumps() {
    let mut field = Constant(1.0);
    let x0 = array![0.0].into_dyn();
    let t_span = [0.0, 5.0];
    let callbacks: Vec<Box<dyn EventCallback>> = vec![Box::new(UnitJump)];
    let options = OdeOptions::default().with_tolerances(1e-6, 1e-6);

    let (times, states) = odeint_hybrid(&mut field, &x0, &t_span, 5, "dopri5", callbacks, &options, 1e-4).unwrap();

    let event_times: Vec<f64> = times.iter().copied().filter(|&t| t > 0.0 && t < 5.0).collect();
    assert_eq!(event_times.len(), 10); // 5 jumps, pre+post each

    for pair in event_times.chunks(2) {
        assert_relative_eq!(pair[0], pair[1], epsilon = 1e-12);
    }

    for (i, chunk) in event_times.chunks(2).enumerate() {
        let expected = (i + 1) as f64;
        assert_relative_eq!(chunk[0], expected, epsilon = 1e-3);
    }

    assert!(states.shape()[0] >= event_times.len());
}

#[test]
fn times_are_non_decreasing_for_adaptive_integration() {
    let mut field = Decay(-3.0);
    let x0 = array![1.0].into_dyn();
    let t_span = [0.0, 1.0];
    let options = OdeOptions::default().with_return_all_eval(true);
    let (times, _) = odeint(&mut field, &x0, &t_span, "tsit5", &options).unwrap();

    for w in times.windows(2) {
        assert!(w[1] >= w[0]);
    }
}

#[test]
fn first_sample_matches_initial_condition() {
    let mut field = Decay(-1.0);
    let x0 = array![2.5].into_dyn();
    let t_span = [0.0, 1.0];
    let options = OdeOptions::default();
    let (_, states) = odeint(&mut field, &x0, &t_span, "dopri5", &options).unwrap();
    assert_relative_eq!(states[[0, 0]], 2.5, epsilon = 1e-12);
}

#[test]
fn unknown_solver_name_is_a_configuration_error() {
    let mut field = Decay(-1.0);
    let x0 = array![1.0].into_dyn();
    let t_span = [0.0, 1.0];
    let options = OdeOptions::default();
    let err = odeint(&mut field, &x0, &t_span, "not-a-solver", &options).unwrap_err();
    assert!(matches!(err, odeint::OdeError::UnknownSolver(_)));
}

// The symplectic leapfrog's vector field is order-1 and contractually
// evaluated over position space only; `odeint_symplectic` roughly returns a
// harmonic oscillator to its starting point after one period.
#[test]
fn symplectic_leapfrog_returns_near_start_after_one_period() {
    let mut field = HarmonicAccel;
    let xv0 = array![1.0, 0.0].into_dyn();
    let t_span: Vec<f64> = linspace(0.0, 2.0 * std::f64::consts::PI, 33).unwrap().to_vec();
    let options = OdeOptions::default().with_tolerances(1e-6, 1e-6);
    let (times, states) = odeint_symplectic(&mut field, &xv0, &t_span, "alf", &options).unwrap();

    assert_eq!(times.len(), states.shape()[0]);
    let last = states.index_axis(Axis(0), states.shape()[0] - 1);
    assert_relative_eq!(last[0], 1.0, epsilon = 0.2);
    assert_relative_eq!(last[1], 0.0, epsilon = 0.2);
}

#[test]
fn symplectic_leapfrog_rejects_second_order_fields() {
    let mut field = SecondOrderField;
    let xv0 = array![1.0, 0.0].into_dyn();
    let t_span = [0.0, 1.0];
    let options = OdeOptions::default();
    let err = odeint_symplectic(&mut field, &xv0, &t_span, "alf", &options).unwrap_err();
    assert!(matches!(err, odeint::OdeError::IncompatibleOrder(_)));
}

// An interior t_span checkpoint must be hit exactly, not just approximated
// by the nearest accepted step.
#[test]
fn hybrid_driver_hits_interior_checkpoint_exactly() {
    let mut field = Constant(1.0);
    let x0 = array![0.0].into_dyn();
    let t_span = [0.0, 2.5, 5.0];
    let callbacks: Vec<Box<dyn EventCallback>> = vec![Box::new(UnitJump)];
    let options = OdeOptions::default().with_tolerances(1e-6, 1e-6);

    let (times, _) = odeint_hybrid(&mut field, &x0, &t_span, 5, "dopri5", callbacks, &options, 1e-4).unwrap();

    assert!(times.iter().any(|&t| (t - 2.5).abs() < 1e-9));
}
