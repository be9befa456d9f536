use ndarray::{array, Axis};
use odeint::{odeint_hybrid, EventCallback, OdeOptions, OdeResult, State, VectorField};

const G: f64 = 9.81;
const RESTITUTION: f64 = 0.8;

/// `x = [height, velocity]`.
struct FreeFall;

impl VectorField for FreeFall {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        Ok(array![x[1], -G].into_dyn())
    }
}

struct HitsGround;

impl EventCallback for HitsGround {
    fn check_event(&self, _t: f64, x: &State) -> bool {
        x[0] <= 0.0
    }

    fn jump_map(&self, _t: f64, x: &State) -> State {
        array![0.0, -RESTITUTION * x[1]].into_dyn()
    }
}

fn main() {
    let mut model = FreeFall;
    let x0 = array![1.0, 0.0].into_dyn();
    let t_span = [0.0, 10.0];
    let callbacks: Vec<Box<dyn EventCallback>> = vec![Box::new(HitsGround)];

    let options = OdeOptions::default().with_tolerances(1e-8, 1e-8);
    let (times, states) =
        odeint_hybrid(&mut model, &x0, &t_span, 8, "dopri5", callbacks, &options, 1e-6)
            .expect("integration failed");

    for (t, row) in times.iter().zip(states.axis_iter(Axis(0))) {
        println!("{:10.6}     height={:10.6}  v={:10.6}", t, row[0], row[1]);
    }
}
