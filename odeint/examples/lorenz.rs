use ndarray::{array, Axis};
use odeint::{odeint, OdeOptions, OdeResult, State, VectorField};

struct Lorenz {
    sigma: f64,
    rho: f64,
    beta: f64,
}

impl VectorField for Lorenz {
    fn eval(&mut self, _t: f64, x: &State) -> OdeResult<State> {
        let dx0 = self.sigma * (x[1] - x[0]);
        let dx1 = x[0] * (self.rho - x[2]) - x[1];
        let dx2 = x[0] * x[1] - self.beta * x[2];
        Ok(array![dx0, dx1, dx2].into_dyn())
    }
}

fn main() {
    let mut model = Lorenz { sigma: 10., rho: 28., beta: 8. / 3. };
    let x0 = array![1.0, 0.0, 0.0].into_dyn();
    let t_span: Vec<f64> = (0..=30).map(|i| i as f64).collect();

    let options = OdeOptions::default().with_tolerances(1e-6, 1e-6);
    let (times, states) = odeint(&mut model, &x0, &t_span, "tsit5", &options).expect("integration failed");

    for (t, row) in times.iter().zip(states.axis_iter(Axis(0))) {
        println!("{:10.6}     {:10.6}     {:10.6}     {:10.6}", t, row[0], row[1], row[2]);
    }
}
