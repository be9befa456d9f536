use ndarray::ArrayD;

use crate::error::{OdeError, OdeResult};

/// Batched integration state: an arbitrary-rank dense array whose trailing
/// axis is the state dimension and whose leading axes are batch dimensions.
pub type State = ArrayD<f64>;

/// Declares whether a vector field is first- or second-order, needed to
/// dispatch symplectic integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    First,
    Second,
}

/// A right-hand side `dx/dt = f(t, x)`.
///
/// Modeled as a trait rather than a class hierarchy so that closures, plain
/// structs, and anything else callable can act as a vector field without
/// implementing a fixed base type.
pub trait VectorField {
    /// Evaluate the derivative at `(t, x)`.
    fn eval(&mut self, t: f64, x: &State) -> OdeResult<State>;

    /// Declared order, used only by [`crate::odeint_symplectic`]. Fields that
    /// never take the symplectic path may leave this as `None`.
    fn order(&self) -> Option<Order> {
        None
    }
}

impl<F> VectorField for F
where
    F: FnMut(f64, &State) -> State,
{
    fn eval(&mut self, t: f64, x: &State) -> OdeResult<State> {
        Ok(self(t, x))
    }
}

/// Wraps a vector field to integrate backwards in time: `g(t, x) = -f(-t, x)`.
pub(crate) struct Reversed<'a, F: VectorField + ?Sized> {
    pub inner: &'a mut F,
}

impl<'a, F: VectorField + ?Sized> VectorField for Reversed<'a, F> {
    fn eval(&mut self, t: f64, x: &State) -> OdeResult<State> {
        let dx = self.inner.eval(-t, x)?;
        Ok(dx.mapv(|v| -v))
    }

    fn order(&self) -> Option<Order> {
        self.inner.order()
    }
}

pub(crate) fn require_order(field: &dyn VectorField) -> OdeResult<Order> {
    field.order().ok_or(OdeError::MissingOrder)
}
