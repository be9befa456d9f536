use crate::state::State;

/// Maximum bisection iterations while bracketing an event crossing, matching
/// the bound used by [`crate::driver::hybrid_odeint`].
pub const MAX_BISECTION_ITERS: usize = 100;

/// A single hybrid-system event: an indicator that becomes `true` at or
/// after the event, and a jump map applied to the state at the moment it
/// fires.
pub trait EventCallback {
    /// `true` once the event condition holds at `(t, x)`.
    fn check_event(&self, t: f64, x: &State) -> bool;

    /// Instantaneous state transform applied when the event fires.
    fn jump_map(&self, t: f64, x: &State) -> State;
}

/// Indicator vector, one entry per registered callback, sampled at the last
/// accepted `(t, x)`.
pub type EventState = Vec<bool>;

pub fn check_all(callbacks: &[Box<dyn EventCallback>], t: f64, x: &State) -> EventState {
    callbacks.iter().map(|cb| cb.check_event(t, x)).collect()
}

/// Indices whose indicator transitioned `false -> true` between `old` and
/// `new`, in callback order.
pub fn rising_edges(old: &EventState, new: &EventState) -> Vec<usize> {
    old.iter()
        .zip(new.iter())
        .enumerate()
        .filter_map(|(i, (&was, &is))| (!was && is).then_some(i))
        .collect()
}

/// Lowest-indexed callback with a rising edge, per the `priority = 'jump'`
/// convention: ties are broken in registration order.
pub fn first_rising(old: &EventState, new: &EventState) -> Option<usize> {
    rising_edges(old, new).into_iter().next()
}
