use thiserror::Error;

/// Errors surfaced by the integration entry points in [`crate`].
///
/// Configuration errors are raised before any step is taken. Runtime faults
/// are raised mid-integration and leave the accumulated solution in `self`'s
/// caller's hands only if it chose to catch and inspect the returned error.
#[derive(Debug, Error)]
pub enum OdeError {
    #[error("unknown solver name: {0}")]
    UnknownSolver(String),

    #[error("unknown multiple-shooting solver name: {0}")]
    UnknownMsSolver(String),

    #[error("vector field has no declared order, required for symplectic integration")]
    MissingOrder,

    #[error("asynchronous leapfrog requires a first-order vector field, got order {0:?}")]
    IncompatibleOrder(crate::state::Order),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("symplectic state must have an even trailing dimension, got {0}")]
    OddSymplecticState(usize),

    #[error("t_span must contain at least two points")]
    EmptyTimeSpan,

    #[error("vector field evaluation failed at t = {t}: {source}")]
    Field {
        t: f64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("adaptive step size collapsed below the emergency minimum at t = {t} (error ratio {error_ratio})")]
    StepSizeCollapsed { t: f64, error_ratio: f64 },
}

pub type OdeResult<T> = Result<T, OdeError>;
