use crate::evaluator::EvalError;

/// Errors surfaced by the defer engine.
#[derive(Debug)]
pub enum DeferError {
    /// The terminal projection is not the outermost operation of the query
    Structural(String),

    /// Scalar/aggregate execution was attempted directly against a wrapped query
    Unsupported(String),

    /// The reconstruction function failed during per-record post-processing
    PostProcess { message: String, cause: EvalError },

    /// The post-process cursor was read outside a valid state
    InvalidState(String),

    /// The provider failed while evaluating the delegated phase
    Provider(EvalError),
}

impl DeferError {
    /// Wraps a reconstruction failure, keeping the original cause and its
    /// message behind one stable error surface.
    pub fn post_process(cause: EvalError) -> DeferError {
        DeferError::PostProcess {
            message: format!("deferred evaluation of projection failed: {}", cause),
            cause,
        }
    }
}

impl std::fmt::Display for DeferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferError::Structural(msg) => write!(f, "Structural violation: {}", msg),
            DeferError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
            DeferError::PostProcess { message, .. } => write!(f, "{}", message),
            DeferError::InvalidState(msg) => write!(f, "Invalid cursor state: {}", msg),
            DeferError::Provider(e) => write!(f, "Provider evaluation failed: {}", e),
        }
    }
}

impl std::error::Error for DeferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeferError::PostProcess { cause, .. } => Some(cause),
            DeferError::Provider(cause) => Some(cause),
            _ => None,
        }
    }
}
