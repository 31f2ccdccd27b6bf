//! Crate-wide error type.
//!
//! Every fallible public operation returns [`Result<T>`], a thin alias over
//! [`PyFlowError`]. Failure modes that the component design says should
//! degrade gracefully (a malformed metadata block, a function that no longer
//! parses) are handled at the point of occurrence and never reach this type;
//! only the ones that abort the calling operation do.

/// Result type used throughout pyflowgraph.
pub type Result<T> = std::result::Result<T, PyFlowError>;

/// Errors that can escape a core operation.
#[derive(Debug, thiserror::Error)]
pub enum PyFlowError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("pin not found: {node}.{pin}")]
    PinNotFound { node: String, pin: String },

    #[error("incompatible pins: {reason}")]
    IncompatiblePins { reason: String },

    #[error("cyclic dependency detected after {iterations} iterations")]
    CyclicDependency { iterations: usize },

    #[error("node '{node}' raised during execution: {message}")]
    Execution { node: String, message: String },

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("python interpreter error: {0}")]
    Python(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("markdown document malformed: {0}")]
    Markdown(String),

    #[error("{0}")]
    Custom(String),
}

impl From<pyo3::PyErr> for PyFlowError {
    fn from(err: pyo3::PyErr) -> Self {
        PyFlowError::Python(err.to_string())
    }
}
