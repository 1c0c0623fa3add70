//! Error types for tempo operations.

use thiserror::Error;

/// Result type alias using tempo Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while checking, stepping or solving a model.
#[derive(Error, Debug)]
pub enum Error {
    /// A required nodal variable has no key in the model schema.
    #[error("{0} has key zero (check that the variable is registered in the schema)")]
    UnregisteredVariable(&'static str),

    /// A node lacks historical storage for a required variable.
    #[error("{variable} variable is not allocated for node {node}")]
    VariableNotAllocated {
        variable: &'static str,
        node: usize,
    },

    /// A node lacks a degree of freedom the scheme requires.
    #[error("missing {dof} dof on node {node}")]
    MissingDof { dof: String, node: usize },

    /// The historical buffer is too short for the scheme.
    #[error("insufficient buffer size: at least {required} steps required, got {actual}")]
    InsufficientBufferSize { required: usize, actual: usize },

    /// Bossak alpha outside its stability band.
    #[error("value not admissible for alpha_m: admissible values lie in [-0.3, 0.0], got {0}")]
    AlphaOutOfRange(f64),

    /// The time step is zero or negative.
    #[error("detected delta_time = {0:e}: check that the time step is created correctly for the model part")]
    InvalidTimeStep(f64),

    /// Malformed settings document.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// Settings that parse but are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model part construction or lookup errors.
    #[error("model error: {0}")]
    Model(String),

    /// Entity (element or condition) errors.
    #[error("entity {id}: {message}")]
    Entity { id: usize, message: String },

    /// Assembly errors.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Vector or matrix sizes that do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Solver errors.
    #[error("solver error: {0}")]
    Solver(String),

    /// Matrix singularity or conditioning issues.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// The linear solve produced NaN or infinite values.
    #[error("non-finite value in solution at equation {index}")]
    NonFiniteSolution { index: usize },
}

impl Error {
    /// True for errors that describe a bad model setup rather than a failed step.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnregisteredVariable(_)
                | Error::VariableNotAllocated { .. }
                | Error::MissingDof { .. }
                | Error::InsufficientBufferSize { .. }
                | Error::AlphaOutOfRange(_)
                | Error::Settings(_)
                | Error::InvalidConfig(_)
        )
    }

    /// True for failures reported by the linear solve.
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            Error::Solver(_) | Error::SingularMatrix(_) | Error::NonFiniteSolution { .. }
        )
    }

    pub(crate) fn entity(id: usize, message: impl Into<String>) -> Self {
        Error::Entity {
            id,
            message: message.into(),
        }
    }
}
