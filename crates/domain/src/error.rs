//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RelayHubError`] via `#[from]` (or a `From` impl in the adapter crate).

use crate::id::{ProgramId, StepId};
use crate::relay::RelayIndex;

/// Root error type shared by the application layer and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum RelayHubError {
    /// A program failed validation when it entered the system.
    #[error("malformed program: {0}")]
    MalformedProgram(#[from] MalformedProgram),

    /// A looked-up record does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The relay controller failed to carry out a command.
    #[error("actuator failure: {0}")]
    Actuator(#[from] ActuatorError),

    /// The program exists but is disabled and may not be run.
    #[error("program {0} is disabled")]
    Disabled(ProgramId),

    /// The execution engine task is gone.
    #[error("execution engine is not running")]
    EngineUnavailable,

    /// A persistence backend failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A program (or program document) that violates the program model's rules.
///
/// Each variant names the step and the field at fault so an import tool can
/// point the author at the problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedProgram {
    #[error("program name must not be empty")]
    EmptyName,

    #[error("program document has no `steps` array")]
    MissingSteps,

    #[error("step `{step_id}`: unknown step type `{value}`")]
    UnknownStepType { step_id: StepId, value: String },

    #[error("step `{step_id}`: field `{field}` is required")]
    MissingField {
        step_id: StepId,
        field: &'static str,
    },

    #[error("step `{step_id}`: field `relay` must be between 0 and 3, got {value}")]
    RelayOutOfRange { step_id: StepId, value: i64 },

    #[error("step `{step_id}`: field `action` must be \"ON\" or \"OFF\", got `{value}`")]
    InvalidAction { step_id: StepId, value: String },

    #[error("step `{step_id}`: field `durationType` must be \"fixed\" or \"random\", got `{value}`")]
    InvalidDurationType { step_id: StepId, value: String },

    #[error("step `{step_id}`: field `{field}` must be non-negative, got {value}")]
    NegativeDuration {
        step_id: StepId,
        field: &'static str,
        value: i64,
    },

    #[error("step `{step_id}`: `durationMin` ({min}) must not exceed `durationMax` ({max})")]
    InvertedRange { step_id: StepId, min: u64, max: u64 },

    #[error("step `{step_id}`: field `iterations` must be at least 1, got {value}")]
    InvalidIterations { step_id: StepId, value: i64 },

    #[error("step id `{0}` is used more than once")]
    DuplicateStepId(StepId),

    #[error("program document is not valid JSON: {0}")]
    Syntax(String),
}

impl MalformedProgram {
    /// Name of the offending document field, when the failure concerns one.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::EmptyName => Some("name"),
            Self::MissingSteps => Some("steps"),
            Self::UnknownStepType { .. } => Some("type"),
            Self::MissingField { field, .. } | Self::NegativeDuration { field, .. } => Some(*field),
            Self::RelayOutOfRange { .. } => Some("relay"),
            Self::InvalidAction { .. } => Some("action"),
            Self::InvalidDurationType { .. } => Some("durationType"),
            Self::InvertedRange { .. } => Some("durationMin"),
            Self::InvalidIterations { .. } => Some("iterations"),
            Self::DuplicateStepId(_) => Some("id"),
            Self::Syntax(_) => None,
        }
    }
}

/// A record could not be found.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by an actuator (relay controller) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuatorError {
    /// The controller answered but refused the command.
    #[error("relay {relay} rejected the command")]
    Rejected { relay: RelayIndex },

    /// The controller could not be reached (timeout, connection refused, …).
    #[error("relay controller unreachable: {reason}")]
    Unreachable { reason: String },

    /// The controller answered with something that could not be understood.
    #[error("unexpected relay controller response: {reason}")]
    Protocol { reason: String },
}
