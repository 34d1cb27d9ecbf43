//! Events and progress snapshots published by the engine.

use std::fmt;

use serde::Serialize;

use relayhub_domain::id::ProgramId;

/// Something observable that happened during a program run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The cursor moved onto a relay or wait step.
    StepAdvanced { description: String },
    /// One second of a wait elapsed.
    Tick { remaining: u64 },
    /// The run reached the end of the program.
    Finished,
    /// An actuator command failed and the run was aborted.
    Error { reason: String },
    /// The run was halted by an emergency stop.
    Cancelled,
}

/// Coarse engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
    Waiting,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Waiting => f.write_str("waiting"),
        }
    }
}

/// Progress snapshot of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    #[default]
    Idle,
    Running {
        program_id: ProgramId,
        current_action: String,
    },
    Waiting {
        program_id: ProgramId,
        current_action: String,
        remaining_secs: u64,
    },
}

impl EngineStatus {
    #[must_use]
    pub fn state(&self) -> EngineState {
        match self {
            Self::Idle => EngineState::Idle,
            Self::Running { .. } => EngineState::Running,
            Self::Waiting { .. } => EngineState::Waiting,
        }
    }

    /// Id of the program being run, if any.
    #[must_use]
    pub fn program_id(&self) -> Option<&ProgramId> {
        match self {
            Self::Idle => None,
            Self::Running { program_id, .. } | Self::Waiting { program_id, .. } => Some(program_id),
        }
    }

    #[must_use]
    pub fn current_action(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Running { current_action, .. } | Self::Waiting { current_action, .. } => {
                Some(current_action)
            }
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Self::Waiting { remaining_secs, .. } => Some(*remaining_secs),
            _ => None,
        }
    }
}
