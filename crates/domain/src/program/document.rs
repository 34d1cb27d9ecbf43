//! Program document: the JSON exchange format written by the authoring tool.
//!
//! Documents are deliberately loose (every field optional, integers signed)
//! so that a bad import can be reported precisely as a [`MalformedProgram`]
//! naming the step and field, instead of an opaque parse failure.

use serde::{Deserialize, Serialize};

use crate::error::MalformedProgram;
use crate::id::{ProgramId, StepId};
use crate::relay::{RelayIndex, RelayState};

use super::step::{Step, StepKind, WaitDuration};
use super::Program;

/// Name given to imported programs that carry none.
pub const DEFAULT_PROGRAM_NAME: &str = "Imported program";

/// Wire form of a [`Program`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDocument>>,
}

/// Wire form of a [`Step`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_steps: Option<Vec<StepDocument>>,
}

impl TryFrom<ProgramDocument> for Program {
    type Error = MalformedProgram;

    fn try_from(doc: ProgramDocument) -> Result<Self, Self::Error> {
        let steps = doc.steps.ok_or(MalformedProgram::MissingSteps)?;
        let program = Program {
            id: doc.id.map_or_else(ProgramId::generate, ProgramId::from),
            name: doc.name.unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string()),
            enabled: doc.enabled.unwrap_or(true),
            steps: steps
                .into_iter()
                .map(Step::try_from)
                .collect::<Result<_, _>>()?,
        };
        program.validate()?;
        Ok(program)
    }
}

impl From<Program> for ProgramDocument {
    fn from(program: Program) -> Self {
        Self {
            id: Some(program.id.to_string()),
            name: Some(program.name),
            enabled: Some(program.enabled),
            steps: Some(program.steps.into_iter().map(StepDocument::from).collect()),
        }
    }
}

impl TryFrom<StepDocument> for Step {
    type Error = MalformedProgram;

    fn try_from(doc: StepDocument) -> Result<Self, Self::Error> {
        let step_id = doc.id.clone().map_or_else(StepId::generate, StepId::from);
        let step_type = doc
            .step_type
            .as_deref()
            .ok_or_else(|| missing(&step_id, "type"))?;

        let kind = match step_type {
            "relay" => relay_kind(&step_id, &doc)?,
            "wait" => wait_kind(&step_id, &doc)?,
            "loop" => {
                let iterations = doc.iterations.ok_or_else(|| missing(&step_id, "iterations"))?;
                let iterations = u32::try_from(iterations)
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| MalformedProgram::InvalidIterations {
                        step_id: step_id.clone(),
                        value: iterations,
                    })?;
                let body = doc
                    .loop_steps
                    .ok_or_else(|| missing(&step_id, "loopSteps"))?
                    .into_iter()
                    .map(Step::try_from)
                    .collect::<Result<_, _>>()?;
                StepKind::Loop { iterations, body }
            }
            other => {
                return Err(MalformedProgram::UnknownStepType {
                    step_id,
                    value: other.to_string(),
                });
            }
        };

        Ok(Step { id: step_id, kind })
    }
}

fn missing(step_id: &StepId, field: &'static str) -> MalformedProgram {
    MalformedProgram::MissingField {
        step_id: step_id.clone(),
        field,
    }
}

fn relay_kind(step_id: &StepId, doc: &StepDocument) -> Result<StepKind, MalformedProgram> {
    let raw = doc.relay.ok_or_else(|| missing(step_id, "relay"))?;
    let relay = u8::try_from(raw)
        .ok()
        .and_then(RelayIndex::new)
        .ok_or_else(|| MalformedProgram::RelayOutOfRange {
            step_id: step_id.clone(),
            value: raw,
        })?;
    let action = match doc.action.as_deref() {
        Some("ON") => RelayState::On,
        Some("OFF") => RelayState::Off,
        Some(other) => {
            return Err(MalformedProgram::InvalidAction {
                step_id: step_id.clone(),
                value: other.to_string(),
            });
        }
        None => return Err(missing(step_id, "action")),
    };
    Ok(StepKind::Relay { relay, action })
}

fn wait_kind(step_id: &StepId, doc: &StepDocument) -> Result<StepKind, MalformedProgram> {
    let seconds = |field: &'static str, value: Option<i64>| -> Result<u64, MalformedProgram> {
        let value = value.ok_or_else(|| missing(step_id, field))?;
        u64::try_from(value).map_err(|_| MalformedProgram::NegativeDuration {
            step_id: step_id.clone(),
            field,
            value,
        })
    };

    let duration = match doc.duration_type.as_deref().unwrap_or("fixed") {
        "fixed" => WaitDuration::Fixed {
            seconds: seconds("duration", doc.duration)?,
        },
        "random" => {
            let min = seconds("durationMin", doc.duration_min)?;
            let max = seconds("durationMax", doc.duration_max)?;
            if min > max {
                return Err(MalformedProgram::InvertedRange {
                    step_id: step_id.clone(),
                    min,
                    max,
                });
            }
            WaitDuration::Random { min, max }
        }
        other => {
            return Err(MalformedProgram::InvalidDurationType {
                step_id: step_id.clone(),
                value: other.to_string(),
            });
        }
    };
    Ok(StepKind::Wait { duration })
}

impl From<Step> for StepDocument {
    fn from(step: Step) -> Self {
        let mut doc = StepDocument {
            id: Some(step.id.to_string()),
            ..Self::default()
        };
        match step.kind {
            StepKind::Relay { relay, action } => {
                doc.step_type = Some("relay".to_string());
                doc.relay = Some(i64::from(relay.get()));
                doc.action = Some(action.to_string());
            }
            StepKind::Wait { duration } => {
                doc.step_type = Some("wait".to_string());
                match duration {
                    WaitDuration::Fixed { seconds } => {
                        doc.duration_type = Some("fixed".to_string());
                        doc.duration = Some(saturating_i64(seconds));
                    }
                    WaitDuration::Random { min, max } => {
                        doc.duration_type = Some("random".to_string());
                        doc.duration_min = Some(saturating_i64(min));
                        doc.duration_max = Some(saturating_i64(max));
                    }
                }
            }
            StepKind::Loop { iterations, body } => {
                doc.step_type = Some("loop".to_string());
                doc.iterations = Some(i64::from(iterations));
                doc.loop_steps = Some(body.into_iter().map(StepDocument::from).collect());
            }
        }
        doc
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
