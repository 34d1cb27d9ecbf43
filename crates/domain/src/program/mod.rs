//! Program: an ordered list of steps toggling relays with waits and loops.
//!
//! Programs are authored by an external tool and imported as JSON
//! documents (see [`document`]). The execution engine treats them as
//! read-only input.

pub mod document;
mod step;

pub use document::{ProgramDocument, StepDocument};
pub use step::{Step, StepKind, WaitDuration};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MalformedProgram;
use crate::id::{ProgramId, StepId};

/// A named sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgramDocument", into = "ProgramDocument")]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub enabled: bool,
    pub steps: Vec<Step>,
}

impl Program {
    /// Create a builder for constructing a [`Program`].
    #[must_use]
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Parse and validate a program document.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedProgram::Syntax`] when `json` is not a program
    /// document, or the validation failure naming the offending field.
    pub fn from_json(json: &str) -> Result<Self, MalformedProgram> {
        let doc: ProgramDocument =
            serde_json::from_str(json).map_err(|err| MalformedProgram::Syntax(err.to_string()))?;
        Self::try_from(doc)
    }

    /// Render the program as a pretty-printed document.
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        let doc = ProgramDocument::from(self.clone());
        // A document holds only strings, integers, booleans and arrays.
        serde_json::to_string_pretty(&doc).unwrap_or_default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedProgram`] when:
    /// - `name` is empty ([`MalformedProgram::EmptyName`])
    /// - a random wait has `min > max` ([`MalformedProgram::InvertedRange`])
    /// - a loop has zero iterations ([`MalformedProgram::InvalidIterations`])
    /// - two steps, at any depth, share an id ([`MalformedProgram::DuplicateStepId`])
    pub fn validate(&self) -> Result<(), MalformedProgram> {
        if self.name.trim().is_empty() {
            return Err(MalformedProgram::EmptyName);
        }

        let mut seen: HashSet<&StepId> = HashSet::new();
        let mut failure = None;
        for step in &self.steps {
            step.walk(&mut |s| {
                if failure.is_some() {
                    return;
                }
                if !seen.insert(&s.id) {
                    failure = Some(MalformedProgram::DuplicateStepId(s.id.clone()));
                    return;
                }
                failure = check_step(s).err();
            });
        }
        failure.map_or(Ok(()), Err)
    }

    /// Number of relay/wait dispatches a complete run performs.
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        self.steps.iter().map(Step::dispatch_count).sum()
    }

    /// Shortest and longest total wait time of a complete run, in seconds.
    #[must_use]
    pub fn duration_bounds(&self) -> (u64, u64) {
        step::sum_bounds(&self.steps)
    }
}

fn check_step(step: &Step) -> Result<(), MalformedProgram> {
    match &step.kind {
        StepKind::Wait {
            duration: WaitDuration::Random { min, max },
        } if min > max => Err(MalformedProgram::InvertedRange {
            step_id: step.id.clone(),
            min: *min,
            max: *max,
        }),
        StepKind::Loop { iterations: 0, .. } => Err(MalformedProgram::InvalidIterations {
            step_id: step.id.clone(),
            value: 0,
        }),
        _ => Ok(()),
    }
}

/// Step-by-step builder for [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    id: Option<ProgramId>,
    name: Option<String>,
    enabled: Option<bool>,
    steps: Vec<Step>,
}

impl ProgramBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<ProgramId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Consume the builder, validate, and return a [`Program`].
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedProgram`] if invariants fail.
    pub fn build(self) -> Result<Program, MalformedProgram> {
        let program = Program {
            id: self.id.unwrap_or_else(ProgramId::generate),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            steps: self.steps,
        };
        program.validate()?;
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelayIndex, RelayState};

    fn relay(i: u8) -> RelayIndex {
        RelayIndex::new(i).unwrap()
    }

    fn watering() -> Program {
        Program::builder()
            .id("watering")
            .name("Morning watering")
            .step(Step::relay("pump-on", relay(0), RelayState::On))
            .step(Step::wait("soak", 30))
            .step(Step::repeat(
                "pulse",
                3,
                vec![
                    Step::relay("valve-open", relay(1), RelayState::On),
                    Step::wait_random("hold", 5, 10),
                    Step::relay("valve-close", relay(1), RelayState::Off),
                ],
            ))
            .step(Step::relay("pump-off", relay(0), RelayState::Off))
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_program_when_required_fields_provided() {
        let program = watering();
        assert_eq!(program.name, "Morning watering");
        assert!(program.enabled);
        assert_eq!(program.steps.len(), 4);
    }

    #[test]
    fn should_return_error_when_name_is_empty() {
        let result = Program::builder().step(Step::wait("w", 1)).build();
        assert_eq!(result, Err(MalformedProgram::EmptyName));
    }

    #[test]
    fn should_reject_duplicate_step_ids_across_nesting() {
        let result = Program::builder()
            .name("dup")
            .step(Step::wait("w", 1))
            .step(Step::repeat("l", 2, vec![Step::wait("w", 1)]))
            .build();
        assert_eq!(
            result,
            Err(MalformedProgram::DuplicateStepId(StepId::from("w")))
        );
    }

    #[test]
    fn should_reject_inverted_random_range_built_in_code() {
        let result = Program::builder()
            .name("bad")
            .step(Step::wait_random("w", 9, 3))
            .build();
        assert!(matches!(result, Err(MalformedProgram::InvertedRange { .. })));
    }

    #[test]
    fn should_reject_zero_iteration_loop_built_in_code() {
        let result = Program::builder()
            .name("bad")
            .step(Step::repeat("l", 0, vec![Step::wait("w", 1)]))
            .build();
        assert!(matches!(
            result,
            Err(MalformedProgram::InvalidIterations { value: 0, .. })
        ));
    }

    #[test]
    fn should_allow_empty_step_list() {
        let program = Program::builder().name("empty").build().unwrap();
        assert!(program.steps.is_empty());
        assert_eq!(program.dispatch_count(), 0);
    }

    #[test]
    fn should_summarise_dispatches_and_duration() {
        let program = watering();
        assert_eq!(program.dispatch_count(), 1 + 1 + 9 + 1);
        assert_eq!(program.duration_bounds(), (30 + 15, 30 + 30));
    }

    #[test]
    fn should_roundtrip_through_document_json() {
        let program = watering();
        let json = program.to_json_pretty();
        let parsed = Program::from_json(&json).unwrap();
        assert_eq!(parsed, program);
    }

    #[test]
    fn should_import_authoring_tool_document() {
        let json = r#"{
            "id": "p1",
            "name": "Drip cycle",
            "enabled": false,
            "steps": [
                {"id": "1", "type": "relay", "relay": 3, "action": "ON"},
                {"id": "2", "type": "wait", "durationType": "random", "durationMin": 5, "durationMax": 5},
                {"id": "3", "type": "relay", "relay": 3, "action": "OFF"}
            ]
        }"#;
        let program = Program::from_json(json).unwrap();
        assert_eq!(program.id, ProgramId::from("p1"));
        assert!(!program.enabled);
        assert_eq!(program.steps.len(), 3);
    }

    #[test]
    fn should_default_missing_metadata_on_import() {
        let program = Program::from_json(r#"{"steps": []}"#).unwrap();
        assert_eq!(program.name, document::DEFAULT_PROGRAM_NAME);
        assert!(program.enabled);
        assert!(!program.id.as_str().is_empty());
    }

    #[test]
    fn should_reject_document_without_steps() {
        let result = Program::from_json(r#"{"name": "nothing"}"#);
        assert_eq!(result, Err(MalformedProgram::MissingSteps));
    }

    #[test]
    fn should_report_syntax_error_for_invalid_json() {
        let result = Program::from_json("{ not json");
        assert!(matches!(result, Err(MalformedProgram::Syntax(_))));
    }

    #[test]
    fn should_validate_when_deserializing_program_directly() {
        let json = r#"{"name": "x", "steps": [{"id": "a", "type": "relay", "relay": 5, "action": "ON"}]}"#;
        let result: Result<Program, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
