//! Step: one instruction of a program: a relay toggle, a timed wait, or a loop.

use serde::{Deserialize, Serialize};

use crate::id::StepId;
use crate::relay::{RelayIndex, RelayState};

use super::document::StepDocument;

/// A single instruction inside a [`Program`](super::Program).
///
/// Serializes to (and deserializes from) the authoring tool's document
/// format; deserialization applies the field-level validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepDocument", into = "StepDocument")]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
}

/// The three step variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Set one output immediately.
    Relay { relay: RelayIndex, action: RelayState },
    /// Pause before continuing.
    Wait { duration: WaitDuration },
    /// Repeat an embedded sub-sequence `iterations` times.
    Loop { iterations: u32, body: Vec<Step> },
}

/// How long a wait step lasts, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDuration {
    Fixed { seconds: u64 },
    /// Drawn uniformly from `min..=max` each time the step begins.
    Random { min: u64, max: u64 },
}

impl WaitDuration {
    /// Shortest and longest possible wait.
    #[must_use]
    pub fn bounds(self) -> (u64, u64) {
        match self {
            Self::Fixed { seconds } => (seconds, seconds),
            Self::Random { min, max } => (min, max),
        }
    }
}

impl Step {
    #[must_use]
    pub fn relay(id: impl Into<StepId>, relay: RelayIndex, action: RelayState) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Relay { relay, action },
        }
    }

    #[must_use]
    pub fn wait(id: impl Into<StepId>, seconds: u64) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Wait {
                duration: WaitDuration::Fixed { seconds },
            },
        }
    }

    #[must_use]
    pub fn wait_random(id: impl Into<StepId>, min: u64, max: u64) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Wait {
                duration: WaitDuration::Random { min, max },
            },
        }
    }

    #[must_use]
    pub fn repeat(id: impl Into<StepId>, iterations: u32, body: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Loop { iterations, body },
        }
    }

    /// Number of relay/wait dispatches this step causes when executed,
    /// with loops expanded.
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        match &self.kind {
            StepKind::Relay { .. } | StepKind::Wait { .. } => 1,
            StepKind::Loop { iterations, body } => {
                let per_pass: u64 = body.iter().map(Step::dispatch_count).sum();
                per_pass.saturating_mul(u64::from(*iterations))
            }
        }
    }

    /// Shortest and longest total wait time this step contributes.
    #[must_use]
    pub fn duration_bounds(&self) -> (u64, u64) {
        match &self.kind {
            StepKind::Relay { .. } => (0, 0),
            StepKind::Wait { duration } => duration.bounds(),
            StepKind::Loop { iterations, body } => {
                let (min, max) = sum_bounds(body);
                let n = u64::from(*iterations);
                (min.saturating_mul(n), max.saturating_mul(n))
            }
        }
    }

    /// Visit this step and every step nested inside it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Step)) {
        visit(self);
        if let StepKind::Loop { body, .. } = &self.kind {
            for step in body {
                step.walk(visit);
            }
        }
    }
}

pub(super) fn sum_bounds(steps: &[Step]) -> (u64, u64) {
    steps.iter().map(Step::duration_bounds).fold((0, 0), |acc, b| {
        (acc.0.saturating_add(b.0), acc.1.saturating_add(b.1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(i: u8) -> RelayIndex {
        RelayIndex::new(i).unwrap()
    }

    #[test]
    fn should_count_single_dispatch_for_relay_and_wait() {
        assert_eq!(Step::relay("a", relay(0), RelayState::On).dispatch_count(), 1);
        assert_eq!(Step::wait("b", 5).dispatch_count(), 1);
    }

    #[test]
    fn should_multiply_loop_body_by_iterations() {
        let step = Step::repeat(
            "l",
            3,
            vec![
                Step::relay("a", relay(0), RelayState::On),
                Step::wait("b", 2),
                Step::relay("c", relay(0), RelayState::Off),
            ],
        );
        assert_eq!(step.dispatch_count(), 9);
    }

    #[test]
    fn should_expand_nested_loops() {
        let inner = Step::repeat("inner", 2, vec![Step::wait("w", 1)]);
        let outer = Step::repeat("outer", 3, vec![inner, Step::wait("x", 1)]);
        assert_eq!(outer.dispatch_count(), 9);
        assert_eq!(outer.duration_bounds(), (9, 9));
    }

    #[test]
    fn should_report_random_wait_bounds() {
        assert_eq!(Step::wait_random("w", 5, 15).duration_bounds(), (5, 15));
    }

    #[test]
    fn should_walk_nested_steps_depth_first() {
        let step = Step::repeat(
            "outer",
            1,
            vec![Step::repeat("inner", 1, vec![Step::wait("w", 1)]), Step::wait("x", 1)],
        );
        let mut seen = Vec::new();
        step.walk(&mut |s| seen.push(s.id.to_string()));
        assert_eq!(seen, ["outer", "inner", "w", "x"]);
    }
}
