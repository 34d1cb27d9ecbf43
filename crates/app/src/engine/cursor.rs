//! Execution cursor: the engine's position inside a program.
//!
//! A stack of frames, one per sequence being traversed. The bottom frame is
//! the program's own step list; each loop being executed pushes a frame for
//! its body. The top frame is where interpretation resumes.

use relayhub_domain::program::{Step, StepKind, WaitDuration};
use relayhub_domain::relay::{RelayIndex, RelayState};

/// A step the engine carries out; loops never reach the interpreter.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Dispatch<'p> {
    Relay {
        step: &'p Step,
        relay: RelayIndex,
        action: RelayState,
    },
    Wait {
        step: &'p Step,
        duration: WaitDuration,
    },
}

impl<'p> Dispatch<'p> {
    pub(crate) fn step(&self) -> &'p Step {
        match self {
            Self::Relay { step, .. } | Self::Wait { step, .. } => step,
        }
    }
}

#[derive(Debug)]
struct Frame<'p> {
    steps: &'p [Step],
    index: usize,
    kind: FrameKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Loop { iterations: u32, completed: u32 },
}

/// Position of a run inside a program's (possibly nested) step lists.
#[derive(Debug)]
pub(crate) struct Cursor<'p> {
    frames: Vec<Frame<'p>>,
}

impl<'p> Cursor<'p> {
    /// A cursor at index 0 of `steps`.
    pub(crate) fn new(steps: &'p [Step]) -> Self {
        Self {
            frames: vec![Frame {
                steps,
                index: 0,
                kind: FrameKind::Root,
            }],
        }
    }

    /// Current nesting depth; 1 at the program's top level, 0 once finished.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Settle on the next relay or wait step, entering and leaving loops as
    /// needed. Returns `None` when the program is complete.
    ///
    /// Loops that would dispatch nothing are stepped over without being
    /// entered, so the work done here is bounded by the program's size.
    /// Repeated calls without [`Cursor::advance`] return the same step.
    pub(crate) fn resolve(&mut self) -> Option<Dispatch<'p>> {
        loop {
            let frame = self.frames.last_mut()?;
            let steps = frame.steps;
            match steps.get(frame.index) {
                None => match frame.kind {
                    FrameKind::Root => {
                        self.frames.clear();
                        return None;
                    }
                    FrameKind::Loop {
                        iterations,
                        completed,
                    } => {
                        let completed = completed + 1;
                        if completed >= iterations {
                            self.frames.pop();
                            self.advance();
                        } else {
                            frame.kind = FrameKind::Loop {
                                iterations,
                                completed,
                            };
                            frame.index = 0;
                        }
                    }
                },
                Some(step) => match &step.kind {
                    StepKind::Loop { .. } if step.dispatch_count() == 0 => frame.index += 1,
                    StepKind::Loop { iterations, body } => {
                        self.frames.push(Frame {
                            steps: body,
                            index: 0,
                            kind: FrameKind::Loop {
                                iterations: *iterations,
                                completed: 0,
                            },
                        });
                    }
                    StepKind::Relay { relay, action } => {
                        return Some(Dispatch::Relay {
                            step,
                            relay: *relay,
                            action: *action,
                        });
                    }
                    StepKind::Wait { duration } => {
                        return Some(Dispatch::Wait {
                            step,
                            duration: *duration,
                        });
                    }
                },
            }
        }
    }

    /// Move past the step [`Cursor::resolve`] returned.
    pub(crate) fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.index += 1;
        }
    }
}
