//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod action_log;
pub mod actuator;
pub mod program_repo;

pub use action_log::ActionLog;
pub use actuator::{Actuator, SweepReport};
pub use program_repo::ProgramRepository;
