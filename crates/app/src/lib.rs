//! # relayhub-app
//!
//! Application layer: use-cases, **port definitions** (traits) and the
//! program execution engine.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Actuator`: switch the four relay outputs
//!   - `ActionLog`: append & query relay transitions
//!   - `ProgramRepository`: CRUD for programs
//! - Define **driving/inbound ports**:
//!   - `ProgramService`: import, list, get, update, delete programs
//!   - `ProgramEngine` / `EngineHandle`: start, stop, observe a program run
//! - Provide **in-process infrastructure** that doesn't need IO (the bounded
//!   in-memory action log)
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `relayhub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action_log;
pub mod engine;
pub mod ports;
pub mod services;
