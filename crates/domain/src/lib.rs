//! # relayhub-domain
//!
//! Pure domain model for the relayhub sequencer.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Relays** (the four physical outputs, their kind and labels)
//! - Define **Programs** (ordered steps: relay toggles, waits, loops)
//! - Define the **import/export document** programs are exchanged in
//! - Define **Action log entries** (records of relay transitions)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action_log;
pub mod program;
pub mod relay;
