//! # relayhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ProgramRepository` and `ActionLog` ports defined in
//!   `relayhub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `relayhub-app` (for port traits) and `relayhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod action_log;
mod error;
mod pool;
mod program_repo;

pub use action_log::SqliteActionLog;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use program_repo::SqliteProgramRepository;
