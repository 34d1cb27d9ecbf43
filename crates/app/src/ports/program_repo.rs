//! Program repository port: persistence for programs.

use std::future::Future;

use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::ProgramId;
use relayhub_domain::program::Program;

/// Repository for persisting and querying [`Program`]s.
pub trait ProgramRepository {
    /// Create a new program in storage.
    fn create(&self, program: Program)
    -> impl Future<Output = Result<Program, RelayHubError>> + Send;

    /// Get a program by its unique identifier.
    fn get_by_id(
        &self,
        id: &ProgramId,
    ) -> impl Future<Output = Result<Option<Program>, RelayHubError>> + Send;

    /// Get all programs.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Program>, RelayHubError>> + Send;

    /// Get all enabled programs.
    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Program>, RelayHubError>> + Send;

    /// Update an existing program.
    fn update(&self, program: Program)
    -> impl Future<Output = Result<Program, RelayHubError>> + Send;

    /// Delete a program by its unique identifier.
    fn delete(&self, id: &ProgramId) -> impl Future<Output = Result<(), RelayHubError>> + Send;
}
