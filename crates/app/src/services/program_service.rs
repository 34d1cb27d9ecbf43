//! Program service: use-cases for managing programs.

use relayhub_domain::error::{NotFoundError, RelayHubError};
use relayhub_domain::id::ProgramId;
use relayhub_domain::program::Program;

use crate::ports::ProgramRepository;

/// Application service for program CRUD operations and import.
pub struct ProgramService<R> {
    repo: R,
}

impl<R: ProgramRepository> ProgramService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Parse a program document and store it.
    ///
    /// A program whose id is already stored replaces the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::MalformedProgram`] if the document is invalid,
    /// or a storage error propagated from the repository.
    #[tracing::instrument(skip(self, json))]
    pub async fn import_json(&self, json: &str) -> Result<Program, RelayHubError> {
        let program = Program::from_json(json)?;
        if self.repo.get_by_id(&program.id).await?.is_some() {
            tracing::info!(program_id = %program.id, "replacing existing program");
            self.repo.update(program).await
        } else {
            tracing::info!(program_id = %program.id, program_name = %program.name, "importing program");
            self.repo.create(program).await
        }
    }

    /// Create a new program after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::MalformedProgram`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, program), fields(program_name = %program.name))]
    pub async fn create_program(&self, program: Program) -> Result<Program, RelayHubError> {
        program.validate()?;
        self.repo.create(program).await
    }

    /// Look up a program by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when no program with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_program(&self, id: &ProgramId) -> Result<Program, RelayHubError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id.as_str()))
    }

    /// First program named exactly `name`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Program>, RelayHubError> {
        let programs = self.repo.get_all().await?;
        Ok(programs.into_iter().find(|p| p.name == name))
    }

    /// List all programs.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_programs(&self) -> Result<Vec<Program>, RelayHubError> {
        self.repo.get_all().await
    }

    /// Get all enabled programs.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_enabled(&self) -> Result<Vec<Program>, RelayHubError> {
        self.repo.get_enabled().await
    }

    /// Update an existing program.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::MalformedProgram`] if invariants fail, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, program), fields(program_id = %program.id))]
    pub async fn update_program(&self, program: Program) -> Result<Program, RelayHubError> {
        program.validate()?;
        self.repo.update(program).await
    }

    /// Delete a program by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_program(&self, id: &ProgramId) -> Result<(), RelayHubError> {
        self.repo.delete(id).await
    }

    /// Look a program up by id, or failing that by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when nothing matches `key`, or a
    /// storage error from the repository.
    pub async fn resolve(&self, key: &str) -> Result<Program, RelayHubError> {
        match self.repo.get_by_id(&ProgramId::from(key)).await? {
            Some(program) => Ok(program),
            None => self.find_by_name(key).await?.ok_or_else(|| not_found(key)),
        }
    }

    /// Resolve `key` (see [`ProgramService::resolve`]) to a program that may
    /// be run.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when nothing matches `key`,
    /// [`RelayHubError::Disabled`] when the program is disabled, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn runnable_program(&self, key: &str) -> Result<Program, RelayHubError> {
        let program = self.resolve(key).await?;
        if !program.enabled {
            return Err(RelayHubError::Disabled(program.id));
        }
        Ok(program)
    }
}

fn not_found(id: &str) -> RelayHubError {
    NotFoundError {
        entity: "Program",
        id: id.to_string(),
    }
    .into()
}
