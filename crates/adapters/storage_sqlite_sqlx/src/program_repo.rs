//! `SQLite` implementation of [`ProgramRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use relayhub_app::ports::ProgramRepository;
use relayhub_domain::error::{NotFoundError, RelayHubError};
use relayhub_domain::id::ProgramId;
use relayhub_domain::program::{Program, Step};
use relayhub_domain::time::now;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Program);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let enabled: bool = row.try_get("enabled")?;
        let steps_json: String = row.try_get("steps")?;

        // Steps are stored in document form; decoding re-validates them.
        let steps: Vec<Step> = serde_json::from_str(&steps_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Program {
            id: ProgramId::from(id),
            name,
            enabled,
            steps,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO programs (id, name, enabled, steps, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE programs SET name = ?, enabled = ?, steps = ?, updated_at = ?
    WHERE id = ?
";

/// `SQLite`-backed program repository.
pub struct SqliteProgramRepository {
    pool: SqlitePool,
}

impl SqliteProgramRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ProgramRepository for SqliteProgramRepository {
    async fn create(&self, program: Program) -> Result<Program, RelayHubError> {
        let steps_json = serde_json::to_string(&program.steps).map_err(StorageError::from)?;
        let timestamp = now().to_rfc3339();

        sqlx::query(INSERT)
            .bind(program.id.as_str())
            .bind(&program.name)
            .bind(program.enabled)
            .bind(&steps_json)
            .bind(&timestamp)
            .bind(&timestamp)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(program)
    }

    async fn get_by_id(&self, id: &ProgramId) -> Result<Option<Program>, RelayHubError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM programs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<Program>, RelayHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM programs ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_enabled(&self) -> Result<Vec<Program>, RelayHubError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM programs WHERE enabled = 1 ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, program: Program) -> Result<Program, RelayHubError> {
        let steps_json = serde_json::to_string(&program.steps).map_err(StorageError::from)?;

        let result = sqlx::query(UPDATE)
            .bind(&program.name)
            .bind(program.enabled)
            .bind(&steps_json)
            .bind(now().to_rfc3339())
            .bind(program.id.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Program",
                id: program.id.to_string(),
            }
            .into());
        }
        Ok(program)
    }

    async fn delete(&self, id: &ProgramId) -> Result<(), RelayHubError> {
        sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
