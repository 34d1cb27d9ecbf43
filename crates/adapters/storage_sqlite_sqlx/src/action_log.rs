//! `SQLite` implementation of [`ActionLog`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use relayhub_app::ports::ActionLog;
use relayhub_domain::action_log::{ACTION_LOG_CAPACITY, ActionLogEntry};
use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::ActionLogEntryId;
use relayhub_domain::relay::{RelayIndex, RelayState};

use crate::error::StorageError;

struct Wrapper(ActionLogEntry);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let relay: i64 = row.try_get("relay")?;
        let action: String = row.try_get("action")?;
        let timestamp: String = row.try_get("timestamp")?;

        let relay = u8::try_from(relay)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            .and_then(|raw| RelayIndex::try_from(raw).map_err(|err| sqlx::Error::Decode(err.into())))?;
        let action = match action.as_str() {
            "ON" => RelayState::On,
            "OFF" => RelayState::Off,
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown relay action `{other}`").into(),
                ));
            }
        };
        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .to_utc();

        Ok(Self(ActionLogEntry {
            id: ActionLogEntryId::from(id),
            relay,
            action,
            timestamp,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO action_log (id, relay, action, timestamp)
    VALUES (?, ?, ?, ?)
";

const TRIM: &str = r"
    DELETE FROM action_log
    WHERE seq NOT IN (SELECT seq FROM action_log ORDER BY seq DESC LIMIT ?)
";

const SELECT_RECENT: &str = r"
    SELECT * FROM action_log
    ORDER BY seq DESC
    LIMIT ?
";

/// `SQLite`-backed action log retaining the most recent entries.
#[derive(Clone)]
pub struct SqliteActionLog {
    pool: SqlitePool,
    capacity: usize,
}

impl SqliteActionLog {
    /// Create a log backed by `pool` that keeps the default number of entries.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_capacity(pool, ACTION_LOG_CAPACITY)
    }

    /// Create a log that keeps at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(pool: SqlitePool, capacity: usize) -> Self {
        Self { pool, capacity }
    }
}

fn sql_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl ActionLog for SqliteActionLog {
    async fn append(&self, entry: ActionLogEntry) -> Result<(), RelayHubError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(entry.id.as_str())
            .bind(i64::from(entry.relay.get()))
            .bind(entry.action.to_string())
            .bind(entry.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let trimmed = sqlx::query(TRIM)
            .bind(sql_limit(self.capacity))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        if trimmed.rows_affected() > 0 {
            tracing::trace!(evicted = trimmed.rows_affected(), "action log trimmed");
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActionLogEntry>, RelayHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn clear(&self) -> Result<(), RelayHubError> {
        sqlx::query("DELETE FROM action_log")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use relayhub_domain::time::from_epoch_millis;

    async fn setup(capacity: usize) -> SqliteActionLog {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteActionLog::with_capacity(db.pool().clone(), capacity)
    }

    fn entry(relay: u8, action: RelayState, millis: i64) -> ActionLogEntry {
        ActionLogEntry::new(
            RelayIndex::new(relay).unwrap(),
            action,
            from_epoch_millis(millis).unwrap(),
        )
    }

    #[tokio::test]
    async fn should_append_and_read_back_newest_first() {
        let log = setup(ACTION_LOG_CAPACITY).await;
        let first = entry(0, RelayState::On, 1_000);
        let second = entry(3, RelayState::Off, 2_000);

        log.append(first.clone()).await.unwrap();
        log.append(second.clone()).await.unwrap();

        assert_eq!(log.recent(10).await.unwrap(), [second, first]);
    }

    #[tokio::test]
    async fn should_limit_recent_results() {
        let log = setup(ACTION_LOG_CAPACITY).await;
        for i in 0..5 {
            log.append(entry(1, RelayState::On, i)).await.unwrap();
        }
        assert_eq!(log.recent(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_evict_oldest_entries_beyond_capacity() {
        let log = setup(3).await;
        for i in 0..5 {
            log.append(entry(2, RelayState::On, i * 1_000)).await.unwrap();
        }

        let kept: Vec<i64> = log
            .recent(10)
            .await
            .unwrap()
            .iter()
            .map(|e| e.timestamp.timestamp_millis())
            .collect();
        assert_eq!(kept, [4_000, 3_000, 2_000]);
    }

    #[tokio::test]
    async fn should_clear_log() {
        let log = setup(ACTION_LOG_CAPACITY).await;
        log.append(entry(0, RelayState::On, 0)).await.unwrap();

        log.clear().await.unwrap();

        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
