//! Action log port: append-only record of relay transitions.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::action_log::ActionLogEntry;
use relayhub_domain::error::RelayHubError;

/// Records relay transitions made by program runs.
pub trait ActionLog {
    /// Append an entry; implementations may evict the oldest entries.
    fn append(&self, entry: ActionLogEntry)
    -> impl Future<Output = Result<(), RelayHubError>> + Send;

    /// Up to `limit` entries, newest first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActionLogEntry>, RelayHubError>> + Send;

    /// Remove every entry.
    fn clear(&self) -> impl Future<Output = Result<(), RelayHubError>> + Send;
}

impl<T: ActionLog + Send + Sync> ActionLog for Arc<T> {
    fn append(
        &self,
        entry: ActionLogEntry,
    ) -> impl Future<Output = Result<(), RelayHubError>> + Send {
        (**self).append(entry)
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActionLogEntry>, RelayHubError>> + Send {
        (**self).recent(limit)
    }

    fn clear(&self) -> impl Future<Output = Result<(), RelayHubError>> + Send {
        (**self).clear()
    }
}
