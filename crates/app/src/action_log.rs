//! In-process action log backed by a bounded deque.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use relayhub_domain::action_log::{ACTION_LOG_CAPACITY, ActionLogEntry};
use relayhub_domain::error::RelayHubError;

use crate::ports::ActionLog;

/// In-memory [`ActionLog`] retaining the most recent `capacity` entries.
///
/// Appending to a full log evicts the oldest entry.
pub struct InMemoryActionLog {
    capacity: usize,
    entries: Mutex<VecDeque<ActionLogEntry>>,
}

impl Default for InMemoryActionLog {
    fn default() -> Self {
        Self::new(ACTION_LOG_CAPACITY)
    }
}

impl InMemoryActionLog {
    /// Create a log that keeps at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Every retained entry, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActionLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }
}

impl ActionLog for InMemoryActionLog {
    fn append(
        &self,
        entry: ActionLogEntry,
    ) -> impl Future<Output = Result<(), RelayHubError>> + Send {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if self.capacity > 0 {
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
        async { Ok(()) }
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActionLogEntry>, RelayHubError>> + Send {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let result: Vec<ActionLogEntry> = entries.iter().rev().take(limit).cloned().collect();
        async { Ok(result) }
    }

    fn clear(&self) -> impl Future<Output = Result<(), RelayHubError>> + Send {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayhub_domain::relay::{RelayIndex, RelayState};
    use relayhub_domain::time::now;

    fn entry(relay: u8, action: RelayState) -> ActionLogEntry {
        ActionLogEntry::new(RelayIndex::new(relay).unwrap(), action, now())
    }

    #[tokio::test]
    async fn should_return_entries_newest_first() {
        let log = InMemoryActionLog::default();
        log.append(entry(0, RelayState::On)).await.unwrap();
        log.append(entry(1, RelayState::On)).await.unwrap();
        log.append(entry(0, RelayState::Off)).await.unwrap();

        let recent = log.recent(10).await.unwrap();
        let relays: Vec<u8> = recent.iter().map(|e| e.relay.get()).collect();
        assert_eq!(relays, [0, 1, 0]);
        assert_eq!(recent[0].action, RelayState::Off);
    }

    #[tokio::test]
    async fn should_limit_recent_results() {
        let log = InMemoryActionLog::default();
        for _ in 0..5 {
            log.append(entry(2, RelayState::On)).await.unwrap();
        }
        assert_eq!(log.recent(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn should_evict_oldest_entry_when_full() {
        let log = InMemoryActionLog::new(2);
        let first = entry(0, RelayState::On);
        let first_id = first.id.clone();
        log.append(first).await.unwrap();
        log.append(entry(1, RelayState::On)).await.unwrap();
        log.append(entry(2, RelayState::On)).await.unwrap();

        let all = log.snapshot();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.id != first_id));
    }

    #[tokio::test]
    async fn should_keep_one_hundred_entries_by_default() {
        let log = InMemoryActionLog::default();
        for _ in 0..150 {
            log.append(entry(3, RelayState::Off)).await.unwrap();
        }
        assert_eq!(log.snapshot().len(), ACTION_LOG_CAPACITY);
    }

    #[tokio::test]
    async fn should_clear_all_entries() {
        let log = InMemoryActionLog::default();
        log.append(entry(0, RelayState::On)).await.unwrap();
        log.clear().await.unwrap();
        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
