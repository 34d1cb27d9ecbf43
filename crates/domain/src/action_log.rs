//! Action log entries: one record per relay transition a program run made.

use serde::{Deserialize, Serialize};

use crate::id::ActionLogEntryId;
use crate::relay::{RelayIndex, RelayState};
use crate::time::Timestamp;

/// Maximum number of entries an action log retains; older entries are evicted first.
pub const ACTION_LOG_CAPACITY: usize = 100;

/// A relay transition performed by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: ActionLogEntryId,
    pub relay: RelayIndex,
    pub action: RelayState,
    pub timestamp: Timestamp,
}

impl ActionLogEntry {
    /// Record a transition with a freshly generated id.
    #[must_use]
    pub fn new(relay: RelayIndex, action: RelayState, timestamp: Timestamp) -> Self {
        Self {
            id: ActionLogEntryId::generate(),
            relay,
            action,
            timestamp,
        }
    }
}
