//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for action log entries.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert epoch milliseconds (the relay controller's and the legacy history
/// format's unit) into a [`Timestamp`]. Out-of-range values yield `None`.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis)
}
