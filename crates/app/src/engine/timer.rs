//! The engine's single recurring timer.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Repeating countdown timer driving wait steps.
///
/// At most one is active at a time. [`ActiveTimer::cancel`] may be called any
/// number of times; only the first call on an active timer has an effect.
#[derive(Debug, Default)]
pub(crate) struct ActiveTimer {
    interval: Option<Interval>,
}

impl ActiveTimer {
    /// Start a timer whose first firing is one `period` from now.
    pub(crate) fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next firing. Never resolves once cancelled.
    pub(crate) async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Stop the timer. Returns `true` if this call stopped it.
    pub(crate) fn cancel(&mut self) -> bool {
        self.interval.take().is_some()
    }
}
