//! # relayhub-adapter-virtual
//!
//! Simulated four-relay board implementing the [`Actuator`] port, for
//! demonstrations and for running programs without hardware.
//!
//! The board keeps the state of every output, records every command it
//! receives, and can be told to answer slowly or to refuse commands on a
//! given output.
//!
//! ## Dependency rule
//!
//! Depends on `relayhub-app` (port traits) and `relayhub-domain` only.

mod relay;

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use relayhub_app::ports::Actuator;
use relayhub_domain::error::ActuatorError;
use relayhub_domain::relay::{RELAY_COUNT, RelayIndex, RelayState};

pub use relay::VirtualRelay;

/// In-memory relay board.
#[derive(Default)]
pub struct VirtualRelayBoard {
    relays: [VirtualRelay; RELAY_COUNT],
    latency: Duration,
    commands: Mutex<Vec<(RelayIndex, RelayState)>>,
}

impl VirtualRelayBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every command by `latency` before it takes effect.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `relay` refuse (or accept again) every command.
    pub fn set_faulty(&self, relay: RelayIndex, faulty: bool) {
        self.relays[relay.as_usize()].set_faulty(faulty);
    }

    /// Current state of the four outputs.
    #[must_use]
    pub fn states(&self) -> [RelayState; RELAY_COUNT] {
        std::array::from_fn(|i| self.relays[i].state())
    }

    /// Every command received so far, in order, including refused ones.
    #[must_use]
    pub fn commands(&self) -> Vec<(RelayIndex, RelayState)> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Actuator for VirtualRelayBoard {
    fn set_relay(
        &self,
        relay: RelayIndex,
        state: RelayState,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send {
        async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.commands
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((relay, state));
            if self.relays[relay.as_usize()].switch(state) {
                tracing::debug!(%relay, %state, "virtual relay switched");
                Ok(())
            } else {
                tracing::warn!(%relay, %state, "virtual relay refused command");
                Err(ActuatorError::Rejected { relay })
            }
        }
    }

    fn read_state(
        &self,
    ) -> impl Future<Output = Result<[RelayState; RELAY_COUNT], ActuatorError>> + Send {
        let states = self.states();
        async move { Ok(states) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn relay(i: u8) -> RelayIndex {
        RelayIndex::new(i).unwrap()
    }

    #[tokio::test]
    async fn should_start_with_all_outputs_off() {
        let board = VirtualRelayBoard::new();
        assert_eq!(board.read_state().await.unwrap(), [RelayState::Off; 4]);
    }

    #[tokio::test]
    async fn should_switch_requested_output_only() {
        let board = VirtualRelayBoard::new();
        board.set_relay(relay(2), RelayState::On).await.unwrap();

        assert_eq!(
            board.states(),
            [RelayState::Off, RelayState::Off, RelayState::On, RelayState::Off]
        );
        assert_eq!(board.commands(), [(relay(2), RelayState::On)]);
    }

    #[tokio::test]
    async fn should_reject_commands_to_faulty_output() {
        let board = VirtualRelayBoard::new();
        board.set_faulty(relay(1), true);

        let result = board.set_relay(relay(1), RelayState::On).await;

        assert_eq!(result, Err(ActuatorError::Rejected { relay: relay(1) }));
        assert_eq!(board.states()[1], RelayState::Off);
    }

    #[tokio::test]
    async fn should_switch_everything_off_despite_faulty_output() {
        let board = VirtualRelayBoard::new();
        for r in RelayIndex::ALL {
            board.set_relay(r, RelayState::On).await.unwrap();
        }
        board.set_faulty(relay(3), true);

        let report = board.set_all_off().await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            board.states(),
            [RelayState::Off, RelayState::Off, RelayState::Off, RelayState::On]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_delay_commands_by_latency() {
        let board = VirtualRelayBoard::new().with_latency(Duration::from_millis(250));
        let started = Instant::now();

        board.set_relay(relay(0), RelayState::On).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }
}
