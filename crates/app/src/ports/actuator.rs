//! Actuator port: the relay controller the engine drives.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::error::ActuatorError;
use relayhub_domain::relay::{RELAY_COUNT, RelayIndex, RelayState};

/// Switches the four physical relay outputs.
///
/// Retry policy, if any, belongs to the implementation; callers treat every
/// error as final.
pub trait Actuator: Send + Sync {
    /// Drive one output to `state`, resolving once the controller has answered.
    fn set_relay(
        &self,
        relay: RelayIndex,
        state: RelayState,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send;

    /// Switch every output off, one command per output, in board order.
    ///
    /// A failing output does not prevent the remaining commands from being
    /// issued; every failure is collected in the returned report.
    fn set_all_off(&self) -> impl Future<Output = SweepReport> + Send {
        async move {
            let mut report = SweepReport::default();
            for relay in RelayIndex::ALL {
                let result = self.set_relay(relay, RelayState::Off).await;
                report.record(relay, result);
            }
            report
        }
    }

    /// Read the current state of the four outputs.
    fn read_state(
        &self,
    ) -> impl Future<Output = Result<[RelayState; RELAY_COUNT], ActuatorError>> + Send;
}

impl<T: Actuator> Actuator for Arc<T> {
    fn set_relay(
        &self,
        relay: RelayIndex,
        state: RelayState,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send {
        (**self).set_relay(relay, state)
    }

    fn set_all_off(&self) -> impl Future<Output = SweepReport> + Send {
        (**self).set_all_off()
    }

    fn read_state(
        &self,
    ) -> impl Future<Output = Result<[RelayState; RELAY_COUNT], ActuatorError>> + Send {
        (**self).read_state()
    }
}

/// Outcome of an all-outputs-off sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Outputs that were sent an off command, in order.
    pub attempted: Vec<RelayIndex>,
    /// Outputs whose off command failed.
    pub failures: Vec<(RelayIndex, ActuatorError)>,
}

impl SweepReport {
    /// Record the outcome of one off command.
    pub fn record(&mut self, relay: RelayIndex, result: Result<(), ActuatorError>) {
        self.attempted.push(relay);
        if let Err(err) = result {
            self.failures.push((relay, err));
        }
    }

    /// Whether every output acknowledged the off command.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
