//! Selects the relay controller named in the configuration.

use std::time::Duration;

use relayhub_adapter_esp_http::EspHttpActuator;
use relayhub_adapter_virtual::VirtualRelayBoard;
use relayhub_app::ports::{Actuator, SweepReport};
use relayhub_domain::error::ActuatorError;
use relayhub_domain::relay::{RELAY_COUNT, RelayIndex, RelayState};

use crate::config::{ActuatorKind, Config, ConfigError};

/// The relay controller chosen at startup.
pub enum Controller {
    Virtual(VirtualRelayBoard),
    Esp(EspHttpActuator),
}

impl Controller {
    /// Build the controller described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the ESP client cannot be
    /// created from the configured address.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.actuator.kind {
            ActuatorKind::Virtual => {
                let latency = Duration::from_millis(config.actuator.latency_ms);
                Ok(Self::Virtual(VirtualRelayBoard::new().with_latency(latency)))
            }
            ActuatorKind::EspHttp => {
                let esp = config.esp_config().ok_or_else(|| {
                    ConfigError::Validation("esp_http actuator requires a base_url".to_string())
                })?;
                let actuator = esp
                    .build()
                    .map_err(|err| ConfigError::Validation(err.to_string()))?;
                tracing::info!(base_url = actuator.base_url(), "using ESP relay controller");
                Ok(Self::Esp(actuator))
            }
        }
    }
}

impl Actuator for Controller {
    async fn set_relay(&self, relay: RelayIndex, state: RelayState) -> Result<(), ActuatorError> {
        match self {
            Self::Virtual(board) => board.set_relay(relay, state).await,
            Self::Esp(esp) => esp.set_relay(relay, state).await,
        }
    }

    async fn set_all_off(&self) -> SweepReport {
        match self {
            Self::Virtual(board) => board.set_all_off().await,
            Self::Esp(esp) => esp.set_all_off().await,
        }
    }

    async fn read_state(&self) -> Result<[RelayState; RELAY_COUNT], ActuatorError> {
        match self {
            Self::Virtual(board) => board.read_state().await,
            Self::Esp(esp) => esp.read_state().await,
        }
    }
}
