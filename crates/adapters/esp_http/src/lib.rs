//! # relayhub-adapter-esp-http
//!
//! [`Actuator`] implementation for the ESP relay controller, which exposes a
//! small JSON API over plain HTTP:
//!
//! | Method | Path | Body | Answer |
//! |--------|------|------|--------|
//! | `POST` | `/relay/set` | `{"relay": 0..3, "state": 0\|1}` | `{"success": 0\|1}` |
//! | `GET`  | `/state` | | `{"in1": 0\|1, .., "in4": 0\|1}` |
//!
//! ## Dependency rule
//!
//! Depends on `relayhub-app` (port traits) and `relayhub-domain` only.

mod error;
mod wire;

use std::time::Duration;

use reqwest::Client;

use relayhub_app::ports::Actuator;
use relayhub_domain::error::ActuatorError;
use relayhub_domain::relay::{RELAY_COUNT, RelayIndex, RelayState};

pub use error::EspError;
use wire::{SetRelayRequest, SetRelayResponse, StateResponse};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the ESP HTTP client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Controller address: a bare IP/host (`192.168.4.1`) or a full base URL.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl Config {
    /// Build an [`EspHttpActuator`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EspError::InvalidBaseUrl`] for an empty address, or
    /// [`EspError::Http`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<EspHttpActuator, EspError> {
        let base_url = normalize_base_url(&self.base_url)?;
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(EspHttpActuator { client, base_url })
    }
}

fn normalize_base_url(address: &str) -> Result<String, EspError> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(EspError::InvalidBaseUrl(address.to_string()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

/// HTTP client for the ESP relay controller.
#[derive(Debug, Clone)]
pub struct EspHttpActuator {
    client: Client,
    base_url: String,
}

impl EspHttpActuator {
    /// Base URL every request is sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_relay(&self, relay: RelayIndex, state: RelayState) -> Result<(), EspError> {
        let request = SetRelayRequest {
            relay: relay.get(),
            state: state.as_wire(),
        };
        let response = self
            .client
            .post(self.url("/relay/set"))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EspError::Status(response.status().as_u16()));
        }
        let body: SetRelayResponse = response.json().await?;
        if body.success == 0 {
            return Err(EspError::Rejected { relay });
        }
        Ok(())
    }

    async fn fetch_state(&self) -> Result<[RelayState; RELAY_COUNT], EspError> {
        let response = self.client.get(self.url("/state")).send().await?;
        if !response.status().is_success() {
            return Err(EspError::Status(response.status().as_u16()));
        }
        let body: StateResponse = response.json().await?;
        Ok(body.outputs().map(RelayState::from_wire))
    }
}

impl Actuator for EspHttpActuator {
    async fn set_relay(&self, relay: RelayIndex, state: RelayState) -> Result<(), ActuatorError> {
        tracing::debug!(%relay, %state, base_url = %self.base_url, "sending relay command");
        self.send_relay(relay, state).await.map_err(|err| {
            tracing::warn!(%relay, %state, %err, "relay command failed");
            ActuatorError::from(err)
        })
    }

    async fn read_state(&self) -> Result<[RelayState; RELAY_COUNT], ActuatorError> {
        self.fetch_state().await.map_err(ActuatorError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[derive(Clone, Default)]
    struct FakeDevice {
        outputs: Arc<Mutex<[u8; 4]>>,
        refuse: Arc<Mutex<bool>>,
        broken: Arc<Mutex<bool>>,
        delay: Arc<Mutex<Duration>>,
    }

    async fn set_relay(
        State(device): State<FakeDevice>,
        Json(request): Json<SetRelayRequest>,
    ) -> Result<Json<SetRelayResponse>, StatusCode> {
        let delay = *device.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *device.broken.lock().unwrap() {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        if *device.refuse.lock().unwrap() || request.relay > 3 {
            return Ok(Json(SetRelayResponse { success: 0 }));
        }
        device.outputs.lock().unwrap()[usize::from(request.relay)] = request.state;
        Ok(Json(SetRelayResponse { success: 1 }))
    }

    async fn state(State(device): State<FakeDevice>) -> Json<StateResponse> {
        let [in1, in2, in3, in4] = *device.outputs.lock().unwrap();
        Json(StateResponse { in1, in2, in3, in4 })
    }

    async fn serve(device: FakeDevice) -> SocketAddr {
        let app = Router::new()
            .route("/relay/set", post(set_relay))
            .route("/state", get(state))
            .with_state(device);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client(addr: SocketAddr, timeout: Duration) -> EspHttpActuator {
        Config {
            base_url: addr.to_string(),
            timeout,
        }
        .build()
        .unwrap()
    }

    fn relay(i: u8) -> RelayIndex {
        RelayIndex::new(i).unwrap()
    }

    #[test]
    fn should_prefix_bare_address_with_http_scheme() {
        assert_eq!(normalize_base_url("192.168.4.1").unwrap(), "http://192.168.4.1");
        assert_eq!(
            normalize_base_url("http://relay.local/").unwrap(),
            "http://relay.local"
        );
    }

    #[test]
    fn should_reject_empty_address() {
        assert!(matches!(
            normalize_base_url("  "),
            Err(EspError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn should_switch_relay_on_device() {
        let device = FakeDevice::default();
        let addr = serve(device.clone()).await;
        let esp = client(addr, DEFAULT_TIMEOUT);

        esp.set_relay(relay(2), RelayState::On).await.unwrap();

        assert_eq!(*device.outputs.lock().unwrap(), [0, 0, 1, 0]);
    }

    #[tokio::test]
    async fn should_read_all_four_outputs() {
        let device = FakeDevice::default();
        *device.outputs.lock().unwrap() = [1, 0, 0, 1];
        let addr = serve(device).await;
        let esp = client(addr, DEFAULT_TIMEOUT);

        let states = esp.read_state().await.unwrap();

        assert_eq!(
            states,
            [RelayState::On, RelayState::Off, RelayState::Off, RelayState::On]
        );
    }

    #[tokio::test]
    async fn should_map_unsuccessful_answer_to_rejection() {
        let device = FakeDevice::default();
        *device.refuse.lock().unwrap() = true;
        let addr = serve(device).await;
        let esp = client(addr, DEFAULT_TIMEOUT);

        let result = esp.set_relay(relay(1), RelayState::On).await;

        assert_eq!(result, Err(ActuatorError::Rejected { relay: relay(1) }));
    }

    #[tokio::test]
    async fn should_map_server_error_to_protocol_failure() {
        let device = FakeDevice::default();
        *device.broken.lock().unwrap() = true;
        let addr = serve(device).await;
        let esp = client(addr, DEFAULT_TIMEOUT);

        let result = esp.set_relay(relay(0), RelayState::Off).await;

        assert!(matches!(result, Err(ActuatorError::Protocol { .. })));
    }

    #[tokio::test]
    async fn should_report_unreachable_when_request_times_out() {
        let device = FakeDevice::default();
        *device.delay.lock().unwrap() = Duration::from_secs(2);
        let addr = serve(device).await;
        let esp = client(addr, Duration::from_millis(100));

        let result = esp.set_relay(relay(0), RelayState::On).await;

        assert!(matches!(result, Err(ActuatorError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn should_report_unreachable_when_nothing_listens() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let esp = client(addr, DEFAULT_TIMEOUT);

        let result = esp.set_relay(relay(0), RelayState::On).await;

        assert!(matches!(result, Err(ActuatorError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn should_sweep_every_output_off() {
        let device = FakeDevice::default();
        *device.outputs.lock().unwrap() = [1, 1, 1, 1];
        let addr = serve(device.clone()).await;
        let esp = client(addr, DEFAULT_TIMEOUT);

        let report = esp.set_all_off().await;

        assert!(report.is_clean());
        assert_eq!(*device.outputs.lock().unwrap(), [0, 0, 0, 0]);
    }
}
