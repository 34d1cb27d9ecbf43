//! Errors talking to the relay controller.

use relayhub_domain::error::{ActuatorError, RelayHubError};
use relayhub_domain::relay::RelayIndex;

/// Errors originating from the ESP HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum EspError {
    /// The configured address cannot be used as a base URL.
    #[error("invalid controller address `{0}`")]
    InvalidBaseUrl(String),

    /// The request could not be sent, timed out, or the body was unreadable.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The controller answered with a non-success status.
    #[error("controller answered with status {0}")]
    Status(u16),

    /// The controller answered `success: 0`.
    #[error("relay {relay} rejected the command")]
    Rejected { relay: RelayIndex },
}

impl From<EspError> for ActuatorError {
    fn from(err: EspError) -> Self {
        match err {
            EspError::Rejected { relay } => Self::Rejected { relay },
            EspError::Http(err) if err.is_decode() => Self::Protocol {
                reason: err.to_string(),
            },
            EspError::Status(_) => Self::Protocol {
                reason: err.to_string(),
            },
            EspError::Http(_) | EspError::InvalidBaseUrl(_) => Self::Unreachable {
                reason: err.to_string(),
            },
        }
    }
}

impl From<EspError> for RelayHubError {
    fn from(err: EspError) -> Self {
        Self::Actuator(err.into())
    }
}
