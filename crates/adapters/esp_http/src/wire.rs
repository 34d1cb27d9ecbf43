//! JSON bodies spoken by the controller firmware.

use serde::{Deserialize, Serialize};

/// `POST /relay/set` request.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SetRelayRequest {
    pub relay: u8,
    pub state: u8,
}

/// `POST /relay/set` response; `success` is `1` or `0`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SetRelayResponse {
    pub success: u8,
}

/// `GET /state` response, one field per output.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StateResponse {
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
}

impl StateResponse {
    pub(crate) fn outputs(&self) -> [u8; 4] {
        [self.in1, self.in2, self.in3, self.in4]
    }
}
