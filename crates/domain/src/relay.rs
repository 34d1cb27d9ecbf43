//! Relays: the four physical outputs driving pumps and valves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of outputs on the relay board.
pub const RELAY_COUNT: usize = 4;

/// Index of one of the four relay outputs (`0..=3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RelayIndex(u8);

impl RelayIndex {
    /// All four outputs, in board order.
    pub const ALL: [Self; RELAY_COUNT] = [Self(0), Self(1), Self(2), Self(3)];

    /// Wrap a raw index, returning `None` when it is not a valid output.
    #[must_use]
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < RELAY_COUNT).then_some(Self(index))
    }

    /// The raw index as a `u8`.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// The raw index as a `usize`, for array lookups.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<u8> for RelayIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("relay index {value} is out of range 0..=3"))
    }
}

impl From<RelayIndex> for u8 {
    fn from(value: RelayIndex) -> Self {
        value.0
    }
}

impl fmt::Display for RelayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Desired or resulting state of a relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    /// Whether the output is energised.
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// The integer the relay controller speaks (`1` for on, `0` for off).
    #[must_use]
    pub fn as_wire(self) -> u8 {
        u8::from(self.is_on())
    }

    /// Decode the controller's integer encoding; any non-zero value is on.
    #[must_use]
    pub fn from_wire(value: u8) -> Self {
        if value == 0 { Self::Off } else { Self::On }
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// Resting position of a valve when its relay is de-energised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveMode {
    /// Closed at rest; energising opens it.
    #[default]
    NormallyClosed,
    /// Open at rest; energising closes it.
    NormallyOpen,
}

/// What is wired to a relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayKind {
    #[default]
    Pump,
    Valve {
        #[serde(default)]
        mode: ValveMode,
    },
}

impl RelayKind {
    /// Verb describing what switching to `state` does to the attached hardware.
    #[must_use]
    pub fn verb(self, state: RelayState) -> &'static str {
        match (self, state) {
            (Self::Pump, RelayState::On) => "activate",
            (Self::Pump, RelayState::Off) => "deactivate",
            (
                Self::Valve {
                    mode: ValveMode::NormallyClosed,
                },
                RelayState::On,
            )
            | (
                Self::Valve {
                    mode: ValveMode::NormallyOpen,
                },
                RelayState::Off,
            ) => "open",
            (Self::Valve { .. }, _) => "close",
        }
    }
}

/// User-facing configuration of a single relay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    #[serde(default)]
    pub kind: RelayKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RelayConfig {
    /// A pump relay with the given name.
    #[must_use]
    pub fn pump(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelayKind::Pump,
            enabled: true,
        }
    }

    /// A valve relay with the given name and resting position.
    #[must_use]
    pub fn valve(name: impl Into<String>, mode: ValveMode) -> Self {
        Self {
            name: name.into(),
            kind: RelayKind::Valve { mode },
            enabled: true,
        }
    }
}

/// Labels and kinds for the four outputs of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBoard {
    relays: [RelayConfig; RELAY_COUNT],
}

impl Default for RelayBoard {
    fn default() -> Self {
        Self {
            relays: std::array::from_fn(|i| RelayConfig::pump(format!("Relay {}", i + 1))),
        }
    }
}

impl RelayBoard {
    /// Build a board from four relay configurations.
    #[must_use]
    pub fn new(relays: [RelayConfig; RELAY_COUNT]) -> Self {
        Self { relays }
    }

    /// Configuration of a single output.
    #[must_use]
    pub fn relay(&self, index: RelayIndex) -> &RelayConfig {
        &self.relays[index.as_usize()]
    }

    /// Human description of switching `index` to `state`, e.g. `"Garden pump: activate"`.
    #[must_use]
    pub fn describe(&self, index: RelayIndex, state: RelayState) -> String {
        let relay = self.relay(index);
        format!("{}: {}", relay.name, relay.kind.verb(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_indices_zero_to_three() {
        for i in 0..4 {
            assert_eq!(RelayIndex::new(i).map(RelayIndex::get), Some(i));
        }
    }

    #[test]
    fn should_reject_index_four() {
        assert!(RelayIndex::new(4).is_none());
    }

    #[test]
    fn should_reject_out_of_range_index_when_deserializing() {
        let result: Result<RelayIndex, _> = serde_json::from_str("9");
        assert!(result.is_err());
    }

    #[test]
    fn should_serialize_state_uppercase() {
        assert_eq!(serde_json::to_string(&RelayState::On).unwrap(), "\"ON\"");
        let parsed: RelayState = serde_json::from_str("\"OFF\"").unwrap();
        assert_eq!(parsed, RelayState::Off);
    }

    #[test]
    fn should_map_state_to_wire_integer() {
        assert_eq!(RelayState::On.as_wire(), 1);
        assert_eq!(RelayState::Off.as_wire(), 0);
        assert_eq!(RelayState::from_wire(1), RelayState::On);
        assert_eq!(RelayState::from_wire(0), RelayState::Off);
    }

    #[test]
    fn should_describe_pump_actions() {
        let board = RelayBoard::default();
        let idx = RelayIndex::new(0).unwrap();
        assert_eq!(board.describe(idx, RelayState::On), "Relay 1: activate");
        assert_eq!(board.describe(idx, RelayState::Off), "Relay 1: deactivate");
    }

    #[test]
    fn should_describe_normally_closed_valve() {
        let kind = RelayKind::Valve {
            mode: ValveMode::NormallyClosed,
        };
        assert_eq!(kind.verb(RelayState::On), "open");
        assert_eq!(kind.verb(RelayState::Off), "close");
    }

    #[test]
    fn should_invert_verbs_for_normally_open_valve() {
        let kind = RelayKind::Valve {
            mode: ValveMode::NormallyOpen,
        };
        assert_eq!(kind.verb(RelayState::On), "close");
        assert_eq!(kind.verb(RelayState::Off), "open");
    }

    #[test]
    fn should_use_configured_names() {
        let board = RelayBoard::new([
            RelayConfig::pump("Main pump"),
            RelayConfig::valve("Bed A", ValveMode::NormallyClosed),
            RelayConfig::valve("Bed B", ValveMode::NormallyOpen),
            RelayConfig::pump("Mist"),
        ]);
        let idx = RelayIndex::new(1).unwrap();
        assert_eq!(board.describe(idx, RelayState::On), "Bed A: open");
    }

    #[test]
    fn should_parse_relay_config_with_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{"name":"Drip"}"#).unwrap();
        assert_eq!(cfg.kind, RelayKind::Pump);
        assert!(cfg.enabled);
    }
}
