//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `relayhub.toml` (or the path given on the command line). Every
//! field has a sensible default so the file is optional. Environment
//! variables take precedence over file values.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use relayhub_app::engine::EngineConfig;
use relayhub_domain::relay::{RELAY_COUNT, RelayBoard, RelayConfig};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "relayhub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay controller settings.
    pub actuator: ActuatorConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Execution engine settings.
    pub engine: EngineSettings,
    /// Names and kinds of the four outputs; empty means the default labels.
    pub relays: Vec<RelayConfig>,
}

/// Which relay controller to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    /// In-process simulated board.
    #[default]
    Virtual,
    /// ESP controller reached over HTTP.
    EspHttp,
}

impl FromStr for ActuatorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "virtual" => Ok(Self::Virtual),
            "esp_http" | "esp" => Ok(Self::EspHttp),
            other => Err(ConfigError::Validation(format!(
                "unknown actuator kind `{other}`"
            ))),
        }
    }
}

/// Relay controller configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub kind: ActuatorKind,
    /// Controller address, required for `esp_http`.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Simulated switching delay of the virtual board, in milliseconds.
    pub latency_ms: u64,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Engine tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Config {
    /// Load configuration from `path` (if present), apply environment
    /// overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("RELAYHUB_ACTUATOR") {
            self.actuator.kind = val.parse()?;
        }
        if let Some(val) = lookup("RELAYHUB_ESP_URL") {
            self.actuator.base_url = Some(val);
        }
        if let Some(val) = lookup("RELAYHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("RELAYHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.actuator.kind == ActuatorKind::EspHttp
            && self
                .actuator
                .base_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "esp_http actuator requires a base_url".to_string(),
            ));
        }
        if self.actuator.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "actuator timeout must be non-zero".to_string(),
            ));
        }
        if !self.relays.is_empty() && self.relays.len() != RELAY_COUNT {
            return Err(ConfigError::Validation(format!(
                "expected {RELAY_COUNT} relays, found {}",
                self.relays.len()
            )));
        }
        if self.engine.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "event capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Labels of the four outputs.
    #[must_use]
    pub fn board(&self) -> RelayBoard {
        <[RelayConfig; RELAY_COUNT]>::try_from(self.relays.clone())
            .map(RelayBoard::new)
            .unwrap_or_default()
    }

    /// Settings handed to the execution engine.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            board: self.board(),
            event_capacity: self.engine.event_capacity,
            ..EngineConfig::default()
        }
    }

    /// ESP client settings, when an address is configured.
    #[must_use]
    pub fn esp_config(&self) -> Option<relayhub_adapter_esp_http::Config> {
        self.actuator
            .base_url
            .as_ref()
            .map(|base_url| relayhub_adapter_esp_http::Config {
                base_url: base_url.clone(),
                timeout: Duration::from_millis(self.actuator.timeout_ms),
            })
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Virtual,
            base_url: None,
            timeout_ms: 5_000,
            latency_ms: 0,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:relayhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "relayhubd=info,relayhub_app=info,relayhub_adapter_esp_http=info".to_string(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            event_capacity: relayhub_app::engine::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use relayhub_domain::relay::{RelayIndex, RelayKind, RelayState, ValveMode};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.actuator.kind, ActuatorKind::Virtual);
        assert_eq!(config.actuator.timeout_ms, 5_000);
        assert_eq!(config.database_url(), "sqlite:relayhub.db?mode=rwc");
        assert_eq!(config.engine.event_capacity, 256);
        assert!(config.relays.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.actuator.kind, ActuatorKind::Virtual);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [actuator]
            kind = 'esp_http'
            base_url = '192.168.4.1'
            timeout_ms = 2000

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [engine]
            event_capacity = 32

            [[relays]]
            name = 'Pump'

            [[relays]]
            name = 'Bed A'
            kind = { type = 'valve', mode = 'normally_open' }

            [[relays]]
            name = 'Bed B'
            kind = { type = 'valve' }

            [[relays]]
            name = 'Spare'
            enabled = false
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.actuator.kind, ActuatorKind::EspHttp);
        assert_eq!(config.actuator.base_url.as_deref(), Some("192.168.4.1"));
        assert_eq!(config.database_url(), "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.engine.event_capacity, 32);
        assert!(config.validate().is_ok());

        let board = config.board();
        let bed_a = board.relay(RelayIndex::new(1).unwrap());
        assert_eq!(
            bed_a.kind,
            RelayKind::Valve {
                mode: ValveMode::NormallyOpen
            }
        );
        assert!(!board.relay(RelayIndex::new(3).unwrap()).enabled);
        assert_eq!(
            board.describe(RelayIndex::new(1).unwrap(), RelayState::On),
            "Bed A: close"
        );
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml")).unwrap();
        assert_eq!(config.actuator.timeout_ms, 5_000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_esp_actuator_without_base_url() {
        let mut config = Config::default();
        config.actuator.kind = ActuatorKind::EspHttp;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn should_reject_zero_timeout() {
        let mut config = Config::default();
        config.actuator.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_partial_relay_list() {
        let mut config = Config::default();
        config.relays = vec![RelayConfig::pump("only one")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("RELAYHUB_ACTUATOR", "esp_http"),
                ("RELAYHUB_ESP_URL", "http://10.0.0.7"),
                ("RELAYHUB_DATABASE_URL", "sqlite::memory:"),
                ("RELAYHUB_LOG", "warn"),
            ]))
            .unwrap();
        assert_eq!(config.actuator.kind, ActuatorKind::EspHttp);
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.filter, "warn");
        assert!(config.validate().is_ok());
        let esp = config.esp_config().unwrap();
        assert_eq!(esp.base_url, "http://10.0.0.7");
        assert_eq!(esp.timeout, Duration::from_secs(5));
    }

    #[test]
    fn should_prefer_rust_log_over_relayhub_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("RELAYHUB_LOG", "warn"), ("RUST_LOG", "trace")]))
            .unwrap();
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_reject_unknown_actuator_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("RELAYHUB_ACTUATOR", "serial")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_use_default_labels_without_relay_section() {
        let config = Config::default();
        assert_eq!(config.board(), RelayBoard::default());
        assert_eq!(config.engine_config().tick_period, Duration::from_secs(1));
    }
}
