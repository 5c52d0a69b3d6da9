//! Application configuration.
//!
//! Settings come from the process environment, with a `.env` file in the
//! working directory loaded first when present. Command-line flags are
//! applied on top in `main`.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8765";
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ws_url: String,
    /// Command line of the program that records one utterance.
    pub recognizer_cmd: Option<String>,
    /// Command line of the program that speaks its last argument.
    pub synth_cmd: Option<String>,
    pub synth_language_flag: Option<String>,
    pub ping_interval: Option<Duration>,
    pub reconnect_delay: Option<Duration>,
    pub voice_idle_timeout: Option<Duration>,
    pub tts_enabled: bool,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("{var} must be true or false, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var} must be a ws:// or wss:// URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `DALI_WS_URL`: backend endpoint. Defaults to `ws://localhost:8765`.
    // *   `DALI_RECOGNIZER_CMD` / `DALI_SYNTH_CMD`: speech engine commands. Unset means unsupported.
    // *   `DALI_SYNTH_LANGUAGE_FLAG`: flag passed before the voice name, e.g. `-v` for espeak-ng.
    // *   `DALI_PING_INTERVAL_SECS`: keep-alive period, `0` disables. Defaults to 30.
    // *   `DALI_RECONNECT_DELAY_SECS`: reconnect after a disconnect. Unset or `0` disables.
    // *   `DALI_VOICE_IDLE_TIMEOUT_SECS`: leave voice mode when idle. Unset or `0` disables.
    // *   `DALI_TTS_ENABLED`: initial speech output state. Defaults to true.
    // *   `RUST_LOG`: log level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from a dotenv file without touching the process
    /// environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let vars = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ws_url = var("DALI_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl {
                var: "DALI_WS_URL",
                value: ws_url,
            });
        }

        let ping_interval = match var("DALI_PING_INTERVAL_SECS") {
            Some(value) => seconds("DALI_PING_INTERVAL_SECS", value)?,
            None => Some(Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)),
        };
        let reconnect_delay = var("DALI_RECONNECT_DELAY_SECS")
            .map(|value| seconds("DALI_RECONNECT_DELAY_SECS", value))
            .transpose()?
            .flatten();
        let voice_idle_timeout = var("DALI_VOICE_IDLE_TIMEOUT_SECS")
            .map(|value| seconds("DALI_VOICE_IDLE_TIMEOUT_SECS", value))
            .transpose()?
            .flatten();

        let tts_enabled = match var("DALI_TTS_ENABLED") {
            Some(value) => boolean("DALI_TTS_ENABLED", value)?,
            None => true,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            ws_url,
            recognizer_cmd: var("DALI_RECOGNIZER_CMD"),
            synth_cmd: var("DALI_SYNTH_CMD"),
            synth_language_flag: var("DALI_SYNTH_LANGUAGE_FLAG"),
            ping_interval,
            reconnect_delay,
            voice_idle_timeout,
            tts_enabled,
            log_level,
        })
    }
}

// `0` means disabled.
fn seconds(var: &'static str, value: String) -> Result<Option<Duration>, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(ConfigError::InvalidSeconds { var, value }),
    }
}

fn boolean(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value }),
    }
}
