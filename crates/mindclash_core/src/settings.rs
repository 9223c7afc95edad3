//! # Settings
//!
//! Client configuration loaded once at startup from a TOML file. Every
//! knob has a default suitable for local development against a test
//! validator.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CoreError;

/// Timing knobs for the event stream client.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Hard ceiling on a single connect attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Delay between socket open and the subscription request.
    pub stabilization_ms: u64,
    /// Interval between liveness probes.
    pub health_interval_ms: u64,
    /// Close the socket when no event arrived for this long.
    pub event_silence_ms: u64,
    /// Close the socket when no probe response arrived for this long.
    pub probe_silence_ms: u64,
    /// Base reconnect backoff delay.
    pub reconnect_base_ms: u64,
    /// Reconnect backoff cap.
    pub reconnect_cap_ms: u64,
    /// Give up reconnecting after this many consecutive attempts.
    pub max_reconnect_attempts: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 20_000,
            stabilization_ms: 1_000,
            health_interval_ms: 30_000,
            event_silence_ms: 90_000,
            probe_silence_ms: 120_000,
            reconnect_base_ms: 2_000,
            reconnect_cap_ms: 30_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl StreamSettings {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Stabilization delay as a [`Duration`].
    #[must_use]
    pub const fn stabilization(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    /// Health probe interval as a [`Duration`].
    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }
}

/// Top-level client settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP endpoint for point-in-time reads.
    pub rpc_http_url: String,
    /// Socket endpoint for log subscriptions.
    pub rpc_socket_url: String,
    /// Base URL of the quiz content store.
    pub content_base_url: String,
    /// Program id whose logs and accounts we watch (base58).
    pub program_id: String,
    /// Commitment level for reads and subscriptions.
    pub commitment: String,
    /// Minimum gap between ledger reads, in milliseconds.
    pub read_gap_ms: u64,
    /// Stream client timing.
    pub stream: StreamSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_http_url: "http://127.0.0.1:8899".to_string(),
            rpc_socket_url: "ws://127.0.0.1:8900".to_string(),
            content_base_url: "http://127.0.0.1:4000".to_string(),
            program_id: String::new(),
            commitment: "confirmed".to_string(),
            read_gap_ms: 1_500,
            stream: StreamSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.as_ref().display())))?;
        toml::from_str(&raw).map_err(|e| CoreError::Config(e.to_string()))
    }
}
