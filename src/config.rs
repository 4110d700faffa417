//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Only `PORT` is required and only a
//! missing or unparsable port stops startup. Anything else that is missing
//! or unusable falls back to a default and is recorded in
//! [`RelayConfig::fallbacks`], and a missing shared secret leaves publishing
//! closed rather than open.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// How socket messages are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// `vr_command` goes to the robot, `robot_status` goes to the VR client.
    #[default]
    Exclusive,
    /// Events from authenticated publishers go to every other connection.
    Broadcast,
}

impl FromStr for RoutingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" | "relay" => Ok(Self::Exclusive),
            "broadcast" => Ok(Self::Broadcast),
            other => Err(ConfigError::InvalidRoutingMode(other.to_string())),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Configuration problems.
///
/// [`ConfigError::MissingPort`] and [`ConfigError::InvalidPort`] are fatal.
/// The rest are collected in [`RelayConfig::fallbacks`] while the default
/// is used instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `PORT` is not set.
    #[error("PORT environment variable is not set")]
    MissingPort,
    /// `PORT` is not a valid port number.
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    /// A numeric setting could not be parsed.
    #[error("invalid {key}: {value}")]
    InvalidNumber {
        /// Environment variable name.
        key: &'static str,
        /// Value as found.
        value: String,
    },
    /// `HOST` is not an IP address.
    #[error("invalid HOST: {0}")]
    InvalidHost(String),
    /// `ROUTING_MODE` names no known mode.
    #[error("invalid ROUTING_MODE: {0} (expected `exclusive` or `broadcast`)")]
    InvalidRoutingMode(String),
    /// `LOG_FORMAT` names no known format.
    #[error("invalid LOG_FORMAT: {0} (expected `text` or `json`)")]
    InvalidLogFormat(String),
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Shared secret for publishers. `None` rejects every publish attempt.
    pub shared_secret: Option<String>,

    /// Waives the publisher check for socket messages. Never applies to
    /// the HTTP publish endpoint.
    pub allow_unauthenticated_ws: bool,

    /// Routing policy for socket messages.
    pub routing_mode: RoutingMode,

    /// Period of the liveness probe.
    pub heartbeat_interval: Duration,

    /// Per-connection outbound queue depth.
    pub outbound_buffer: usize,

    /// Log output format.
    pub log_format: LogFormat,

    /// Settings that were present but unusable and fell back to defaults.
    /// Reported once logging is up.
    pub fallbacks: Vec<ConfigError>,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .field("allow_unauthenticated_ws", &self.allow_unauthenticated_ws)
            .field("routing_mode", &self.routing_mode)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("outbound_buffer", &self.outbound_buffer)
            .field("log_format", &self.log_format)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(DEFAULT_HOST, 3000),
            shared_secret: None,
            allow_unauthenticated_ws: false,
            routing_mode: RoutingMode::default(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            log_format: LogFormat::default(),
            fallbacks: Vec::new(),
        }
    }
}

const DEFAULT_HOST: IpAddr = IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED);
const DEFAULT_HEARTBEAT_SECS: u64 = 30;
const DEFAULT_OUTBOUND_BUFFER: usize = 64;

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPort`] or [`ConfigError::InvalidPort`].
    /// Other unusable values are listed in [`RelayConfig::fallbacks`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_raw = lookup("PORT")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingPort)?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_raw.clone()))?;

        let mut fallbacks = Vec::new();

        let host = match lookup("HOST") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim().parse::<IpAddr>().unwrap_or_else(|_| {
                    fallbacks.push(ConfigError::InvalidHost(raw.clone()));
                    DEFAULT_HOST
                })
            }
            _ => DEFAULT_HOST,
        };

        let shared_secret = lookup("RELAY_SECRET").filter(|s| !s.is_empty());

        let allow_unauthenticated_ws =
            parse_bool(lookup("ALLOW_UNAUTHENTICATED_WS").as_deref(), false);

        let routing_mode: RoutingMode = parse_or_default(lookup("ROUTING_MODE"), &mut fallbacks);
        let log_format: LogFormat = parse_or_default(lookup("LOG_FORMAT"), &mut fallbacks);

        let heartbeat_secs: u64 = parse_number(
            "HEARTBEAT_INTERVAL_SECS",
            lookup("HEARTBEAT_INTERVAL_SECS"),
            DEFAULT_HEARTBEAT_SECS,
            &mut fallbacks,
        )
        .max(1);
        let outbound_buffer: usize = parse_number(
            "OUTBOUND_BUFFER",
            lookup("OUTBOUND_BUFFER"),
            DEFAULT_OUTBOUND_BUFFER,
            &mut fallbacks,
        )
        .max(1);

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            shared_secret,
            allow_unauthenticated_ws,
            routing_mode,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            outbound_buffer,
            log_format,
            fallbacks,
        })
    }
}

/// Parses an enum setting, falling back to its default when unset or
/// unrecognised.
fn parse_or_default<T>(raw: Option<String>, fallbacks: &mut Vec<ConfigError>) -> T
where
    T: FromStr<Err = ConfigError> + Default,
{
    match raw.map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            fallbacks.push(e);
            T::default()
        }
        None => T::default(),
    }
}

/// Parses a numeric setting, falling back to `default` when unset or
/// unparsable.
fn parse_number<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    fallbacks: &mut Vec<ConfigError>,
) -> T {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            fallbacks.push(ConfigError::InvalidNumber { key, value: raw });
            default
        }
    }
}

/// Parses a boolean. Accepts `"true"`, `"1"`, `"yes"`, `"false"`, `"0"`,
/// `"no"` (case-insensitive). Returns `default` otherwise.
fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes") => true,
        Some("false" | "0" | "no") => false,
        _ => default,
    }
}
