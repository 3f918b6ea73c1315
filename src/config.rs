use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::MAX_DIFFICULTY;
use crate::error::ConfigError;

/// Process settings, read once from the environment (after `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub http_port: u16,
    /// Peer-session listener; disabled when unset.
    pub tcp_port: Option<u16>,
    pub difficulty: u32,
    pub mining_throttle: Duration,
    pub broadcast_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 8080,
            tcp_port: None,
            difficulty: 0,
            mining_throttle: Duration::from_millis(1000),
            broadcast_interval: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let http_port = match lookup("HTTP_PORT") {
            Some(v) => parse("HTTP_PORT", v)?,
            None => parse_or(&lookup, "ADDR", defaults.http_port)?,
        };
        let tcp_port = lookup("TCP_PORT")
            .map(|v| parse("TCP_PORT", v))
            .transpose()?;

        let difficulty: u32 = parse_or(&lookup, "DIFFICULTY", defaults.difficulty)?;
        if difficulty > MAX_DIFFICULTY {
            return Err(invalid(
                "DIFFICULTY",
                difficulty.to_string(),
                format!("must be at most {MAX_DIFFICULTY}"),
            ));
        }

        let throttle_ms: u64 = parse_or(&lookup, "MINING_THROTTLE_MS", 1000)?;
        let interval_secs: u64 = parse_or(&lookup, "BROADCAST_INTERVAL_SECS", 30)?;
        if interval_secs == 0 {
            return Err(invalid(
                "BROADCAST_INTERVAL_SECS",
                "0".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            host,
            http_port,
            tcp_port,
            difficulty,
            mining_throttle: Duration::from_millis(throttle_ms),
            broadcast_interval: Duration::from_secs(interval_secs),
        })
    }
}

fn invalid(key: &'static str, value: String, reason: String) -> ConfigError {
    ConfigError::Invalid { key, value, reason }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value.clone(), e.to_string()))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |v| parse(key, v))
}
