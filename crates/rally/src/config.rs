//! Server configuration, read from `RALLY_*` environment variables.

use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rally_session::{ExemptPaths, SessionConfig};

pub const ENV_BIND_ADDR: &str = "RALLY_BIND_ADDR";
pub const ENV_SIGNING_KEY: &str = "RALLY_SIGNING_KEY";
pub const ENV_INACTIVITY_MINS: &str = "RALLY_INACTIVITY_MINS";
pub const ENV_ACCESS_TTL_MINS: &str = "RALLY_ACCESS_TTL_MINS";
pub const ENV_REFRESH_TTL_DAYS: &str = "RALLY_REFRESH_TTL_DAYS";
pub const ENV_ACTIVITY_EXEMPT_PATHS: &str = "RALLY_ACTIVITY_EXEMPT_PATHS";
pub const ENV_IDLE_TIMEOUT_SECS: &str = "RALLY_IDLE_TIMEOUT_SECS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_IDLE_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// Problems building a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Everything the server needs to start.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// HMAC key for token signing. Never logged.
    pub signing_key: String,
    pub session: SessionConfig,
    /// Authenticated paths that skip the activity check. Login, refresh
    /// and logout never reach the tracker, so listing them has no effect.
    /// Empty by default.
    pub exempt_paths: ExemptPaths,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: StdDuration,
}

impl ServerConfig {
    /// Defaults for everything except the signing key.
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            signing_key: signing_key.into(),
            session: SessionConfig::default(),
            exempt_paths: ExemptPaths::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source. Unset or empty variables
    /// fall back to defaults, except the signing key which is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let signing_key = get(ENV_SIGNING_KEY).ok_or(ConfigError::Missing(ENV_SIGNING_KEY))?;
        let mut config = Self::new(signing_key);

        if let Some(addr) = get(ENV_BIND_ADDR) {
            config.bind_addr = addr;
        }
        let minutes = |name: &'static str| parse_span(name, get(name), Duration::try_minutes);
        if let Some(timeout) = minutes(ENV_INACTIVITY_MINS)? {
            config.session.inactivity_timeout = timeout;
        }
        if let Some(ttl) = minutes(ENV_ACCESS_TTL_MINS)? {
            config.session.access_token_ttl = ttl;
        }
        let days = |name: &'static str| parse_span(name, get(name), Duration::try_days);
        if let Some(ttl) = days(ENV_REFRESH_TTL_DAYS)? {
            config.session.refresh_token_ttl = ttl;
        }
        if let Some(secs) = parse_positive(ENV_IDLE_TIMEOUT_SECS, get(ENV_IDLE_TIMEOUT_SECS))? {
            config.idle_timeout = StdDuration::from_secs(secs);
        }
        if let Some(paths) = get(ENV_ACTIVITY_EXEMPT_PATHS) {
            config.exempt_paths = ExemptPaths::new(
                paths
                    .split(',')
                    .map(str::trim)
                    .filter(|path| !path.is_empty()),
            );
        }

        Ok(config)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("signing_key", &"<redacted>")
            .field("session", &self.session)
            .field("exempt_paths", &self.exempt_paths)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

fn parse_positive(name: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = raw.trim().parse::<u64>();
    match parsed {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// Like [`parse_positive`], then converted with `to`. A value too large
/// for a `chrono::Duration`, or one that pushes "now" past the last
/// representable date, is rejected the same way.
fn parse_span(
    name: &'static str,
    raw: Option<String>,
    to: fn(i64) -> Option<Duration>,
) -> Result<Option<Duration>, ConfigError> {
    let original = raw.clone();
    let Some(value) = parse_positive(name, raw)? else {
        return Ok(None);
    };
    i64::try_from(value)
        .ok()
        .and_then(to)
        .filter(|span| Utc::now().checked_add_signed(*span).is_some())
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidNumber {
            name,
            value: original.unwrap_or_default(),
        })
}
