//! Session timing configuration.

use chrono::Duration;

/// Timeouts and token lifetimes.
///
/// ```rust
/// use chrono::Duration;
/// use rally_session::SessionConfig;
///
/// let config = SessionConfig {
///     inactivity_timeout: Duration::minutes(30),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.access_token_ttl, Duration::minutes(15));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long an account may sit idle before its session counts as
    /// expired at the next login attempt.
    ///
    /// Default: 10 minutes.
    pub inactivity_timeout: Duration,

    /// Lifetime of access tokens. Default: 15 minutes.
    pub access_token_ttl: Duration,

    /// Lifetime of refresh tokens. Default: 7 days.
    pub refresh_token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::minutes(10),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.inactivity_timeout, Duration::minutes(10));
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
    }
}
