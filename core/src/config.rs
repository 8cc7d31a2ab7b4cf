//! Executor configuration, read from the environment.

use std::time::Duration;

pub const CONNECT_TIMEOUT_ENV: &str = "FANOUT_CONNECT_TIMEOUT_MS";
pub const REQUEST_TIMEOUT_ENV: &str = "FANOUT_REQUEST_TIMEOUT_MS";
pub const POOL_IDLE_TIMEOUT_ENV: &str = "FANOUT_POOL_IDLE_TIMEOUT_MS";
pub const USER_AGENT_ENV: &str = "FANOUT_USER_AGENT";

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Settings for the shared HTTP client and the default deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub connect_timeout: Option<Duration>,
    /// Deadline applied to a batch when the caller does not supply one.
    pub default_timeout: Option<Duration>,
    pub pool_idle_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            default_timeout: None,
            pool_idle_timeout: Some(DEFAULT_POOL_IDLE_TIMEOUT),
            user_agent: concat!("fanout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults;
    /// unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout: millis(&lookup, CONNECT_TIMEOUT_ENV).or(defaults.connect_timeout),
            default_timeout: millis(&lookup, REQUEST_TIMEOUT_ENV).or(defaults.default_timeout),
            pool_idle_timeout: millis(&lookup, POOL_IDLE_TIMEOUT_ENV)
                .or(defaults.pool_idle_timeout),
            user_agent: lookup(USER_AGENT_ENV)
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or(defaults.user_agent),
        }
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid duration");
            None
        }
    }
}
