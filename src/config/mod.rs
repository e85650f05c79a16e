//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_MAX_CONCURRENT_RECONCILES,
    DEFAULT_METRICS_PORT, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables,
/// typically populated from a ConfigMap with `envFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Interval between passes over a healthy resource (seconds)
    pub poll_interval_secs: u64,
    /// Resources reconciled concurrently per kind
    pub max_concurrent_reconciles: u16,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// First delay of the per-resource error backoff (seconds)
    pub backoff_min_secs: u64,
    /// Cap of the per-resource error backoff (seconds)
    pub backoff_max_secs: u64,
    /// Delay before restarting a controller stream that ended (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            metrics_port: DEFAULT_METRICS_PORT,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset or unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            poll_interval_secs: parse_or(lookup("POLL_INTERVAL_SECS"), DEFAULT_POLL_INTERVAL_SECS),
            max_concurrent_reconciles: parse_or(
                lookup("MAX_CONCURRENT_RECONCILES"),
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            ),
            metrics_port: parse_or(lookup("METRICS_PORT"), DEFAULT_METRICS_PORT),
            backoff_min_secs: parse_or(lookup("BACKOFF_MIN_SECS"), DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: parse_or(lookup("BACKOFF_MAX_SECS"), DEFAULT_BACKOFF_MAX_SECS),
            watch_restart_delay_secs: parse_or(
                lookup("WATCH_RESTART_DELAY_SECS"),
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ControllerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.metrics_port, 8080);
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("POLL_INTERVAL_SECS", "30"),
            ("MAX_CONCURRENT_RECONCILES", "4"),
            ("BACKOFF_MAX_SECS", " 120 "),
        ]));
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.max_concurrent_reconciles, 4);
        assert_eq!(config.backoff_max_secs, 120);
        assert_eq!(config.backoff_min_secs, DEFAULT_BACKOFF_MIN_SECS);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("POLL_INTERVAL_SECS", "soon"),
            ("METRICS_PORT", "70000"),
        ]));
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
    }
}
