//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default interval between reconciliation passes of a healthy resource (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default number of resources reconciled concurrently per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 10;

/// Default Fibonacci backoff starting value (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 1;

/// Default Fibonacci backoff maximum value (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Delay before restarting a controller stream that ended unexpectedly (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Finalizer guarding remote deletion
pub const FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// Field manager for server-side apply of connection secrets
pub const FIELD_MANAGER: &str = "bitbucket-server-controller";

/// Connection detail holding a generated SSH private key
pub const CONNECTION_KEY_SSH_PRIVATE_KEY: &str = "ssh-privatekey";

/// Connection detail holding a webhook signing secret
pub const CONNECTION_KEY_SECRET: &str = "secret";
