//! Bitbucket Server Controller Library
//!
//! Reconciles repository SSH access keys and webhooks on a Bitbucket Server
//! instance from cluster-scoped Kubernetes resources.
//!
//! - `bitbucket` - REST client and domain types
//! - `managed` - Observe/Create/Update/Delete core, diff engine, secret generation
//! - `crd` - `AccessKey`, `Webhook` and `ProviderConfig` resources
//! - `runtime` - kube-runtime controllers driving the core

pub mod backoff;
pub mod bitbucket;
pub mod config;
pub mod constants;
pub mod crd;
pub mod managed;
pub mod observability;
pub mod runtime;
pub mod server;

pub use crd::{AccessKey, ProviderConfig, Webhook};
