//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of the controller as one multi-document
//! YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/bitbucket-server.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use bitbucket_server_controller::crd::{AccessKey, ProviderConfig, Webhook};
use kube::core::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [AccessKey::crd(), Webhook::crd(), ProviderConfig::crd()];
    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
