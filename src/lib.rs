//! kaniko-deploy library crate
//!
//! Provisions a short-lived Kaniko build environment in a Kubernetes
//! cluster, runs the builder pod and tears everything down again.

pub mod build;
pub mod cli;
pub mod cluster;
pub mod controller;
pub mod manifests;
pub mod prompt;
pub mod resources;

use std::sync::Arc;

use kube::Client;
use tracing::info;

pub use build::BuildRequest;
pub use cluster::{ClusterClient, KubeClusterClient};
pub use controller::{Error, Orchestrator, OrchestratorConfig, Result, RunContext, RunReport};
pub use prompt::{DialoguerPrompter, Prompter};

/// Run a build against the cluster `client` points at.
///
/// Registry credentials missing from the request are read from the
/// terminal.
pub async fn run_deploy(
    client: Client,
    config: OrchestratorConfig,
    request: &BuildRequest,
) -> Result<RunReport> {
    info!(namespace = %config.namespace, "Starting build run");
    let cluster = Arc::new(KubeClusterClient::new(client, &config.namespace));
    let ctx = RunContext::new(cluster, Arc::new(DialoguerPrompter), config);
    Orchestrator::new(ctx).run(request).await
}
