//! Shared context for a build run.
//!
//! [`RunContext`] carries the injected cluster client, the prompter and the
//! run configuration to every component.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cluster::ClusterClient;
use crate::prompt::Prompter;
use crate::resources::pod::DEFAULT_BUILDER_IMAGE;
use crate::resources::secret::{DEFAULT_REGISTRY_HOST, REGISTRY_SECRET_NAME};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Delay between pod status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Delay after creating storage objects, letting the cluster bind them
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub namespace: String,
    pub builder_image: String,
    pub registry_host: String,
    pub secret_name: String,
    /// Directory holding `volume.yaml`, `volume-claim.yaml`, `pod-kaniko.yaml`
    pub manifest_dir: PathBuf,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    /// Upper bound on waiting for the pod; `None` waits indefinitely
    pub wait_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            builder_image: DEFAULT_BUILDER_IMAGE.to_string(),
            registry_host: DEFAULT_REGISTRY_HOST.to_string(),
            secret_name: REGISTRY_SECRET_NAME.to_string(),
            manifest_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            wait_timeout: None,
        }
    }
}

/// Shared context for one run
#[derive(Clone)]
pub struct RunContext {
    /// Cluster access
    pub client: Arc<dyn ClusterClient>,
    /// Interactive credential input
    pub prompter: Arc<dyn Prompter>,
    pub config: OrchestratorConfig,
}

impl RunContext {
    /// Create a new context
    pub fn new(
        client: Arc<dyn ClusterClient>,
        prompter: Arc<dyn Prompter>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            client,
            prompter,
            config,
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
