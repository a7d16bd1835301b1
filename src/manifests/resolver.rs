//! Name resolution for the resources of a run.
//!
//! Each name is resolved at most once and then memoized, so creation,
//! status checks and teardown always agree on which object they address.

use std::path::Path;
use std::sync::OnceLock;

use jiff::Timestamp;

use crate::controller::error::Result;
use crate::manifests::ManifestSet;

/// Role prefix of generated volume names
pub const VOLUME_ROLE: &str = "workspace-vol";
/// Role prefix of generated claim names
pub const CLAIM_ROLE: &str = "workspace-vol-claim";
/// Role prefix of generated pod names
pub const POD_ROLE: &str = "kaniko-pod";

/// Names used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentities {
    pub volume: String,
    pub claim: String,
    pub pod: String,
}

impl ResolvedIdentities {
    /// Replace the pod name with an explicitly requested one.
    pub fn with_pod_override(mut self, pod_name: Option<&str>) -> Self {
        if let Some(name) = pod_name {
            self.pod = name.to_string();
        }
        self
    }
}

/// Generate `<role>-<unix-seconds>`.
pub fn generated_name(role: &str) -> String {
    format!("{}-{}", role, Timestamp::now().as_second())
}

/// Loads manifests and resolves memoized resource names.
#[derive(Debug, Default)]
pub struct ManifestResolver {
    manifests: ManifestSet,
    volume_name: OnceLock<String>,
    claim_name: OnceLock<String>,
    pod_name: OnceLock<String>,
}

impl ManifestResolver {
    /// Create a resolver over already loaded manifests.
    pub fn new(manifests: ManifestSet) -> Self {
        Self {
            manifests,
            ..Default::default()
        }
    }

    /// Load manifests from `dir` and create a resolver over them.
    pub fn load(dir: &Path, manifest_mode: bool) -> Result<Self> {
        Ok(Self::new(ManifestSet::load(dir, manifest_mode)?))
    }

    pub fn manifests(&self) -> &ManifestSet {
        &self.manifests
    }

    /// Name of the PersistentVolume.
    pub fn volume_name(&self) -> &str {
        self.volume_name.get_or_init(|| {
            self.manifests
                .volume
                .as_ref()
                .and_then(|v| v.metadata.name.clone())
                .unwrap_or_else(|| generated_name(VOLUME_ROLE))
        })
    }

    /// Name of the PersistentVolumeClaim.
    pub fn claim_name(&self) -> &str {
        self.claim_name.get_or_init(|| {
            self.manifests
                .claim
                .as_ref()
                .and_then(|c| c.metadata.name.clone())
                .unwrap_or_else(|| generated_name(CLAIM_ROLE))
        })
    }

    /// Name of the builder Pod (before any explicit override).
    pub fn pod_name(&self) -> &str {
        self.pod_name.get_or_init(|| {
            self.manifests
                .pod
                .as_ref()
                .and_then(|p| p.metadata.name.clone())
                .unwrap_or_else(|| generated_name(POD_ROLE))
        })
    }

    /// Resolve all three names.
    pub fn resolve(&self) -> ResolvedIdentities {
        ResolvedIdentities {
            volume: self.volume_name().to_string(),
            claim: self.claim_name().to_string(),
            pod: self.pod_name().to_string(),
        }
    }
}
