//! Cluster access for the build orchestrator.
//!
//! Every cluster call made by a run goes through the [`ClusterClient`] trait,
//! which keeps the orchestration logic independent of the transport.
//!
//! ## Implementations
//!
//! - `kube_client`: [`KubeClusterClient`], backed by `kube::Api`
//! - `fake`: `MemoryCluster`, an in-memory cluster for tests (`testing` feature)

#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod kube_client;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret};
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub use fake::MemoryCluster;
pub use kube_client::KubeClusterClient;

/// Error type for cluster operations
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The object could not be created because one with the same name exists
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// The object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// Any other Kubernetes API or transport error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// The cluster could not be reached
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClusterError {
    /// Check if this error indicates the object already exists
    pub fn is_already_exists(&self) -> bool {
        match self {
            ClusterError::AlreadyExists { .. } => true,
            ClusterError::Api(kube::Error::Api(e)) => e.code == 409,
            _ => false,
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            ClusterError::NotFound { .. } => true,
            ClusterError::Api(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    /// Classify a raw kube error for an object of the given kind and name.
    pub fn from_kube(kind: &'static str, name: &str, err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(e) if e.code == 409 => ClusterError::AlreadyExists {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(e) if e.code == 404 => ClusterError::NotFound {
                kind,
                name: name.to_string(),
            },
            _ => ClusterError::Api(err),
        }
    }
}

/// Result type alias for cluster operations
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Operations the orchestrator needs from the cluster.
///
/// PersistentVolumes are cluster-scoped; every other object lives in the
/// namespace the implementation was created for.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create a PersistentVolume.
    async fn create_volume(&self, volume: &PersistentVolume) -> ClusterResult<PersistentVolume>;

    /// Delete a PersistentVolume by name.
    async fn delete_volume(&self, name: &str) -> ClusterResult<()>;

    /// Create a PersistentVolumeClaim.
    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim>;

    /// Read `status.phase` of a PersistentVolumeClaim.
    async fn read_claim_phase(&self, name: &str) -> ClusterResult<Option<String>>;

    /// Delete a PersistentVolumeClaim by name.
    async fn delete_claim(&self, name: &str) -> ClusterResult<()>;

    /// List the names of all secrets in the namespace.
    async fn list_secret_names(&self) -> ClusterResult<Vec<String>>;

    /// Create a Secret.
    async fn create_secret(&self, secret: &Secret) -> ClusterResult<Secret>;

    /// Create a Pod.
    async fn create_pod(&self, pod: &Pod) -> ClusterResult<Pod>;

    /// Read `status.phase` of a Pod.
    async fn read_pod_phase(&self, name: &str) -> ClusterResult<Option<String>>;

    /// Fetch the logs of a Pod's container.
    async fn pod_logs(&self, name: &str) -> ClusterResult<String>;

    /// List the names of all pods in the namespace.
    async fn list_pod_names(&self) -> ClusterResult<Vec<String>>;

    /// Delete a Pod by name.
    async fn delete_pod(&self, name: &str) -> ClusterResult<()>;
}
