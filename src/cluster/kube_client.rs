//! `kube`-backed implementation of [`ClusterClient`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use super::{ClusterClient, ClusterError, ClusterResult};

/// Field manager recorded on every object this tool creates
pub const FIELD_MANAGER: &str = "kaniko-deploy";

/// Cluster client talking to the Kubernetes API server.
pub struct KubeClusterClient {
    volumes: Api<PersistentVolume>,
    claims: Api<PersistentVolumeClaim>,
    secrets: Api<Secret>,
    pods: Api<Pod>,
}

impl KubeClusterClient {
    /// Create a client scoped to `namespace` (PersistentVolumes stay cluster-wide).
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            volumes: Api::all(client.clone()),
            claims: Api::namespaced(client.clone(), namespace),
            secrets: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client, namespace),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_volume(&self, volume: &PersistentVolume) -> ClusterResult<PersistentVolume> {
        let name = volume.name_any();
        debug!(name = %name, "POST PersistentVolume");
        self.volumes
            .create(&Self::post_params(), volume)
            .await
            .map_err(|e| ClusterError::from_kube("PersistentVolume", &name, e))
    }

    async fn delete_volume(&self, name: &str) -> ClusterResult<()> {
        debug!(name = %name, "DELETE PersistentVolume");
        self.volumes
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube("PersistentVolume", name, e))
    }

    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        let name = claim.name_any();
        debug!(name = %name, "POST PersistentVolumeClaim");
        self.claims
            .create(&Self::post_params(), claim)
            .await
            .map_err(|e| ClusterError::from_kube("PersistentVolumeClaim", &name, e))
    }

    async fn read_claim_phase(&self, name: &str) -> ClusterResult<Option<String>> {
        let claim = self
            .claims
            .get_status(name)
            .await
            .map_err(|e| ClusterError::from_kube("PersistentVolumeClaim", name, e))?;
        Ok(claim.status.and_then(|s| s.phase))
    }

    async fn delete_claim(&self, name: &str) -> ClusterResult<()> {
        debug!(name = %name, "DELETE PersistentVolumeClaim");
        self.claims
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube("PersistentVolumeClaim", name, e))
    }

    async fn list_secret_names(&self) -> ClusterResult<Vec<String>> {
        let list = self.secrets.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(|s| s.name_any()).collect())
    }

    async fn create_secret(&self, secret: &Secret) -> ClusterResult<Secret> {
        let name = secret.name_any();
        debug!(name = %name, "POST Secret");
        self.secrets
            .create(&Self::post_params(), secret)
            .await
            .map_err(|e| ClusterError::from_kube("Secret", &name, e))
    }

    async fn create_pod(&self, pod: &Pod) -> ClusterResult<Pod> {
        let name = pod.name_any();
        debug!(name = %name, "POST Pod");
        self.pods
            .create(&Self::post_params(), pod)
            .await
            .map_err(|e| ClusterError::from_kube("Pod", &name, e))
    }

    async fn read_pod_phase(&self, name: &str) -> ClusterResult<Option<String>> {
        let pod = self
            .pods
            .get_status(name)
            .await
            .map_err(|e| ClusterError::from_kube("Pod", name, e))?;
        Ok(pod.status.and_then(|s| s.phase))
    }

    async fn pod_logs(&self, name: &str) -> ClusterResult<String> {
        self.pods
            .logs(name, &LogParams::default())
            .await
            .map_err(|e| ClusterError::from_kube("Pod", name, e))
    }

    async fn list_pod_names(&self) -> ClusterResult<Vec<String>> {
        let list = self.pods.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(|p| p.name_any()).collect())
    }

    async fn delete_pod(&self, name: &str) -> ClusterResult<()> {
        debug!(name = %name, "DELETE Pod");
        self.pods
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube("Pod", name, e))
    }
}
