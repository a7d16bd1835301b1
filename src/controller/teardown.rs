//! Outcome-dependent cleanup.
//!
//! The decision ([`TeardownCoordinator::plan`]) is pure and separate from the
//! deletions it drives. Rules:
//!
//! | wait | delete | pod deleted when |
//! |------|--------|------------------|
//! | yes | yes | always, if it still exists |
//! | no | yes | final status is `Failed` |
//! | any | no | never |
//!
//! The claim and volume are deleted whenever this run created them, claim
//! first. The credential secret is never deleted.

use tracing::{info, warn};

use crate::build::BuildRequest;
use crate::controller::context::RunContext;
use crate::controller::state::{PodLifecycleState, ProvisionedResourceSet};
use crate::manifests::ResolvedIdentities;

/// Deletions decided for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownPlan {
    pub delete_pod: bool,
    /// List pods first and skip the delete if the pod is already gone
    pub verify_pod_exists: bool,
    pub delete_claim: bool,
    pub delete_volume: bool,
}

impl TeardownPlan {
    pub fn is_empty(&self) -> bool {
        !(self.delete_pod || self.delete_claim || self.delete_volume)
    }
}

/// Deletions that actually went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub pod_deleted: bool,
    pub claim_deleted: bool,
    pub volume_deleted: bool,
    /// One message per failed deletion
    pub failures: Vec<String>,
}

/// Decides and performs cleanup at the end of a run.
pub struct TeardownCoordinator<'a> {
    ctx: &'a RunContext,
}

impl<'a> TeardownCoordinator<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Decide what to delete.
    pub fn plan(
        provisioned: &ProvisionedResourceSet,
        request: &BuildRequest,
        final_status: PodLifecycleState,
    ) -> TeardownPlan {
        let delete_pod = provisioned.pod
            && request.delete_on_finish
            && (request.wait || final_status == PodLifecycleState::Failed);

        TeardownPlan {
            delete_pod,
            verify_pod_exists: delete_pod && request.wait,
            delete_claim: provisioned.claim,
            delete_volume: provisioned.volume,
        }
    }

    /// Perform the planned deletions.
    ///
    /// A failed deletion is logged and does not stop the remaining ones.
    pub async fn teardown(
        &self,
        identities: &ResolvedIdentities,
        provisioned: &ProvisionedResourceSet,
        request: &BuildRequest,
        final_status: PodLifecycleState,
    ) -> TeardownReport {
        let plan = Self::plan(provisioned, request, final_status);
        let mut report = TeardownReport::default();
        if plan.is_empty() {
            info!(final_status = %final_status, "Nothing to clean up");
            return report;
        }
        let client = &self.ctx.client;

        if plan.delete_pod && self.pod_still_exists(&identities.pod, plan).await {
            info!(pod = %identities.pod, final_status = %final_status, "Deleting builder pod");
            match client.delete_pod(&identities.pod).await {
                Ok(()) => report.pod_deleted = true,
                Err(e) => {
                    warn!(pod = %identities.pod, error = %e, "Failed to delete builder pod");
                    report.failures.push(e.to_string());
                }
            }
        }

        if plan.delete_claim {
            info!(claim = %identities.claim, "Deleting PersistentVolumeClaim");
            match client.delete_claim(&identities.claim).await {
                Ok(()) => report.claim_deleted = true,
                Err(e) => {
                    warn!(
                        claim = %identities.claim,
                        error = %e,
                        "Failed to delete PersistentVolumeClaim"
                    );
                    report.failures.push(e.to_string());
                }
            }
        }

        if plan.delete_volume {
            info!(volume = %identities.volume, "Deleting PersistentVolume");
            match client.delete_volume(&identities.volume).await {
                Ok(()) => report.volume_deleted = true,
                Err(e) => {
                    warn!(
                        volume = %identities.volume,
                        error = %e,
                        "Failed to delete PersistentVolume"
                    );
                    report.failures.push(e.to_string());
                }
            }
        }

        report
    }

    async fn pod_still_exists(&self, pod: &str, plan: TeardownPlan) -> bool {
        if !plan.verify_pod_exists {
            return true;
        }
        match self.ctx.client.list_pod_names().await {
            Ok(names) => {
                let exists = names.iter().any(|n| n == pod);
                if !exists {
                    info!(pod = %pod, "Builder pod already gone");
                }
                exists
            }
            Err(e) => {
                // Attempt the delete anyway; a missing pod only costs a warning
                warn!(pod = %pod, error = %e, "Failed to list pods");
                true
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use std::sync::Arc;

    use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::cluster::fake::Operation;
    use crate::cluster::{ClusterClient, MemoryCluster};
    use crate::controller::context::OrchestratorConfig;
    use crate::prompt::ScriptedPrompter;

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn all_provisioned() -> ProvisionedResourceSet {
        ProvisionedResourceSet {
            volume: true,
            claim: true,
            pod: true,
            secret: true,
        }
    }

    fn identities() -> ResolvedIdentities {
        ResolvedIdentities {
            volume: "v".to_string(),
            claim: "c".to_string(),
            pod: "p".to_string(),
        }
    }

    async fn seeded() -> (Arc<MemoryCluster>, RunContext) {
        let cluster = Arc::new(MemoryCluster::new());
        cluster
            .create_volume(&PersistentVolume {
                metadata: meta("v"),
                ..Default::default()
            })
            .await
            .unwrap();
        cluster
            .create_claim(&PersistentVolumeClaim {
                metadata: meta("c"),
                ..Default::default()
            })
            .await
            .unwrap();
        cluster
            .create_pod(&Pod {
                metadata: meta("p"),
                ..Default::default()
            })
            .await
            .unwrap();
        let ctx = RunContext::new(
            cluster.clone(),
            Arc::new(ScriptedPrompter::default()),
            OrchestratorConfig::default(),
        );
        (cluster, ctx)
    }

    #[test]
    fn test_plan_without_delete_keeps_pod() {
        let request = BuildRequest::new("./app").wait(true);
        let plan = TeardownCoordinator::plan(
            &all_provisioned(),
            &request,
            PodLifecycleState::Failed,
        );
        assert!(!plan.delete_pod);
        assert!(plan.delete_claim);
        assert!(plan.delete_volume);
    }

    #[test]
    fn test_plan_no_wait_deletes_only_failed_pod() {
        let request = BuildRequest::new("./app").delete_on_finish(true);
        let failed =
            TeardownCoordinator::plan(&all_provisioned(), &request, PodLifecycleState::Failed);
        let running =
            TeardownCoordinator::plan(&all_provisioned(), &request, PodLifecycleState::Running);
        assert!(failed.delete_pod);
        assert!(!failed.verify_pod_exists);
        assert!(!running.delete_pod);
    }

    #[test]
    fn test_plan_skips_unowned_resources() {
        let request = BuildRequest::new("./app").wait(true).delete_on_finish(true);
        let plan = TeardownCoordinator::plan(
            &ProvisionedResourceSet::default(),
            &request,
            PodLifecycleState::Succeeded,
        );
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_order_claim_before_volume() {
        let (cluster, ctx) = seeded().await;
        let request = BuildRequest::new("./app").wait(true).delete_on_finish(true);

        let report = TeardownCoordinator::new(&ctx)
            .teardown(
                &identities(),
                &all_provisioned(),
                &request,
                PodLifecycleState::Succeeded,
            )
            .await;

        assert!(report.pod_deleted && report.claim_deleted && report.volume_deleted);
        let deletes: Vec<String> = cluster
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("delete_") || c.starts_with("list_pods"))
            .collect();
        assert_eq!(
            deletes,
            vec!["list_pods:*", "delete_pod:p", "delete_claim:c", "delete_volume:v"]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_deletes() {
        let (cluster, ctx) = seeded().await;
        cluster.fail_on(Operation::DeleteClaim);
        let request = BuildRequest::new("./app");

        let report = TeardownCoordinator::new(&ctx)
            .teardown(
                &identities(),
                &all_provisioned(),
                &request,
                PodLifecycleState::Succeeded,
            )
            .await;

        assert!(!report.claim_deleted);
        assert!(report.volume_deleted);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(cluster.claims().len(), 1);
        assert!(cluster.volumes().is_empty());
    }

    #[tokio::test]
    async fn test_pod_already_gone_is_skipped() {
        let (cluster, ctx) = seeded().await;
        cluster.delete_pod("p").await.unwrap();
        let request = BuildRequest::new("./app").wait(true).delete_on_finish(true);

        let report = TeardownCoordinator::new(&ctx)
            .teardown(
                &identities(),
                &all_provisioned(),
                &request,
                PodLifecycleState::Succeeded,
            )
            .await;

        assert!(!report.pod_deleted);
        assert!(report.failures.is_empty());
        // Only the explicit delete above
        assert_eq!(cluster.calls_of(Operation::DeletePod).len(), 1);
    }
}
