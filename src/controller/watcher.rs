//! Builder pod status observation.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::controller::context::RunContext;
use crate::controller::state::{PodLifecycleState, ProvisionedResourceSet};
use crate::manifests::ResolvedIdentities;

/// Polls the builder pod's phase.
pub struct StatusWatcher<'a> {
    ctx: &'a RunContext,
}

impl<'a> StatusWatcher<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Read the pod's current phase once.
    ///
    /// Without a pod created by this run the cluster is not asked at all.
    pub async fn poll(
        &self,
        identities: &ResolvedIdentities,
        provisioned: &ProvisionedResourceSet,
    ) -> PodLifecycleState {
        if !provisioned.pod {
            return PodLifecycleState::Unknown;
        }
        match self.ctx.client.read_pod_phase(&identities.pod).await {
            Ok(phase) => PodLifecycleState::from_phase(phase.as_deref()),
            Err(e) => {
                warn!(pod = %identities.pod, error = %e, "Failed to read pod status");
                PodLifecycleState::Unknown
            }
        }
    }

    /// Give the pod one poll interval to start, then read its phase once.
    ///
    /// A freshly submitted pod always reports `Pending`, so reading straight
    /// away would never observe an early failure.
    pub async fn poll_after_interval(
        &self,
        identities: &ResolvedIdentities,
        provisioned: &ProvisionedResourceSet,
    ) -> PodLifecycleState {
        if !provisioned.pod {
            return PodLifecycleState::Unknown;
        }
        tokio::time::sleep(self.ctx.config.poll_interval).await;
        let state = self.poll(identities, provisioned).await;
        debug!(pod = %identities.pod, state = %state, "Checked builder pod once");
        state
    }

    /// Poll until the pod leaves `Pending`/`Running`.
    ///
    /// Sleeps one poll interval before every read. When a wait timeout is
    /// configured and exceeded, the last observed state is returned.
    pub async fn await_terminal(
        &self,
        identities: &ResolvedIdentities,
        provisioned: &ProvisionedResourceSet,
    ) -> PodLifecycleState {
        if !provisioned.pod {
            return PodLifecycleState::Unknown;
        }

        info!(pod = %identities.pod, "Waiting for builder pod to finish");
        let started = Instant::now();
        let state = loop {
            tokio::time::sleep(self.ctx.config.poll_interval).await;
            let state = self.poll(identities, provisioned).await;
            debug!(pod = %identities.pod, state = %state, "Polled builder pod");
            if state.is_terminal() {
                break state;
            }
            if let Some(timeout) = self.ctx.config.wait_timeout
                && started.elapsed() >= timeout
            {
                warn!(
                    pod = %identities.pod,
                    state = %state,
                    timeout_secs = timeout.as_secs(),
                    "Gave up waiting for builder pod"
                );
                return state;
            }
        };

        match state {
            PodLifecycleState::Succeeded => {
                info!(pod = %identities.pod, "Builder pod succeeded");
            }
            PodLifecycleState::Failed => {
                warn!(pod = %identities.pod, "Builder pod failed");
                self.log_failure(&identities.pod).await;
            }
            _ => {
                warn!(
                    pod = %identities.pod,
                    state = %state,
                    "Builder pod ended in unexpected state"
                );
            }
        }
        state
    }

    async fn log_failure(&self, pod: &str) {
        match self.ctx.client.pod_logs(pod).await {
            Ok(logs) => warn!(pod = %pod, logs = %logs, "Builder pod logs"),
            Err(e) => warn!(pod = %pod, error = %e, "Failed to fetch builder pod logs"),
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
    use std::time::Duration;

    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::cluster::MemoryCluster;
    use crate::cluster::fake::Operation;
    use crate::controller::context::OrchestratorConfig;
    use crate::prompt::ScriptedPrompter;

    fn identities() -> ResolvedIdentities {
        ResolvedIdentities {
            volume: "v".to_string(),
            claim: "c".to_string(),
            pod: "p".to_string(),
        }
    }

    fn with_pod() -> ProvisionedResourceSet {
        ProvisionedResourceSet {
            pod: true,
            ..Default::default()
        }
    }

    fn setup(config: OrchestratorConfig) -> (Arc<MemoryCluster>, RunContext) {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.insert_pod(Pod {
            metadata: ObjectMeta {
                name: Some("p".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        let ctx = RunContext::new(
            cluster.clone(),
            Arc::new(ScriptedPrompter::default()),
            config,
        );
        (cluster, ctx)
    }

    #[tokio::test]
    async fn test_poll_without_pod_skips_cluster() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());
        let state = StatusWatcher::new(&ctx)
            .poll(&identities(), &ProvisionedResourceSet::default())
            .await;
        assert_eq!(state, PodLifecycleState::Unknown);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_poll_read_failure_is_unknown() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());
        cluster.fail_on(Operation::ReadPodPhase);
        let state = StatusWatcher::new(&ctx).poll(&identities(), &with_pod()).await;
        assert_eq!(state, PodLifecycleState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_waits_one_interval() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());
        cluster.script_pod_phases(&["Failed"]);

        let started = Instant::now();
        let state = StatusWatcher::new(&ctx)
            .poll_after_interval(&identities(), &with_pod())
            .await;

        assert_eq!(state, PodLifecycleState::Failed);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(cluster.calls_of(Operation::ReadPodPhase).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_without_pod_does_not_wait() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());

        let started = Instant::now();
        let state = StatusWatcher::new(&ctx)
            .poll_after_interval(&identities(), &ProvisionedResourceSet::default())
            .await;

        assert_eq!(state, PodLifecycleState::Unknown);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_until_succeeded() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());
        cluster.script_pod_phases(&["Pending", "Running", "Running", "Succeeded"]);

        let started = Instant::now();
        let state = StatusWatcher::new(&ctx)
            .await_terminal(&identities(), &with_pod())
            .await;

        assert_eq!(state, PodLifecycleState::Succeeded);
        assert_eq!(cluster.calls_of(Operation::ReadPodPhase).len(), 4);
        assert!(started.elapsed() >= Duration::from_secs(8));
        assert!(cluster.calls_of(Operation::PodLogs).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pod_fetches_logs() {
        let (cluster, ctx) = setup(OrchestratorConfig::default());
        cluster.script_pod_phases(&["Running", "Failed"]);
        cluster.set_pod_logs("error building image");

        let state = StatusWatcher::new(&ctx)
            .await_terminal(&identities(), &with_pod())
            .await;

        assert_eq!(state, PodLifecycleState::Failed);
        assert_eq!(cluster.calls_of(Operation::PodLogs), vec!["pod_logs:p"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_returns_last_state() {
        let config = OrchestratorConfig {
            wait_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let (cluster, ctx) = setup(config);
        cluster.script_pod_phases(&["Running"]);

        let state = StatusWatcher::new(&ctx)
            .await_terminal(&identities(), &with_pod())
            .await;

        assert_eq!(state, PodLifecycleState::Running);
        // Reads at 2s, 4s and 6s; the third exceeds the 5s bound
        assert_eq!(cluster.calls_of(Operation::ReadPodPhase).len(), 3);
    }
}
