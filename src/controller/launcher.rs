//! Builder pod submission.

use jiff::Timestamp;
use tracing::{info, warn};

use crate::build::BuildRequest;
use crate::controller::context::RunContext;
use crate::controller::state::ProvisionedResourceSet;
use crate::manifests::ResolvedIdentities;
use crate::resources::pod::{BuilderPodParams, Destination, generate_builder_pod};

/// Container name prefix; the unix timestamp is appended
const CONTAINER_PREFIX: &str = "kaniko-cont";

/// Submits the Kaniko builder pod.
pub struct PodLauncher<'a> {
    ctx: &'a RunContext,
}

impl<'a> PodLauncher<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Create the builder pod. Returns whether the cluster accepted it.
    ///
    /// The context claim is mounted only when this run provisioned it.
    pub async fn launch(
        &self,
        identities: &ResolvedIdentities,
        provisioned: &ProvisionedResourceSet,
        request: &BuildRequest,
        registry_user: Option<&str>,
    ) -> bool {
        let destination = destination(request, registry_user);
        let container_name = format!("{}-{}", CONTAINER_PREFIX, Timestamp::now().as_second());

        let pod = generate_builder_pod(&BuilderPodParams {
            pod_name: &identities.pod,
            container_name: &container_name,
            image: &self.ctx.config.builder_image,
            context: &request.context,
            build_file: &request.build_file,
            destination,
            secret_name: &self.ctx.config.secret_name,
            claim_name: provisioned.claim.then_some(identities.claim.as_str()),
        });

        info!(
            pod = %identities.pod,
            image = %self.ctx.config.builder_image,
            with_storage = provisioned.claim,
            "Creating builder pod"
        );
        match self.ctx.client.create_pod(&pod).await {
            Ok(_) => {
                info!(pod = %identities.pod, "Builder pod created");
                true
            }
            Err(e) => {
                warn!(pod = %identities.pod, error = %e, "Failed to create builder pod");
                false
            }
        }
    }
}

fn destination(request: &BuildRequest, registry_user: Option<&str>) -> Destination {
    if !request.push {
        return Destination::NoPush;
    }
    let Some(repo) = request.credentials.repo.as_deref() else {
        // Rejected by BuildRequest::validate before a run starts
        warn!("Push requested without a repository, building without push");
        return Destination::NoPush;
    };
    if registry_user.is_none() {
        warn!(repo = %repo, "No registry user known, pushing to repository without user prefix");
    }
    Destination::push(registry_user, repo)
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

    use super::*;
    use crate::cluster::MemoryCluster;
    use crate::cluster::fake::Operation;
    use crate::controller::context::OrchestratorConfig;
    use crate::prompt::ScriptedPrompter;

    fn identities() -> ResolvedIdentities {
        ResolvedIdentities {
            volume: "v".to_string(),
            claim: "c".to_string(),
            pod: "kaniko-pod-7".to_string(),
        }
    }

    fn context(cluster: &Arc<MemoryCluster>) -> RunContext {
        RunContext::new(
            cluster.clone(),
            Arc::new(ScriptedPrompter::default()),
            OrchestratorConfig::default(),
        )
    }

    #[test]
    fn test_destination_variants() {
        let build_only = BuildRequest::new("./app");
        assert_eq!(destination(&build_only, Some("alice")), Destination::NoPush);

        let push = BuildRequest::new("./app").push_to("app");
        assert_eq!(
            destination(&push, Some("alice")),
            Destination::Push("alice/app".to_string())
        );
        assert_eq!(destination(&push, None), Destination::Push("app".to_string()));
    }

    #[tokio::test]
    async fn test_launch_mounts_claim_when_provisioned() {
        let cluster = Arc::new(MemoryCluster::new());
        let ctx = context(&cluster);
        let provisioned = ProvisionedResourceSet {
            volume: true,
            claim: true,
            ..Default::default()
        };

        let launched = PodLauncher::new(&ctx)
            .launch(&identities(), &provisioned, &BuildRequest::new("./app"), None)
            .await;

        assert!(launched);
        let pod = &cluster.pods()[0];
        let spec = pod.spec.as_ref().unwrap();
        assert!(spec.containers[0].name.starts_with("kaniko-cont-"));
        assert_eq!(spec.volumes.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.fail_on(Operation::CreatePod);
        let ctx = context(&cluster);

        let launched = PodLauncher::new(&ctx)
            .launch(
                &identities(),
                &ProvisionedResourceSet::default(),
                &BuildRequest::new("git://example/app.git"),
                None,
            )
            .await;

        assert!(!launched);
        assert!(cluster.pods().is_empty());
    }
}
