//! One build run, start to finish.
//!
//! ```text
//! validate -> load manifests -> classify context -> resolve names
//!   -> volume + claim        (local context only)
//!   -> credential secret     (push only)
//!   -> builder pod
//!   -> wait / single poll    (per wait and delete flags)
//!   -> teardown
//! ```
//!
//! Everything that can make a run pointless (bad request, unreadable
//! manifests, missing build file) fails before the first cluster call.
//! After that, cluster failures are logged and the run carries on to
//! teardown.

use tracing::{info, instrument};

use crate::build::{BuildRequest, classify};
use crate::controller::context::RunContext;
use crate::controller::error::Result;
use crate::controller::launcher::PodLauncher;
use crate::controller::provisioner::ResourceProvisioner;
use crate::controller::state::{PodLifecycleState, ProvisionedResourceSet};
use crate::controller::teardown::{TeardownCoordinator, TeardownReport};
use crate::controller::watcher::StatusWatcher;
use crate::manifests::{ManifestResolver, ResolvedIdentities};
use crate::resources::ProvisionStrategy;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub identities: ResolvedIdentities,
    pub provisioned: ProvisionedResourceSet,
    pub final_status: PodLifecycleState,
    pub teardown: TeardownReport,
}

/// Sequences provisioning, launch, observation and teardown.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Execute one run.
    ///
    /// Returns an error only for configuration problems, all of which are
    /// detected before the cluster is touched.
    #[instrument(skip_all, fields(context = %request.context, push = request.push))]
    pub async fn run(&self, request: &BuildRequest) -> Result<RunReport> {
        request.validate()?;
        let resolver =
            ManifestResolver::load(&self.ctx.config.manifest_dir, request.manifest_mode)?;
        let context_kind = classify(request)?;

        let identities = resolver
            .resolve()
            .with_pod_override(request.pod_name.as_deref());
        info!(
            volume = %identities.volume,
            claim = %identities.claim,
            pod = %identities.pod,
            namespace = %self.ctx.config.namespace,
            "Resolved resource names"
        );

        let strategy = ProvisionStrategy::for_manifest_mode(request.manifest_mode);
        let provisioner = ResourceProvisioner::new(&self.ctx, strategy);

        let mut provisioned = if context_kind.needs_storage() {
            provisioner
                .provision_storage(&identities, resolver.manifests(), request.storage)
                .await
        } else {
            info!(context = %request.context, "Context is not local, skipping storage");
            ProvisionedResourceSet::default()
        };

        let credentials = provisioner.provision_credential_secret(request).await;
        provisioned.secret = credentials.created;

        provisioned.pod = PodLauncher::new(&self.ctx)
            .launch(
                &identities,
                &provisioned,
                request,
                credentials.registry_user.as_deref(),
            )
            .await;

        let watcher = StatusWatcher::new(&self.ctx);
        let final_status = if request.wait {
            watcher.await_terminal(&identities, &provisioned).await
        } else if request.delete_on_finish {
            watcher
                .poll_after_interval(&identities, &provisioned)
                .await
        } else {
            PodLifecycleState::Unknown
        };

        let teardown = TeardownCoordinator::new(&self.ctx)
            .teardown(&identities, &provisioned, request, final_status)
            .await;

        info!(
            final_status = %final_status,
            pod_deleted = teardown.pod_deleted,
            claim_deleted = teardown.claim_deleted,
            volume_deleted = teardown.volume_deleted,
            "Run finished"
        );

        Ok(RunReport {
            identities,
            provisioned,
            final_status,
            teardown,
        })
    }
}
