//! Storage and credential provisioning.
//!
//! Creates the PersistentVolume, the PersistentVolumeClaim and the registry
//! credential Secret in dependency order. A rejected create call is logged
//! and leaves its flag unset; nothing already created is rolled back, since
//! teardown only ever deletes what the flags record.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::build::{BuildRequest, StorageSizes};
use crate::controller::context::RunContext;
use crate::controller::error::{Error, Result};
use crate::controller::state::ProvisionedResourceSet;
use crate::manifests::{ManifestSet, ResolvedIdentities};
use crate::prompt::Prompter;
use crate::resources::ProvisionStrategy;
use crate::resources::claim::generate_claim;
use crate::resources::secret::{RegistryLogin, generate_registry_secret};
use crate::resources::volume::generate_volume;

/// Outcome of the credential step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSecret {
    /// The secret was created by this run
    pub created: bool,
    /// Registry user to push as, from the request or the prompt
    pub registry_user: Option<String>,
}

/// Creates the resources a build depends on.
pub struct ResourceProvisioner<'a> {
    ctx: &'a RunContext,
    strategy: ProvisionStrategy,
}

impl<'a> ResourceProvisioner<'a> {
    pub fn new(ctx: &'a RunContext, strategy: ProvisionStrategy) -> Self {
        Self { ctx, strategy }
    }

    /// Create the volume, then the claim, letting each settle.
    ///
    /// Returns the flags of what was created; the pod and secret flags are
    /// always unset.
    pub async fn provision_storage(
        &self,
        identities: &ResolvedIdentities,
        manifests: &ManifestSet,
        sizes: StorageSizes,
    ) -> ProvisionedResourceSet {
        let mut provisioned = ProvisionedResourceSet::default();
        let client = &self.ctx.client;

        let volume = generate_volume(
            &identities.volume,
            manifests.volume.as_ref(),
            sizes.volume_gi,
            self.strategy,
        );
        info!(
            volume = %identities.volume,
            strategy = %self.strategy,
            "Creating PersistentVolume"
        );
        match client.create_volume(&volume).await {
            Ok(_) => {
                provisioned.volume = true;
                info!(volume = %identities.volume, "PersistentVolume created");
            }
            Err(e) => {
                warn!(volume = %identities.volume, error = %e, "Failed to create PersistentVolume");
            }
        }
        tokio::time::sleep(self.ctx.config.settle_delay).await;

        // Only a volume created by this run is known to be free for the claim
        let pin = (provisioned.volume && self.strategy == ProvisionStrategy::Generated)
            .then_some(identities.volume.as_str());
        let claim = generate_claim(
            &identities.claim,
            manifests.claim.as_ref(),
            sizes.claim_gi,
            pin,
            self.strategy,
        );
        info!(claim = %identities.claim, "Creating PersistentVolumeClaim");
        match client.create_claim(&claim).await {
            Ok(_) => {
                provisioned.claim = true;
                info!(claim = %identities.claim, "PersistentVolumeClaim created");
            }
            Err(e) => {
                warn!(
                    claim = %identities.claim,
                    error = %e,
                    "Failed to create PersistentVolumeClaim"
                );
            }
        }
        tokio::time::sleep(self.ctx.config.settle_delay).await;

        if provisioned.claim {
            self.check_claim_phase(&identities.claim).await;
        }

        provisioned
    }

    async fn check_claim_phase(&self, claim: &str) {
        match self.ctx.client.read_claim_phase(claim).await {
            Ok(Some(phase)) if phase == "Bound" => {
                info!(claim = %claim, phase = %phase, "PersistentVolumeClaim bound");
            }
            Ok(phase) => {
                warn!(
                    claim = %claim,
                    phase = phase.as_deref().unwrap_or("<none>"),
                    "PersistentVolumeClaim not bound yet"
                );
            }
            Err(e) => {
                warn!(claim = %claim, error = %e, "Failed to read PersistentVolumeClaim status");
            }
        }
    }

    /// Ensure the registry credential secret exists.
    ///
    /// An existing secret is reused as is. The password is always collected
    /// interactively; email and username only when the request lacks them
    /// and manifest mode is off.
    pub async fn provision_credential_secret(&self, request: &BuildRequest) -> CredentialSecret {
        let mut outcome = CredentialSecret {
            created: false,
            registry_user: request.credentials.username.clone(),
        };
        if !request.push {
            return outcome;
        }

        let secret_name = &self.ctx.config.secret_name;
        match self.ctx.client.list_secret_names().await {
            Ok(names) if names.iter().any(|n| n == secret_name) => {
                info!(secret = %secret_name, "Registry secret already exists, skipping");
                return outcome;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(secret = %secret_name, error = %e, "Failed to list secrets");
                return outcome;
            }
        }

        let login = match self.collect_login(request).await {
            Ok(login) => login,
            Err(e) => {
                warn!(secret = %secret_name, error = %e, "Failed to collect registry credentials");
                return outcome;
            }
        };
        if !login.username.is_empty() {
            outcome.registry_user = Some(login.username.clone());
        }

        let registry_host = &self.ctx.config.registry_host;
        let secret = match generate_registry_secret(secret_name, registry_host, &login) {
            Ok(secret) => secret,
            Err(e) => {
                warn!(secret = %secret_name, error = %e, "Failed to encode registry credentials");
                return outcome;
            }
        };

        info!(secret = %secret_name, "Creating registry secret");
        match self.ctx.client.create_secret(&secret).await {
            Ok(_) => {
                outcome.created = true;
                info!(secret = %secret_name, "Registry secret created");
            }
            Err(e) => {
                warn!(secret = %secret_name, error = %e, "Failed to create registry secret");
            }
        }
        outcome
    }

    /// Ask for whatever login details the request lacks.
    ///
    /// The terminal prompts block, so they run on the blocking pool.
    async fn collect_login(&self, request: &BuildRequest) -> Result<RegistryLogin> {
        let prompter = Arc::clone(&self.ctx.prompter);
        let email = request.credentials.email.clone();
        let username = request.credentials.username.clone();
        let manifest_mode = request.manifest_mode;

        tokio::task::spawn_blocking(move || {
            read_login(prompter.as_ref(), email, username, manifest_mode)
        })
        .await
        .map_err(|e| Error::Prompt(format!("prompt task failed: {}", e)))?
    }
}

fn read_login(
    prompter: &dyn Prompter,
    mut email: Option<String>,
    mut username: Option<String>,
    manifest_mode: bool,
) -> Result<RegistryLogin> {
    if !manifest_mode {
        if email.is_none() {
            email = Some(prompter.input("Enter docker email")?);
        }
        if username.is_none() {
            username = Some(prompter.input("Enter docker username")?);
        }
    } else {
        debug!("Manifest mode, not prompting for email or username");
    }
    let password = prompter.password("Enter docker password")?;

    Ok(RegistryLogin {
        username: username.unwrap_or_default(),
        password,
        email: email.unwrap_or_default(),
    })
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

    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::cluster::MemoryCluster;
    use crate::cluster::fake::Operation;
    use crate::controller::context::OrchestratorConfig;
    use crate::prompt::ScriptedPrompter;

    fn identities() -> ResolvedIdentities {
        ResolvedIdentities {
            volume: "workspace-vol-1".to_string(),
            claim: "workspace-vol-claim-1".to_string(),
            pod: "kaniko-pod-1".to_string(),
        }
    }

    fn context(cluster: &Arc<MemoryCluster>, answers: &[&str]) -> RunContext {
        let config = OrchestratorConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        RunContext::new(
            cluster.clone(),
            Arc::new(ScriptedPrompter::new(answers)),
            config,
        )
    }

    #[tokio::test]
    async fn test_storage_created_in_order() {
        let cluster = Arc::new(MemoryCluster::new());
        let ctx = context(&cluster, &[]);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);

        let provisioned = provisioner
            .provision_storage(&identities(), &ManifestSet::default(), StorageSizes::default())
            .await;

        assert!(provisioned.volume);
        assert!(provisioned.claim);
        assert!(!provisioned.pod);
        assert_eq!(
            cluster.calls(),
            vec![
                "create_volume:workspace-vol-1",
                "create_claim:workspace-vol-claim-1",
                "read_claim_phase:workspace-vol-claim-1",
            ]
        );
        let claim = &cluster.claims()[0];
        assert_eq!(
            claim.spec.as_ref().unwrap().volume_name.as_deref(),
            Some("workspace-vol-1")
        );
    }

    #[tokio::test]
    async fn test_failed_volume_still_attempts_claim() {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.fail_on(Operation::CreateVolume);
        let ctx = context(&cluster, &[]);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);

        let provisioned = provisioner
            .provision_storage(&identities(), &ManifestSet::default(), StorageSizes::default())
            .await;

        assert!(!provisioned.volume);
        assert!(provisioned.claim);
        // Not pinned to a volume this run does not own
        let claim = &cluster.claims()[0];
        assert!(claim.spec.as_ref().unwrap().volume_name.is_none());
    }

    #[tokio::test]
    async fn test_secret_skipped_without_push() {
        let cluster = Arc::new(MemoryCluster::new());
        let ctx = context(&cluster, &[]);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);

        let outcome = provisioner
            .provision_credential_secret(&BuildRequest::new("./app"))
            .await;

        assert!(!outcome.created);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_secret_is_reused() {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.insert_secret(Secret {
            metadata: ObjectMeta {
                name: Some("docker-registry-secret".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        let ctx = context(&cluster, &[]);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);
        let request = BuildRequest::new("./app").push_to("app").username("alice");

        let outcome = provisioner.provision_credential_secret(&request).await;

        assert!(!outcome.created);
        assert_eq!(outcome.registry_user.as_deref(), Some("alice"));
        assert!(cluster.calls_of(Operation::CreateSecret).is_empty());
    }

    #[tokio::test]
    async fn test_prompts_for_missing_identity() {
        let cluster = Arc::new(MemoryCluster::new());
        let prompter = Arc::new(ScriptedPrompter::new(&["bob@example.com", "bob", "pw"]));
        let config = OrchestratorConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        let ctx = RunContext::new(cluster.clone(), prompter.clone(), config);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);
        let request = BuildRequest::new("./app").push_to("app");

        let outcome = provisioner.provision_credential_secret(&request).await;

        assert!(outcome.created);
        assert_eq!(outcome.registry_user.as_deref(), Some("bob"));
        assert_eq!(prompter.asked().len(), 3);
        assert_eq!(cluster.secrets().len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_failure_creates_nothing() {
        let cluster = Arc::new(MemoryCluster::new());
        let ctx = context(&cluster, &[]);
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);
        let request = BuildRequest::new("./app")
            .push_to("app")
            .username("alice")
            .email("alice@example.com");

        let outcome = provisioner.provision_credential_secret(&request).await;

        assert!(!outcome.created);
        assert!(cluster.secrets().is_empty());
    }

    /// Records the thread each prompt ran on.
    #[derive(Default)]
    struct ThreadRecordingPrompter {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl Prompter for ThreadRecordingPrompter {
        fn input(&self, _label: &str) -> Result<String> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok("carol".to_string())
        }

        fn password(&self, label: &str) -> Result<String> {
            self.input(label)
        }
    }

    #[tokio::test]
    async fn test_prompts_run_off_the_runtime_thread() {
        let cluster = Arc::new(MemoryCluster::new());
        let prompter = Arc::new(ThreadRecordingPrompter::default());
        let ctx = RunContext::new(cluster.clone(), prompter.clone(), OrchestratorConfig::default());
        let provisioner = ResourceProvisioner::new(&ctx, ProvisionStrategy::Generated);
        let request = BuildRequest::new("./app").push_to("app");

        let outcome = provisioner.provision_credential_secret(&request).await;

        assert!(outcome.created);
        let threads = prompter.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 3);
        let runtime_thread = std::thread::current().id();
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }
}
