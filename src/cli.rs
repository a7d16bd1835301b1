//! Command-line interface.
//!
//! `kaniko-deploy deploy [options]`. Option names are kebab-case; the
//! snake_case spellings (`--context_dir`, `--no_push`, ...) are accepted as
//! aliases.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::build::{BuildRequest, DEFAULT_BUILD_FILE, DEFAULT_STORAGE_GI, StorageSizes};
use crate::controller::OrchestratorConfig;
use crate::controller::context::DEFAULT_NAMESPACE;
use crate::resources::pod::DEFAULT_BUILDER_IMAGE;

/// Build container images in Kubernetes with Kaniko
#[derive(Debug, Parser)]
#[command(name = "kaniko-deploy", version, about)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision storage, run the builder pod and clean up
    Deploy(DeployArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Build context: a local directory or a remote reference (git://, s3://, ...)
    #[arg(long, alias = "context_dir")]
    pub context_dir: String,

    /// Build file name inside the context
    #[arg(long, alias = "docker_filepath", default_value = DEFAULT_BUILD_FILE)]
    pub docker_filepath: String,

    /// Build the image without pushing it
    #[arg(long, alias = "no_push")]
    pub no_push: bool,

    /// Registry user; prompted for when pushing without it
    #[arg(long, alias = "docker_username")]
    pub docker_username: Option<String>,

    /// Registry email; prompted for when pushing without it
    #[arg(long, alias = "docker_email")]
    pub docker_email: Option<String>,

    /// Repository the image is pushed to
    #[arg(long, alias = "docker_repo")]
    pub docker_repo: Option<String>,

    /// Create volume and claim from volume.yaml and volume-claim.yaml as authored
    #[arg(long, alias = "read_manifest")]
    pub read_manifest: bool,

    /// Directory holding the manifests
    #[arg(long, default_value = ".")]
    pub manifest_dir: PathBuf,

    /// Builder pod name (default: from pod-kaniko.yaml, else kaniko-pod-<timestamp>)
    #[arg(long, alias = "pod_name")]
    pub pod_name: Option<String>,

    /// Claim storage request in Gi
    #[arg(long, alias = "pvc_storage", default_value_t = DEFAULT_STORAGE_GI)]
    pub pvc_storage: u32,

    /// Volume capacity in Gi
    #[arg(long, alias = "pv_cap", default_value_t = DEFAULT_STORAGE_GI)]
    pub pv_cap: u32,

    /// Wait until the builder pod leaves Pending/Running
    #[arg(long, alias = "wait_for_pod")]
    pub wait_for_pod: bool,

    /// Delete the builder pod at the end (best combined with --wait-for-pod)
    #[arg(long, alias = "pod_delete")]
    pub pod_delete: bool,

    /// Give up waiting after this many seconds
    #[arg(long)]
    pub wait_timeout: Option<u64>,

    /// Namespace for claims, secrets and pods
    #[arg(long, env = "KANIKO_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Kaniko executor image
    #[arg(long, env = "KANIKO_IMAGE", default_value = DEFAULT_BUILDER_IMAGE)]
    pub image: String,
}

impl DeployArgs {
    /// Build the immutable request of the run.
    pub fn to_request(&self) -> BuildRequest {
        let mut request = BuildRequest::new(self.context_dir.as_str())
            .build_file(self.docker_filepath.as_str())
            .storage(StorageSizes {
                claim_gi: self.pvc_storage,
                volume_gi: self.pv_cap,
            })
            .wait(self.wait_for_pod)
            .delete_on_finish(self.pod_delete)
            .manifest_mode(self.read_manifest)
            .push(!self.no_push);

        request.credentials.repo = self.docker_repo.clone();
        request.credentials.username = self.docker_username.clone();
        request.credentials.email = self.docker_email.clone();
        request.pod_name = self.pod_name.clone();
        request
    }

    /// Build the run configuration.
    pub fn to_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            namespace: self.namespace.clone(),
            builder_image: self.image.clone(),
            manifest_dir: self.manifest_dir.clone(),
            wait_timeout: self.wait_timeout.map(Duration::from_secs),
            ..Default::default()
        }
    }
}
