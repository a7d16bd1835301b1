//! The immutable input of a run.

use crate::controller::error::{Error, Result};

/// Default claim request and volume capacity, in Gi
pub const DEFAULT_STORAGE_GI: u32 = 5;

/// Default build file name inside the context
pub const DEFAULT_BUILD_FILE: &str = "Dockerfile";

/// Registry identity supplied on the command line.
///
/// The registry password is deliberately absent: it is only ever collected
/// through a masked prompt while the credential secret is being created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Repository the image is pushed to, e.g. `my-app`
    pub repo: Option<String>,
}

/// Storage sizing in Gi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSizes {
    /// Request of the PersistentVolumeClaim
    pub claim_gi: u32,
    /// Capacity of the PersistentVolume
    pub volume_gi: u32,
}

impl Default for StorageSizes {
    fn default() -> Self {
        Self {
            claim_gi: DEFAULT_STORAGE_GI,
            volume_gi: DEFAULT_STORAGE_GI,
        }
    }
}

/// Everything a run needs to know, fixed at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Local directory or remote reference (`git://`, `s3://`, ...)
    pub context: String,
    pub build_file: String,
    pub push: bool,
    pub credentials: RegistryCredentials,
    /// Explicit pod name, overriding any resolved one
    pub pod_name: Option<String>,
    pub storage: StorageSizes,
    pub wait: bool,
    pub delete_on_finish: bool,
    pub manifest_mode: bool,
}

impl BuildRequest {
    /// Create a request with defaults for everything but the context.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            build_file: DEFAULT_BUILD_FILE.to_string(),
            push: false,
            credentials: RegistryCredentials::default(),
            pod_name: None,
            storage: StorageSizes::default(),
            wait: false,
            delete_on_finish: false,
            manifest_mode: false,
        }
    }

    pub fn build_file(mut self, build_file: impl Into<String>) -> Self {
        self.build_file = build_file.into();
        self
    }

    /// Set whether the image is pushed; the repository is set separately.
    pub fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Enable pushing to `repo`.
    pub fn push_to(mut self, repo: impl Into<String>) -> Self {
        self.push = true;
        self.credentials.repo = Some(repo.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = Some(username.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.credentials.email = Some(email.into());
        self
    }

    pub fn pod_name(mut self, pod_name: impl Into<String>) -> Self {
        self.pod_name = Some(pod_name.into());
        self
    }

    pub fn storage(mut self, storage: StorageSizes) -> Self {
        self.storage = storage;
        self
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn delete_on_finish(mut self, delete: bool) -> Self {
        self.delete_on_finish = delete;
        self
    }

    pub fn manifest_mode(mut self, manifest_mode: bool) -> Self {
        self.manifest_mode = manifest_mode;
        self
    }

    /// Reject combinations that cannot produce a working build.
    pub fn validate(&self) -> Result<()> {
        if self.context.trim().is_empty() {
            return Err(Error::Configuration("build context is required".to_string()));
        }
        if self.build_file.trim().is_empty() {
            return Err(Error::Configuration("build file name is empty".to_string()));
        }
        if self.push
            && self
                .credentials
                .repo
                .as_deref()
                .is_none_or(|r| r.trim().is_empty())
        {
            return Err(Error::Configuration(
                "pushing requires a destination repository (--docker-repo)".to_string(),
            ));
        }
        if let Some(name) = &self.pod_name
            && !is_dns_subdomain(name)
        {
            return Err(Error::Configuration(format!(
                "pod name '{}' is not a valid DNS-1123 subdomain",
                name
            )));
        }
        Ok(())
    }
}

/// Check the DNS-1123 subdomain rules Kubernetes applies to pod names:
/// dot-separated labels, 253 characters at most.
fn is_dns_subdomain(name: &str) -> bool {
    !name.is_empty() && name.len() <= 253 && name.split('.').all(is_dns_label)
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}
