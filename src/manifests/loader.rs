//! Loading of user-authored manifests.
//!
//! Manifests are deserialized straight into `k8s-openapi` types, which also
//! checks that `apiVersion` and `kind` match the expected resource.

use std::path::{Path, PathBuf};

use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::controller::error::{Error, Result};

/// File name of the PersistentVolume manifest
pub const VOLUME_MANIFEST: &str = "volume.yaml";
/// File name of the PersistentVolumeClaim manifest
pub const CLAIM_MANIFEST: &str = "volume-claim.yaml";
/// File name of the builder Pod manifest
pub const POD_MANIFEST: &str = "pod-kaniko.yaml";

/// Optional manifests found for a run. Each kind is independent.
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub volume: Option<PersistentVolume>,
    pub claim: Option<PersistentVolumeClaim>,
    pub pod: Option<Pod>,
}

impl ManifestSet {
    /// Load manifests from `dir`.
    ///
    /// With `required` set (manifest mode) the volume and claim manifests
    /// must exist; the pod manifest is always optional.
    pub fn load(dir: &Path, required: bool) -> Result<Self> {
        let volume = read_manifest::<PersistentVolume>(&dir.join(VOLUME_MANIFEST))?;
        if volume.is_none() && required {
            return Err(missing(VOLUME_MANIFEST, dir));
        }

        let claim = read_manifest::<PersistentVolumeClaim>(&dir.join(CLAIM_MANIFEST))?;
        if claim.is_none() && required {
            return Err(missing(CLAIM_MANIFEST, dir));
        }

        let pod = read_manifest::<Pod>(&dir.join(POD_MANIFEST))?;

        let set = Self { volume, claim, pod };
        info!(
            volume = set.volume.is_some(),
            claim = set.claim.is_some(),
            pod = set.pod.is_some(),
            "Loaded manifests"
        );
        Ok(set)
    }

    /// Check if no manifest was found at all
    pub fn is_empty(&self) -> bool {
        self.volume.is_none() && self.claim.is_none() && self.pod.is_none()
    }
}

fn missing(file: &str, dir: &Path) -> Error {
    Error::Configuration(format!(
        "{} not found in {} (required in manifest mode)",
        file,
        dir.display()
    ))
}

/// Read and parse a manifest, returning `None` when the file does not exist.
fn read_manifest<K: DeserializeOwned>(path: &Path) -> Result<Option<K>> {
    if !path.is_file() {
        debug!(path = %path.display(), "Manifest not present");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let parsed = serde_yaml::from_str(&raw).map_err(|source| Error::Manifest {
        path: PathBuf::from(path),
        source,
    })?;
    Ok(Some(parsed))
}
