//! PersistentVolume generation for the build context.
//!
//! The volume is a host-path volume that carries the local build context to
//! the builder pod through the claim.

use k8s_openapi::api::core::v1::{HostPathVolumeSource, PersistentVolume, PersistentVolumeSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::resources::common::{
    DEFAULT_ACCESS_MODE, DEFAULT_HOST_PATH, DEFAULT_RECLAIM_POLICY, DEFAULT_STORAGE_CLASS,
    ProvisionStrategy, gi_quantity, standard_labels, storage_map,
};

/// Generate the PersistentVolume for a run.
///
/// With [`ProvisionStrategy::Generated`] only capacity, access modes, storage
/// class and host path are taken from `manifest`. With
/// [`ProvisionStrategy::Manifest`] the manifest is used as authored and only
/// empty fields are defaulted. Without a manifest both strategies produce the
/// same object.
pub fn generate_volume(
    name: &str,
    manifest: Option<&PersistentVolume>,
    capacity_gi: u32,
    strategy: ProvisionStrategy,
) -> PersistentVolume {
    match (strategy, manifest) {
        (ProvisionStrategy::Manifest, Some(manifest)) => {
            volume_from_manifest(name, manifest, capacity_gi)
        }
        _ => generated_volume(name, manifest, capacity_gi),
    }
}

fn generated_volume(
    name: &str,
    manifest: Option<&PersistentVolume>,
    capacity_gi: u32,
) -> PersistentVolume {
    let declared = manifest.and_then(|m| m.spec.as_ref());

    let capacity = declared
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get("storage"))
        .cloned()
        .unwrap_or_else(|| gi_quantity(capacity_gi));
    let access_modes = declared
        .and_then(|s| s.access_modes.clone())
        .unwrap_or_else(|| vec![DEFAULT_ACCESS_MODE.to_string()]);
    let storage_class_name = declared
        .and_then(|s| s.storage_class_name.clone())
        .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string());
    let host_path = declared
        .and_then(|s| s.host_path.clone())
        .unwrap_or_else(default_host_path);

    let mut labels = standard_labels("volume");
    labels.insert("type".to_string(), "local".to_string());

    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            capacity: Some(storage_map(capacity)),
            access_modes: Some(access_modes),
            persistent_volume_reclaim_policy: Some(DEFAULT_RECLAIM_POLICY.to_string()),
            storage_class_name: Some(storage_class_name),
            host_path: Some(host_path),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn volume_from_manifest(
    name: &str,
    manifest: &PersistentVolume,
    capacity_gi: u32,
) -> PersistentVolume {
    let mut volume = manifest.clone();
    volume.metadata.name = Some(name.to_string());
    // Server-owned fields must not be submitted
    volume.metadata.resource_version = None;
    volume.metadata.uid = None;
    volume.status = None;

    let spec = volume.spec.get_or_insert_with(Default::default);
    if spec
        .capacity
        .as_ref()
        .is_none_or(|c| !c.contains_key("storage"))
    {
        spec.capacity
            .get_or_insert_with(Default::default)
            .insert("storage".to_string(), gi_quantity(capacity_gi));
    }
    if spec.access_modes.as_ref().is_none_or(|m| m.is_empty()) {
        spec.access_modes = Some(vec![DEFAULT_ACCESS_MODE.to_string()]);
    }
    if spec.storage_class_name.is_none() {
        spec.storage_class_name = Some(DEFAULT_STORAGE_CLASS.to_string());
    }
    if spec.persistent_volume_reclaim_policy.is_none() {
        spec.persistent_volume_reclaim_policy = Some(DEFAULT_RECLAIM_POLICY.to_string());
    }
    let has_source = spec.host_path.is_some()
        || spec.local.is_some()
        || spec.nfs.is_some()
        || spec.csi.is_some();
    if !has_source {
        spec.host_path = Some(default_host_path());
    }

    volume
}

fn default_host_path() -> HostPathVolumeSource {
    HostPathVolumeSource {
        path: DEFAULT_HOST_PATH.to_string(),
        ..Default::default()
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
    use super::*;
    use k8s_openapi::api::core::v1::NFSVolumeSource;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn manifest() -> PersistentVolume {
        let mut labels = BTreeMap::new();
        labels.insert("team".to_string(), "builds".to_string());
        PersistentVolume {
            metadata: ObjectMeta {
                name: Some("from-manifest".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec {
                capacity: Some(storage_map(Quantity("10Gi".to_string()))),
                access_modes: Some(vec!["ReadWriteMany".to_string()]),
                storage_class_name: Some("manual".to_string()),
                host_path: Some(HostPathVolumeSource {
                    path: "/mnt/build".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_volume_defaults() {
        let volume = generate_volume("workspace-vol-1", None, 5, ProvisionStrategy::Generated);

        assert_eq!(volume.metadata.name, Some("workspace-vol-1".to_string()));
        let labels = volume.metadata.labels.unwrap();
        assert_eq!(labels.get("type"), Some(&"local".to_string()));

        let spec = volume.spec.unwrap();
        assert_eq!(spec.capacity.unwrap()["storage"], Quantity("5Gi".to_string()));
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name, Some("local-storage".to_string()));
        assert_eq!(spec.persistent_volume_reclaim_policy, Some("Retain".to_string()));
        assert_eq!(spec.host_path.unwrap().path, "/workspace");
    }

    #[test]
    fn test_requested_capacity_is_used() {
        let volume = generate_volume("v", None, 12, ProvisionStrategy::Generated);
        let spec = volume.spec.unwrap();
        assert_eq!(spec.capacity.unwrap()["storage"].0, "12Gi");
    }

    #[test]
    fn test_generated_strategy_takes_manifest_fields() {
        let manifest = manifest();
        let volume = generate_volume("v", Some(&manifest), 5, ProvisionStrategy::Generated);

        // Generated labels, not the manifest's
        let labels = volume.metadata.labels.unwrap();
        assert!(!labels.contains_key("team"));

        let spec = volume.spec.unwrap();
        assert_eq!(spec.capacity.unwrap()["storage"].0, "10Gi");
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteMany".to_string()]));
        assert_eq!(spec.storage_class_name, Some("manual".to_string()));
        assert_eq!(spec.host_path.unwrap().path, "/mnt/build");
    }

    #[test]
    fn test_manifest_strategy_keeps_authored_fields() {
        let manifest = manifest();
        let volume = generate_volume(
            "from-manifest",
            Some(&manifest),
            5,
            ProvisionStrategy::Manifest,
        );

        let labels = volume.metadata.labels.unwrap();
        assert_eq!(labels.get("team"), Some(&"builds".to_string()));
        let spec = volume.spec.unwrap();
        assert_eq!(spec.capacity.unwrap()["storage"].0, "10Gi");
        assert_eq!(spec.persistent_volume_reclaim_policy, Some("Retain".to_string()));
    }

    #[test]
    fn test_manifest_strategy_fills_gaps() {
        let sparse = PersistentVolume {
            metadata: ObjectMeta {
                name: Some("sparse".to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec {
                nfs: Some(NFSVolumeSource {
                    server: "nfs.local".to_string(),
                    path: "/exports".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let volume = generate_volume("sparse", Some(&sparse), 7, ProvisionStrategy::Manifest);
        let spec = volume.spec.unwrap();
        assert_eq!(spec.capacity.unwrap()["storage"].0, "7Gi");
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name, Some("local-storage".to_string()));
        // An authored volume source is not replaced by the host path default
        assert!(spec.host_path.is_none());
        assert!(spec.nfs.is_some());
    }
}
