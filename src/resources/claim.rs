//! PersistentVolumeClaim generation for the build context.

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::resources::common::{
    DEFAULT_ACCESS_MODE, DEFAULT_STORAGE_CLASS, ProvisionStrategy, gi_quantity, standard_labels,
    storage_map,
};

/// Generate the PersistentVolumeClaim for a run.
///
/// `volume_name` pins the claim to the volume this run created; it is
/// ignored for authored manifests, which bind however they were written.
pub fn generate_claim(
    name: &str,
    manifest: Option<&PersistentVolumeClaim>,
    request_gi: u32,
    volume_name: Option<&str>,
    strategy: ProvisionStrategy,
) -> PersistentVolumeClaim {
    match (strategy, manifest) {
        (ProvisionStrategy::Manifest, Some(manifest)) => {
            claim_from_manifest(name, manifest, request_gi)
        }
        _ => generated_claim(name, manifest, request_gi, volume_name),
    }
}

fn generated_claim(
    name: &str,
    manifest: Option<&PersistentVolumeClaim>,
    request_gi: u32,
    volume_name: Option<&str>,
) -> PersistentVolumeClaim {
    let declared = manifest.and_then(|m| m.spec.as_ref());

    let request = declared
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref())
        .and_then(|r| r.get("storage"))
        .cloned()
        .unwrap_or_else(|| gi_quantity(request_gi));
    let access_modes = declared
        .and_then(|s| s.access_modes.clone())
        .unwrap_or_else(|| vec![DEFAULT_ACCESS_MODE.to_string()]);
    let storage_class_name = declared
        .and_then(|s| s.storage_class_name.clone())
        .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string());

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(standard_labels("claim")),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(access_modes),
            resources: Some(VolumeResourceRequirements {
                requests: Some(storage_map(request)),
                ..Default::default()
            }),
            storage_class_name: Some(storage_class_name),
            volume_name: volume_name.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn claim_from_manifest(
    name: &str,
    manifest: &PersistentVolumeClaim,
    request_gi: u32,
) -> PersistentVolumeClaim {
    let mut claim = manifest.clone();
    claim.metadata.name = Some(name.to_string());
    claim.metadata.resource_version = None;
    claim.metadata.uid = None;
    claim.status = None;

    let spec = claim.spec.get_or_insert_with(Default::default);
    let requests = spec
        .resources
        .get_or_insert_with(Default::default)
        .requests
        .get_or_insert_with(Default::default);
    requests
        .entry("storage".to_string())
        .or_insert_with(|| gi_quantity(request_gi));
    if spec.access_modes.as_ref().is_none_or(|m| m.is_empty()) {
        spec.access_modes = Some(vec![DEFAULT_ACCESS_MODE.to_string()]);
    }
    if spec.storage_class_name.is_none() {
        spec.storage_class_name = Some(DEFAULT_STORAGE_CLASS.to_string());
    }

    claim
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
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn manifest() -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("authored-claim".to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                storage_class_name: Some("manual".to_string()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(storage_map(Quantity("8Gi".to_string()))),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_claim_defaults() {
        let claim = generate_claim(
            "workspace-vol-claim-1",
            None,
            5,
            Some("workspace-vol-1"),
            ProvisionStrategy::Generated,
        );

        assert_eq!(claim.metadata.name, Some("workspace-vol-claim-1".to_string()));
        let spec = claim.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name, Some("local-storage".to_string()));
        assert_eq!(spec.volume_name, Some("workspace-vol-1".to_string()));
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests["storage"].0, "5Gi");
    }

    #[test]
    fn test_unpinned_claim() {
        let claim = generate_claim("c", None, 3, None, ProvisionStrategy::Generated);
        let spec = claim.spec.unwrap();
        assert!(spec.volume_name.is_none());
        assert_eq!(spec.resources.unwrap().requests.unwrap()["storage"].0, "3Gi");
    }

    #[test]
    fn test_generated_strategy_takes_manifest_request() {
        let manifest = manifest();
        let claim = generate_claim("c", Some(&manifest), 5, None, ProvisionStrategy::Generated);
        let spec = claim.spec.unwrap();
        assert_eq!(spec.storage_class_name, Some("manual".to_string()));
        assert_eq!(spec.resources.unwrap().requests.unwrap()["storage"].0, "8Gi");
    }

    #[test]
    fn test_manifest_strategy_ignores_volume_pin() {
        let manifest = manifest();
        let claim = generate_claim(
            "authored-claim",
            Some(&manifest),
            5,
            Some("workspace-vol-1"),
            ProvisionStrategy::Manifest,
        );
        let spec = claim.spec.unwrap();
        assert!(spec.volume_name.is_none());
        assert_eq!(spec.resources.unwrap().requests.unwrap()["storage"].0, "8Gi");
    }

    #[test]
    fn test_manifest_strategy_fills_missing_request() {
        let sparse = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("sparse".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let claim = generate_claim("sparse", Some(&sparse), 4, None, ProvisionStrategy::Manifest);
        let spec = claim.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.resources.unwrap().requests.unwrap()["storage"].0, "4Gi");
    }
}
