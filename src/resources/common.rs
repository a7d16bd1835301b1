//! Common resource generation utilities.
//!
//! Shared labels, defaults and quantity helpers for the objects a build run
//! creates.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Value of the `app.kubernetes.io/managed-by` label
pub const MANAGED_BY: &str = "kaniko-deploy";

/// Access mode used when neither a manifest nor the caller names one
pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

/// Storage class used when neither a manifest nor the caller names one
pub const DEFAULT_STORAGE_CLASS: &str = "local-storage";

/// Reclaim policy of generated volumes
pub const DEFAULT_RECLAIM_POLICY: &str = "Retain";

/// Host path backing generated volumes
pub const DEFAULT_HOST_PATH: &str = "/workspace";

/// How volume and claim objects are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionStrategy {
    /// Build from defaults, taking capacity, access modes, storage class and
    /// host path from a manifest when one exists
    #[default]
    Generated,
    /// Submit the manifest as authored, filling only fields it leaves empty
    Manifest,
}

impl ProvisionStrategy {
    /// Strategy matching the manifest-mode flag of a request.
    pub fn for_manifest_mode(manifest_mode: bool) -> Self {
        if manifest_mode {
            ProvisionStrategy::Manifest
        } else {
            ProvisionStrategy::Generated
        }
    }
}

impl std::fmt::Display for ProvisionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionStrategy::Generated => write!(f, "generated"),
            ProvisionStrategy::Manifest => write!(f, "manifest"),
        }
    }
}

/// Standard labels applied to every generated object
pub fn standard_labels(component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), "kaniko".to_string());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        component.to_string(),
    );
    labels
}

/// Format a size in Gi as a quantity (`5` -> `5Gi`).
pub fn gi_quantity(gi: u32) -> Quantity {
    Quantity(format!("{}Gi", gi))
}

/// Single-entry `storage` resource map.
pub fn storage_map(quantity: Quantity) -> BTreeMap<String, Quantity> {
    let mut map = BTreeMap::new();
    map.insert("storage".to_string(), quantity);
    map
}
