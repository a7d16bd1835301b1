// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for kaniko-deploy.
//!
//! Uses proptest to generate random inputs and verify invariants.

use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use proptest::prelude::*;

use kaniko_deploy::BuildRequest;
use kaniko_deploy::controller::teardown::TeardownCoordinator;
use kaniko_deploy::controller::{PodLifecycleState, ProvisionedResourceSet};
use kaniko_deploy::manifests::{ManifestResolver, ManifestSet};
use kaniko_deploy::resources::common::gi_quantity;
use kaniko_deploy::resources::pod::{Destination, builder_args};

/// Strategy for generating lifecycle states.
fn any_state() -> impl Strategy<Value = PodLifecycleState> {
    prop_oneof![
        Just(PodLifecycleState::Pending),
        Just(PodLifecycleState::Running),
        Just(PodLifecycleState::Succeeded),
        Just(PodLifecycleState::Failed),
        Just(PodLifecycleState::Unknown),
    ]
}

/// Strategy for generating provisioned flag sets.
fn any_provisioned() -> impl Strategy<Value = ProvisionedResourceSet> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(volume, claim, pod, secret)| ProvisionedResourceSet {
            volume,
            claim,
            pod,
            secret,
        },
    )
}

/// Strategy for generating DNS-label resource names.
fn resource_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

fn meta(name: Option<String>) -> ObjectMeta {
    ObjectMeta {
        name,
        ..Default::default()
    }
}

/// Strategy for generating manifest sets with optional names.
fn any_manifests() -> impl Strategy<Value = ManifestSet> {
    (
        proptest::option::of(proptest::option::of(resource_name())),
        proptest::option::of(proptest::option::of(resource_name())),
        proptest::option::of(proptest::option::of(resource_name())),
    )
        .prop_map(|(volume, claim, pod)| ManifestSet {
            volume: volume.map(|name| PersistentVolume {
                metadata: meta(name),
                ..Default::default()
            }),
            claim: claim.map(|name| PersistentVolumeClaim {
                metadata: meta(name),
                ..Default::default()
            }),
            pod: pod.map(|name| Pod {
                metadata: meta(name),
                ..Default::default()
            }),
        })
}

proptest! {
    /// Every resolution of the same resolver returns identical names.
    #[test]
    fn resolution_is_memoized(manifests in any_manifests(), calls in 2usize..6) {
        let resolver = ManifestResolver::new(manifests);
        let first = resolver.resolve();
        for _ in 1..calls {
            prop_assert_eq!(resolver.resolve(), first.clone());
        }
        prop_assert_eq!(resolver.volume_name(), first.volume.as_str());
        prop_assert_eq!(resolver.claim_name(), first.claim.as_str());
        prop_assert_eq!(resolver.pod_name(), first.pod.as_str());
    }

    /// A manifest name always wins over a generated one.
    #[test]
    fn manifest_names_take_precedence(manifests in any_manifests()) {
        let volume = manifests.volume.as_ref().and_then(|v| v.metadata.name.clone());
        let claim = manifests.claim.as_ref().and_then(|c| c.metadata.name.clone());
        let pod = manifests.pod.as_ref().and_then(|p| p.metadata.name.clone());
        let resolved = ManifestResolver::new(manifests).resolve();

        match volume {
            Some(name) => prop_assert_eq!(resolved.volume, name),
            None => prop_assert!(resolved.volume.starts_with("workspace-vol-")),
        }
        match claim {
            Some(name) => prop_assert_eq!(resolved.claim, name),
            None => prop_assert!(resolved.claim.starts_with("workspace-vol-claim-")),
        }
        match pod {
            Some(name) => prop_assert_eq!(resolved.pod, name),
            None => prop_assert!(resolved.pod.starts_with("kaniko-pod-")),
        }
    }

    /// Teardown never deletes something this run did not create.
    #[test]
    fn teardown_only_touches_owned_resources(
        provisioned in any_provisioned(),
        wait in any::<bool>(),
        delete in any::<bool>(),
        status in any_state(),
    ) {
        let request = BuildRequest::new("./app").wait(wait).delete_on_finish(delete);
        let plan = TeardownCoordinator::plan(&provisioned, &request, status);

        prop_assert!(!plan.delete_pod || provisioned.pod);
        prop_assert_eq!(plan.delete_claim, provisioned.claim);
        prop_assert_eq!(plan.delete_volume, provisioned.volume);
        prop_assert!(!plan.verify_pod_exists || plan.delete_pod);
    }

    /// Pod deletion follows the wait/delete/status rules.
    #[test]
    fn teardown_pod_rules(
        wait in any::<bool>(),
        delete in any::<bool>(),
        status in any_state(),
    ) {
        let provisioned = ProvisionedResourceSet { pod: true, ..Default::default() };
        let request = BuildRequest::new("./app").wait(wait).delete_on_finish(delete);
        let plan = TeardownCoordinator::plan(&provisioned, &request, status);

        let expected = match (wait, delete) {
            (_, false) => false,
            (true, true) => true,
            (false, true) => status == PodLifecycleState::Failed,
        };
        prop_assert_eq!(plan.delete_pod, expected);
        prop_assert_eq!(plan.verify_pod_exists, wait && delete);
    }

    /// Only Pending and Running keep a wait going.
    #[test]
    fn only_active_states_are_non_terminal(status in any_state()) {
        let active = matches!(status, PodLifecycleState::Pending | PodLifecycleState::Running);
        prop_assert_eq!(status.is_terminal(), !active);
    }

    /// Builder arguments: exactly three, push and no-push mutually exclusive.
    #[test]
    fn builder_args_shape(
        context in "[a-z0-9./:]{1,30}",
        build_file in "[A-Za-z.]{1,20}",
        user in proptest::option::of(resource_name()),
        repo in proptest::option::of(resource_name()),
    ) {
        let destination = match &repo {
            Some(repo) => Destination::push(user.as_deref(), repo),
            None => Destination::NoPush,
        };
        let args = builder_args(&context, &build_file, &destination);

        prop_assert_eq!(args.len(), 3);
        prop_assert_eq!(&args[0], &format!("--context={}", context));
        prop_assert_eq!(&args[1], &format!("--dockerfile={}", build_file));
        match (repo, user) {
            (None, _) => prop_assert_eq!(&args[2], "--no-push"),
            (Some(repo), Some(user)) => {
                prop_assert_eq!(&args[2], &format!("--destination={}/{}", user, repo))
            }
            (Some(repo), None) => prop_assert_eq!(&args[2], &format!("--destination={}", repo)),
        }
    }

    /// Sizes render as whole Gi quantities.
    #[test]
    fn gi_quantity_format(gi in 1u32..10_000) {
        prop_assert_eq!(gi_quantity(gi).0, format!("{}Gi", gi));
    }

    /// Valid DNS labels are accepted as pod names.
    #[test]
    fn dns_label_pod_names_accepted(name in resource_name()) {
        prop_assert!(BuildRequest::new("./app").pod_name(name).validate().is_ok());
    }

    /// Dot-joined DNS labels are accepted as pod names.
    #[test]
    fn dns_subdomain_pod_names_accepted(
        labels in proptest::collection::vec(resource_name(), 1..4),
    ) {
        let name = labels.join(".");
        prop_assert!(BuildRequest::new("./app").pod_name(name).validate().is_ok());
    }

    /// Empty labels are never valid.
    #[test]
    fn empty_labels_rejected(left in resource_name(), right in resource_name()) {
        let name = format!("{}..{}", left, right);
        prop_assert!(BuildRequest::new("./app").pod_name(name).validate().is_err());
    }

    /// Upper-case pod names are rejected before anything runs.
    #[test]
    fn upper_case_pod_names_rejected(name in "[A-Z][a-zA-Z0-9]{0,10}") {
        let err = BuildRequest::new("./app").pod_name(name).validate().unwrap_err();
        prop_assert!(err.is_configuration());
    }
}
