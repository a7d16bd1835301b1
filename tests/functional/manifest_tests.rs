//! Runs driven by user-authored manifests.

use kaniko_deploy::BuildRequest;
use kaniko_deploy::cluster::fake::Operation;
use kaniko_deploy::controller::Error;
use kaniko_deploy::manifests::{CLAIM_MANIFEST, POD_MANIFEST, VOLUME_MANIFEST};

use crate::harness::{CLAIM_YAML, Harness, POD_YAML, VOLUME_YAML};

/// Manifest mode takes every name from the manifests and submits the
/// authored objects.
#[tokio::test(start_paused = true)]
async fn test_manifest_mode_uses_authored_objects() {
    let harness = Harness::new();
    harness.write_manifest(VOLUME_MANIFEST, VOLUME_YAML);
    harness.write_manifest(CLAIM_MANIFEST, CLAIM_YAML);
    harness.write_manifest(POD_MANIFEST, POD_YAML);
    // Keep the claim around after the run to inspect it
    harness.cluster.fail_on(Operation::DeleteClaim);
    let request =
        BuildRequest::new(harness.local_context("Dockerfile").as_str()).manifest_mode(true);

    let report = harness.run(&request).await.unwrap();

    assert_eq!(report.identities.volume, "team-build-vol");
    assert_eq!(report.identities.claim, "team-build-claim");
    assert_eq!(report.identities.pod, "team-kaniko");
    assert_eq!(
        harness.mutations(),
        vec![
            "create_volume:team-build-vol",
            "create_claim:team-build-claim",
            "create_pod:team-kaniko",
            "delete_claim:team-build-claim",
            "delete_volume:team-build-vol",
        ]
    );

    let claim = &harness.cluster.claims()[0];
    let spec = claim.spec.as_ref().unwrap();
    // Authored claims bind however they were written
    assert!(spec.volume_name.is_none());
    let requests = spec.resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["storage"].0, "8Gi");
    assert_eq!(report.teardown.failures.len(), 1);
}

/// In manifest mode a missing claim manifest aborts before any cluster call.
#[tokio::test(start_paused = true)]
async fn test_manifest_mode_requires_claim_manifest() {
    let harness = Harness::new();
    harness.write_manifest(VOLUME_MANIFEST, VOLUME_YAML);
    let request =
        BuildRequest::new(harness.local_context("Dockerfile").as_str()).manifest_mode(true);

    let err = harness.run(&request).await.unwrap_err();

    assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("volume-claim.yaml")));
    assert!(harness.cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_manifest_mode_requires_volume_manifest() {
    let harness = Harness::new();
    harness.write_manifest(CLAIM_MANIFEST, CLAIM_YAML);
    let request = BuildRequest::new("git://github.com/example/app.git").manifest_mode(true);

    let err = harness.run(&request).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(harness.cluster.calls().is_empty());
}

/// Outside manifest mode present manifests still supply names and sizes.
#[tokio::test(start_paused = true)]
async fn test_manifests_honoured_without_manifest_mode() {
    let harness = Harness::new();
    harness.write_manifest(VOLUME_MANIFEST, VOLUME_YAML);
    harness.cluster.fail_on(Operation::DeleteVolume);
    let request = BuildRequest::new(harness.local_context("Dockerfile").as_str());

    let report = harness.run(&request).await.unwrap();

    assert_eq!(report.identities.volume, "team-build-vol");
    assert!(report.identities.claim.starts_with("workspace-vol-claim-"));
    assert!(report.identities.pod.starts_with("kaniko-pod-"));

    let volume = &harness.cluster.volumes()[0];
    let spec = volume.spec.as_ref().unwrap();
    assert_eq!(spec.capacity.as_ref().unwrap()["storage"].0, "10Gi");
    assert_eq!(spec.host_path.as_ref().unwrap().path, "/mnt/builds");
    let labels = volume.metadata.labels.as_ref().unwrap();
    assert_eq!(labels.get("type").map(String::as_str), Some("local"));
}

/// Without manifest mode no manifest is required.
#[tokio::test(start_paused = true)]
async fn test_no_manifests_needed_without_manifest_mode() {
    let harness = Harness::new();
    let request = BuildRequest::new("git://github.com/example/app.git");

    let report = harness.run(&request).await.unwrap();

    assert!(report.provisioned.pod);
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_manifest_is_fatal() {
    let harness = Harness::new();
    harness.write_manifest(VOLUME_MANIFEST, "kind: [not, a, volume");
    let request = BuildRequest::new("git://github.com/example/app.git");

    let err = harness.run(&request).await.unwrap_err();

    assert!(matches!(err, Error::Manifest { .. }));
    assert!(err.is_configuration());
    assert!(harness.cluster.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_manifest_of_wrong_kind_is_rejected() {
    let harness = Harness::new();
    // A claim document where the volume is expected
    harness.write_manifest(VOLUME_MANIFEST, CLAIM_YAML);
    let request = BuildRequest::new("git://github.com/example/app.git");

    let err = harness.run(&request).await.unwrap_err();

    assert!(matches!(err, Error::Manifest { .. }));
}

/// Manifest mode does not prompt for email or username, only the password.
#[tokio::test(start_paused = true)]
async fn test_manifest_mode_prompts_only_for_password() {
    let harness = Harness::with_answers(&["pw"]);
    harness.write_manifest(VOLUME_MANIFEST, VOLUME_YAML);
    harness.write_manifest(CLAIM_MANIFEST, CLAIM_YAML);
    let request = BuildRequest::new("git://github.com/example/app.git")
        .manifest_mode(true)
        .push_to("app");

    let report = harness.run(&request).await.unwrap();

    assert!(report.provisioned.secret);
    assert_eq!(harness.prompter.asked().len(), 1);
    // Remote context: manifests name the storage, but none is created
    assert!(harness.cluster.calls_of(Operation::CreateVolume).is_empty());
}
