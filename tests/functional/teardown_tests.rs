//! Teardown behaviour of complete runs across wait/delete flags and outcomes.

use std::time::Duration;

use tokio::time::Instant;

use kaniko_deploy::BuildRequest;
use kaniko_deploy::cluster::fake::Operation;
use kaniko_deploy::controller::PodLifecycleState;

use crate::harness::Harness;

const REMOTE: &str = "git://github.com/example/app.git";

struct Case {
    wait: bool,
    delete: bool,
    phase: &'static str,
    expected_status: PodLifecycleState,
    pod_deleted: bool,
}

fn cases() -> Vec<Case> {
    use PodLifecycleState::*;
    let case = |wait, delete, phase, expected_status, pod_deleted| Case {
        wait,
        delete,
        phase,
        expected_status,
        pod_deleted,
    };
    vec![
        // wait + delete: deleted whatever the outcome
        case(true, true, "Succeeded", Succeeded, true),
        case(true, true, "Failed", Failed, true),
        case(true, true, "Running", Running, true),
        // delete without wait: only a pod already seen failing
        case(false, true, "Succeeded", Succeeded, false),
        case(false, true, "Failed", Failed, true),
        case(false, true, "Running", Running, false),
        // no delete: never, and without wait the pod is not even polled
        case(true, false, "Succeeded", Succeeded, false),
        case(true, false, "Failed", Failed, false),
        case(false, false, "Running", Unknown, false),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_teardown_matrix() {
    for case in cases() {
        let mut harness = Harness::new();
        // Bounds the wait for the scripted Running case
        harness.config.wait_timeout = Some(Duration::from_secs(10));
        harness.cluster.script_pod_phases(&[case.phase]);
        let request = BuildRequest::new(REMOTE)
            .wait(case.wait)
            .delete_on_finish(case.delete);

        let report = harness.run(&request).await.unwrap();

        let label = format!(
            "wait={} delete={} phase={}",
            case.wait, case.delete, case.phase
        );
        assert_eq!(report.final_status, case.expected_status, "{}", label);
        assert_eq!(report.teardown.pod_deleted, case.pod_deleted, "{}", label);
        assert_eq!(
            harness.cluster.pods().is_empty(),
            case.pod_deleted,
            "{}",
            label
        );
        assert!(harness.cluster.secrets().is_empty(), "{}", label);
    }
}

/// Without waiting, the one status check comes a poll interval after
/// submission, so a pod that failed at start-up is still cleaned up.
#[tokio::test(start_paused = true)]
async fn test_early_failure_removed_without_wait() {
    let harness = Harness::new();
    harness.cluster.script_pod_phases(&["Failed"]);
    let request = BuildRequest::new(REMOTE)
        .pod_name("quick-fail")
        .delete_on_finish(true);

    let started = Instant::now();
    let report = harness.run(&request).await.unwrap();

    assert!(started.elapsed() >= harness.config.poll_interval);
    assert_eq!(
        harness.cluster.calls_of(Operation::ReadPodPhase),
        vec!["read_pod_phase:quick-fail"]
    );
    assert_eq!(report.final_status, PodLifecycleState::Failed);
    assert!(report.teardown.pod_deleted);
    assert!(harness.cluster.pods().is_empty());
}

/// Storage goes claim first, then volume, after the pod.
#[tokio::test(start_paused = true)]
async fn test_full_teardown_order() {
    let harness = Harness::new();
    harness.cluster.script_pod_phases(&["Pending", "Running", "Succeeded"]);
    let request = BuildRequest::new(harness.local_context("Dockerfile").as_str())
        .wait(true)
        .delete_on_finish(true);

    let report = harness.run(&request).await.unwrap();
    let ids = &report.identities;

    let tail: Vec<String> = harness.mutations().into_iter().skip(3).collect();
    assert_eq!(
        tail,
        vec![
            format!("delete_pod:{}", ids.pod),
            format!("delete_claim:{}", ids.claim),
            format!("delete_volume:{}", ids.volume),
        ]
    );
    assert!(harness.cluster.volumes().is_empty());
    assert!(harness.cluster.claims().is_empty());
    assert!(harness.cluster.pods().is_empty());
}

/// A failed build's logs are fetched before the pod is deleted.
#[tokio::test(start_paused = true)]
async fn test_failed_build_logs_fetched_before_delete() {
    let harness = Harness::new();
    harness.cluster.script_pod_phases(&["Running", "Failed"]);
    harness.cluster.set_pod_logs("error: failed to push");
    let request = BuildRequest::new(REMOTE)
        .pod_name("failing-build")
        .wait(true)
        .delete_on_finish(true);

    harness.run(&request).await.unwrap();

    let calls = harness.cluster.calls();
    let logs = calls.iter().position(|c| c == "pod_logs:failing-build");
    let delete = calls.iter().position(|c| c == "delete_pod:failing-build");
    assert!(logs.is_some());
    assert!(logs < delete);
}

/// Resources that existed before the run are never deleted.
#[tokio::test(start_paused = true)]
async fn test_foreign_pod_with_same_name_is_kept() {
    let harness = Harness::new();
    harness.seed_pod("shared-name");
    let request = BuildRequest::new(REMOTE)
        .pod_name("shared-name")
        .wait(true)
        .delete_on_finish(true);

    let report = harness.run(&request).await.unwrap();

    assert!(!report.provisioned.pod);
    assert!(harness.cluster.calls_of(Operation::DeletePod).is_empty());
    assert_eq!(harness.cluster.pods().len(), 1);
}

/// The credential secret survives every run.
#[tokio::test(start_paused = true)]
async fn test_secret_never_deleted() {
    let harness = Harness::with_answers(&["s3cret"]);
    harness.cluster.script_pod_phases(&["Succeeded"]);
    let request = BuildRequest::new(REMOTE)
        .push_to("app")
        .username("alice")
        .email("alice@example.com")
        .wait(true)
        .delete_on_finish(true);

    let report = harness.run(&request).await.unwrap();

    assert!(report.provisioned.secret);
    assert_eq!(harness.cluster.secrets().len(), 1);
}
