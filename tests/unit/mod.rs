// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for kaniko-deploy.
//!
//! These tests run without a Kubernetes cluster and test individual
//! components in isolation through the public API.

mod state_tests {
    use kaniko_deploy::controller::{PodLifecycleState, ProvisionedResourceSet};

    #[test]
    fn test_state_display() {
        assert_eq!(PodLifecycleState::Pending.to_string(), "Pending");
        assert_eq!(PodLifecycleState::Running.to_string(), "Running");
        assert_eq!(PodLifecycleState::Succeeded.to_string(), "Succeeded");
        assert_eq!(PodLifecycleState::Failed.to_string(), "Failed");
        assert_eq!(PodLifecycleState::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_state_default() {
        assert_eq!(PodLifecycleState::default(), PodLifecycleState::Unknown);
    }

    #[test]
    fn test_unrecognised_phase_is_unknown() {
        assert_eq!(
            PodLifecycleState::from_phase(Some("CrashLoopBackOff")),
            PodLifecycleState::Unknown
        );
        assert_eq!(
            PodLifecycleState::from_phase(Some("succeeded")),
            PodLifecycleState::Unknown
        );
    }

    #[test]
    fn test_provisioned_set_default() {
        assert_eq!(
            ProvisionedResourceSet::default(),
            ProvisionedResourceSet {
                volume: false,
                claim: false,
                pod: false,
                secret: false,
            }
        );
    }
}

mod error_tests {
    use std::path::PathBuf;

    use kaniko_deploy::cluster::ClusterError;
    use kaniko_deploy::controller::Error;

    #[test]
    fn test_configuration_errors() {
        assert!(Error::Configuration("x".to_string()).is_configuration());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(Error::from(io).is_configuration());

        let yaml = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let manifest = Error::Manifest {
            path: PathBuf::from("volume.yaml"),
            source: yaml,
        };
        assert!(manifest.is_configuration());
        assert!(manifest.to_string().contains("volume.yaml"));
    }

    #[test]
    fn test_cluster_errors_are_not_configuration() {
        let err = Error::from(ClusterError::Unavailable("connection refused".to_string()));
        assert!(!err.is_configuration());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_cluster_error_classification() {
        let exists = Error::from(ClusterError::AlreadyExists {
            kind: "Secret",
            name: "docker-registry-secret".to_string(),
        });
        assert!(exists.is_already_exists());
        assert!(!exists.is_not_found());

        let missing = Error::from(ClusterError::NotFound {
            kind: "Pod",
            name: "kaniko-pod-1".to_string(),
        });
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "Pod kaniko-pod-1 not found");
    }
}

mod resource_tests {
    use kaniko_deploy::resources::ProvisionStrategy;
    use kaniko_deploy::resources::claim::generate_claim;
    use kaniko_deploy::resources::pod::{Destination, builder_args};
    use kaniko_deploy::resources::volume::generate_volume;

    #[test]
    fn test_builder_args_are_exactly_three() {
        for destination in [Destination::NoPush, Destination::push(Some("u"), "r")] {
            let args = builder_args("ctx", "Dockerfile", &destination);
            assert_eq!(args.len(), 3);
            assert_eq!(args[0], "--context=ctx");
            assert_eq!(args[1], "--dockerfile=Dockerfile");
        }
    }

    #[test]
    fn test_strategies_agree_without_manifest() {
        let generated = generate_volume("v", None, 5, ProvisionStrategy::Generated);
        let authored = generate_volume("v", None, 5, ProvisionStrategy::Manifest);
        assert_eq!(generated, authored);

        let generated = generate_claim("c", None, 5, Some("v"), ProvisionStrategy::Generated);
        let authored = generate_claim("c", None, 5, Some("v"), ProvisionStrategy::Manifest);
        assert_eq!(generated, authored);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(ProvisionStrategy::Generated.to_string(), "generated");
        assert_eq!(ProvisionStrategy::Manifest.to_string(), "manifest");
    }
}

mod resolver_tests {
    use kaniko_deploy::manifests::{ManifestResolver, ManifestSet};

    #[test]
    fn test_pod_override_only_changes_pod() {
        let resolver = ManifestResolver::new(ManifestSet::default());
        let resolved = resolver.resolve();
        let overridden = resolver.resolve().with_pod_override(Some("custom"));

        assert_eq!(overridden.pod, "custom");
        assert_eq!(overridden.volume, resolved.volume);
        assert_eq!(overridden.claim, resolved.claim);
        assert_eq!(resolver.resolve().with_pod_override(None), resolved);
    }

    #[test]
    fn test_load_from_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ManifestResolver::load(dir.path(), false).unwrap();
        assert!(resolver.manifests().is_empty());
        assert!(ManifestResolver::load(dir.path(), true).is_err());
    }
}

mod cli_tests {
    use clap::Parser;
    use kaniko_deploy::cli::{Cli, Command, LogFormat};

    #[test]
    fn test_log_format_is_global() {
        let cli = Cli::try_parse_from([
            "kaniko-deploy",
            "deploy",
            "--context-dir",
            "./app",
            "--log-format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_deploy_request_and_config() {
        let cli = Cli::try_parse_from([
            "kaniko-deploy",
            "deploy",
            "--context-dir",
            "git://github.com/example/app.git",
            "--docker-repo",
            "app",
            "--read-manifest",
            "--pod-name",
            "nightly",
            "--manifest-dir",
            "/etc/kaniko",
            "--image",
            "gcr.io/kaniko-project/executor:v1.23.0",
        ])
        .unwrap();
        let Command::Deploy(args) = cli.command;

        let request = args.to_request();
        assert!(request.push);
        assert!(request.manifest_mode);
        assert_eq!(request.pod_name.as_deref(), Some("nightly"));
        assert!(request.validate().is_ok());

        let config = args.to_config();
        assert_eq!(config.manifest_dir.to_str(), Some("/etc/kaniko"));
        assert_eq!(config.builder_image, "gcr.io/kaniko-project/executor:v1.23.0");
        assert!(config.wait_timeout.is_none());
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["kaniko-deploy", "build", "--context-dir", "."]).is_err());
    }
}
