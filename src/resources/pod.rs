//! Builder Pod generation.
//!
//! Creates a one-shot pod running the Kaniko executor:
//! - Registry credentials projected to `/kaniko/.docker/config.json`
//! - Build context claim mounted at `/workspace` when storage was provisioned
//! - `restartPolicy: Never`, a failed build is not retried

use k8s_openapi::api::core::v1::{
    Container, KeyToPath, PersistentVolumeClaimVolumeSource, Pod, PodSpec, SecretVolumeSource,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::resources::common::standard_labels;
use crate::resources::secret::DOCKER_CONFIG_KEY;

/// Default Kaniko executor image
pub const DEFAULT_BUILDER_IMAGE: &str = "gcr.io/kaniko-project/executor:latest";

/// Volume name of the credential secret inside the pod
const SECRET_VOLUME: &str = "docker-secret";
/// Directory Kaniko reads its Docker config from
const SECRET_MOUNT_PATH: &str = "/kaniko/.docker";
/// Volume name of the build context claim inside the pod
const CONTEXT_VOLUME: &str = "dockerfile-storage";
/// Mount path of the build context claim
pub const CONTEXT_MOUNT_PATH: &str = "/workspace";

/// What Kaniko does with the built image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Build only
    NoPush,
    /// Push to the given image reference (`user/repo`)
    Push(String),
}

impl Destination {
    /// Destination for a push to `repo`, prefixed by `user` when known.
    pub fn push(user: Option<&str>, repo: &str) -> Self {
        match user {
            Some(user) => Destination::Push(format!("{}/{}", user, repo)),
            None => Destination::Push(repo.to_string()),
        }
    }

    fn to_arg(&self) -> String {
        match self {
            Destination::NoPush => "--no-push".to_string(),
            Destination::Push(image) => format!("--destination={}", image),
        }
    }
}

/// Inputs of the builder pod.
#[derive(Debug, Clone)]
pub struct BuilderPodParams<'a> {
    pub pod_name: &'a str,
    pub container_name: &'a str,
    pub image: &'a str,
    pub context: &'a str,
    pub build_file: &'a str,
    pub destination: Destination,
    pub secret_name: &'a str,
    /// Claim holding the build context, if this run provisioned one
    pub claim_name: Option<&'a str>,
}

/// The three executor arguments: context, build file, push target.
pub fn builder_args(context: &str, build_file: &str, destination: &Destination) -> Vec<String> {
    vec![
        format!("--context={}", context),
        format!("--dockerfile={}", build_file),
        destination.to_arg(),
    ]
}

/// Generate the builder pod.
pub fn generate_builder_pod(params: &BuilderPodParams<'_>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(params.pod_name.to_string()),
            labels: Some(standard_labels("builder")),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: params.container_name.to_string(),
                image: Some(params.image.to_string()),
                args: Some(builder_args(
                    params.context,
                    params.build_file,
                    &params.destination,
                )),
                volume_mounts: Some(generate_volume_mounts(params.claim_name.is_some())),
                ..Default::default()
            }],
            restart_policy: Some("Never".to_string()),
            volumes: Some(generate_volumes(params.secret_name, params.claim_name)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate volumes for the pod.
fn generate_volumes(secret_name: &str, claim_name: Option<&str>) -> Vec<Volume> {
    let mut volumes = vec![Volume {
        name: SECRET_VOLUME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            items: Some(vec![KeyToPath {
                key: DOCKER_CONFIG_KEY.to_string(),
                path: "config.json".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }];

    if let Some(claim_name) = claim_name {
        volumes.push(Volume {
            name: CONTEXT_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    volumes
}

/// Generate volume mounts for the builder container.
fn generate_volume_mounts(with_context: bool) -> Vec<VolumeMount> {
    let mut mounts = vec![VolumeMount {
        name: SECRET_VOLUME.to_string(),
        mount_path: SECRET_MOUNT_PATH.to_string(),
        ..Default::default()
    }];

    if with_context {
        mounts.push(VolumeMount {
            name: CONTEXT_VOLUME.to_string(),
            mount_path: CONTEXT_MOUNT_PATH.to_string(),
            ..Default::default()
        });
    }

    mounts
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

    fn params(
        destination: Destination,
        claim_name: Option<&'static str>,
    ) -> BuilderPodParams<'static> {
        BuilderPodParams {
            pod_name: "kaniko-pod-1",
            container_name: "kaniko-cont-1",
            image: DEFAULT_BUILDER_IMAGE,
            context: "./app",
            build_file: "Dockerfile",
            destination,
            secret_name: "docker-registry-secret",
            claim_name,
        }
    }

    #[test]
    fn test_builder_args_no_push() {
        let args = builder_args("./app", "Dockerfile", &Destination::NoPush);
        assert_eq!(
            args,
            vec!["--context=./app", "--dockerfile=Dockerfile", "--no-push"]
        );
    }

    #[test]
    fn test_builder_args_push() {
        let args = builder_args(
            "git://github.com/example/app.git",
            "Dockerfile",
            &Destination::push(Some("alice"), "app"),
        );
        assert_eq!(args.len(), 3);
        assert_eq!(args[2], "--destination=alice/app");
        assert!(!args.contains(&"--no-push".to_string()));
    }

    #[test]
    fn test_destination_without_user() {
        assert_eq!(
            Destination::push(None, "registry.local/app"),
            Destination::Push("registry.local/app".to_string())
        );
    }

    #[test]
    fn test_pod_with_storage() {
        let pod = generate_builder_pod(&params(Destination::NoPush, Some("claim-1")));

        assert_eq!(pod.metadata.name, Some("kaniko-pod-1".to_string()));
        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy, Some("Never".to_string()));
        assert_eq!(spec.containers.len(), 1);

        let container = &spec.containers[0];
        assert_eq!(container.name, "kaniko-cont-1");
        assert_eq!(container.image.as_deref(), Some(DEFAULT_BUILDER_IMAGE));

        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mount_path, "/kaniko/.docker");
        assert_eq!(mounts[1].mount_path, "/workspace");

        let volumes = spec.volumes.unwrap();
        let claim = volumes[1].persistent_volume_claim.as_ref().unwrap();
        assert_eq!(claim.claim_name, "claim-1");
    }

    #[test]
    fn test_pod_without_storage_keeps_secret_mount() {
        let pod = generate_builder_pod(&params(Destination::push(Some("alice"), "app"), None));
        let spec = pod.spec.unwrap();

        let mounts = spec.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, "docker-secret");

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        let secret = volumes[0].secret.as_ref().unwrap();
        assert_eq!(secret.secret_name.as_deref(), Some("docker-registry-secret"));
        let items = secret.items.as_ref().unwrap();
        assert_eq!(items[0].key, ".dockerconfigjson");
        assert_eq!(items[0].path, "config.json");
    }
}
