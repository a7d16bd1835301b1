//! Registry credential Secret generation.
//!
//! The secret holds a Docker `config.json` document that Kaniko reads from
//! `/kaniko/.docker` to authenticate its push.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

use crate::resources::common::standard_labels;

/// Name of the shared registry credential secret
pub const REGISTRY_SECRET_NAME: &str = "docker-registry-secret";

/// Registry the credentials are registered for
pub const DEFAULT_REGISTRY_HOST: &str = "https://index.docker.io/v1/";

/// Key of the Docker config document inside the secret
pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";

/// Secret type understood by the kubelet and by Kaniko
pub const DOCKER_CONFIG_SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// Credentials to store in the secret.
#[derive(Debug, Clone)]
pub struct RegistryLogin {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Serialize)]
struct DockerConfig<'a> {
    auths: BTreeMap<&'a str, AuthEntry<'a>>,
}

#[derive(Serialize)]
struct AuthEntry<'a> {
    username: &'a str,
    password: &'a str,
    email: &'a str,
    auth: String,
}

/// Render the single-entry Docker config document for `registry_host`.
pub fn docker_config_json(
    registry_host: &str,
    login: &RegistryLogin,
) -> Result<Vec<u8>, serde_json::Error> {
    let auth = STANDARD.encode(format!("{}:{}", login.username, login.password));
    let mut auths = BTreeMap::new();
    auths.insert(
        registry_host,
        AuthEntry {
            username: &login.username,
            password: &login.password,
            email: &login.email,
            auth,
        },
    );
    serde_json::to_vec(&DockerConfig { auths })
}

/// Generate the registry credential secret.
///
/// `ByteString` values are base64-encoded when the secret is serialized.
pub fn generate_registry_secret(
    name: &str,
    registry_host: &str,
    login: &RegistryLogin,
) -> Result<Secret, serde_json::Error> {
    let document = docker_config_json(registry_host, login)?;

    let mut data = BTreeMap::new();
    data.insert(DOCKER_CONFIG_KEY.to_string(), ByteString(document));

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(standard_labels("registry-credentials")),
            ..Default::default()
        },
        type_: Some(DOCKER_CONFIG_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    })
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

    fn login() -> RegistryLogin {
        RegistryLogin {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_docker_config_document() {
        let raw = docker_config_json(DEFAULT_REGISTRY_HOST, &login()).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        let auths = doc["auths"].as_object().unwrap();
        assert_eq!(auths.len(), 1);
        let entry = &auths[DEFAULT_REGISTRY_HOST];
        assert_eq!(entry["username"], "alice");
        assert_eq!(entry["password"], "s3cret");
        assert_eq!(entry["email"], "alice@example.com");
        // base64("alice:s3cret")
        assert_eq!(entry["auth"], "YWxpY2U6czNjcmV0");
    }

    #[test]
    fn test_generate_registry_secret() {
        let secret =
            generate_registry_secret(REGISTRY_SECRET_NAME, DEFAULT_REGISTRY_HOST, &login())
                .unwrap();

        assert_eq!(secret.metadata.name, Some("docker-registry-secret".to_string()));
        assert_eq!(
            secret.type_,
            Some("kubernetes.io/dockerconfigjson".to_string())
        );
        let data = secret.data.unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.contains_key(".dockerconfigjson"));
    }

    #[test]
    fn test_secret_data_is_base64_on_the_wire() {
        let secret =
            generate_registry_secret(REGISTRY_SECRET_NAME, DEFAULT_REGISTRY_HOST, &login())
                .unwrap();
        let wire = serde_json::to_value(&secret).unwrap();
        let encoded = wire["data"][DOCKER_CONFIG_KEY].as_str().unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert!(doc["auths"][DEFAULT_REGISTRY_HOST].is_object());
    }
}
