//! Error types for the build orchestrator.
//!
//! Errors are split by how a run reacts to them: configuration problems abort
//! before anything touches the cluster, while cluster failures are logged at
//! the call site and leave the matching provisioned flag unset.

use std::path::PathBuf;

use thiserror::Error;

use crate::cluster::ClusterError;

/// Error type for orchestrator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration (missing build file, missing manifests)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A manifest file exists but could not be parsed
    #[error("Invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem error while reading local inputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interactive input could not be collected
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Cluster operation failed
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error must abort the run before any cluster mutation
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Manifest { .. } | Error::Io(_)
        )
    }

    /// Check if this error indicates the resource already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::Cluster(e) if e.is_already_exists())
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Cluster(e) if e.is_not_found())
    }
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;
