//! Classification of the build context.
//!
//! A context that exists on the local filesystem has to be shipped to the
//! builder through a volume; anything else is handed to Kaniko verbatim.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::build::BuildRequest;
use crate::controller::error::{Error, Result};

/// Where the build context lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    /// Existing local directory containing the build file
    Local { dir: PathBuf, build_file: PathBuf },
    /// Remote or otherwise non-local reference
    Remote,
}

impl ContextKind {
    /// Check if storage has to be provisioned for this context
    pub fn needs_storage(&self) -> bool {
        matches!(self, ContextKind::Local { .. })
    }
}

/// Classify the context of a request.
///
/// Fails with a configuration error when the context is a local path but
/// the build file is not inside it.
pub fn classify(request: &BuildRequest) -> Result<ContextKind> {
    let dir = Path::new(&request.context);
    if !dir.exists() {
        debug!(context = %request.context, "Context is not a local path, treating as remote");
        return Ok(ContextKind::Remote);
    }

    let build_file = dir.join(&request.build_file);
    if !build_file.exists() {
        return Err(Error::Configuration(format!(
            "no such build file: '{}'",
            build_file.display()
        )));
    }

    Ok(ContextKind::Local {
        dir: dir.to_path_buf(),
        build_file,
    })
}
