//! Build request model.
//!
//! `request` holds the immutable input of a run; `context` decides whether
//! the build context is local (and needs storage) or remote.

pub mod context;
pub mod request;

pub use context::{ContextKind, classify};
pub use request::{
    BuildRequest, DEFAULT_BUILD_FILE, DEFAULT_STORAGE_GI, RegistryCredentials, StorageSizes,
};
