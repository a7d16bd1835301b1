//! Controller module for kaniko-deploy.
//!
//! Contains the run orchestration and the components it sequences, plus
//! error handling and per-run state.

pub mod context;
pub mod error;
pub mod launcher;
pub mod orchestrator;
pub mod provisioner;
pub mod state;
pub mod teardown;
pub mod watcher;

pub use context::{OrchestratorConfig, RunContext};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, RunReport};
pub use state::{PodLifecycleState, ProvisionedResourceSet};
