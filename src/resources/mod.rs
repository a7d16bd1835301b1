//! Resource generation module.
//!
//! Pure functions that build the Kubernetes objects of a build run.
//!
//! ## Resources Generated
//!
//! | Resource | Purpose |
//! |----------|---------|
//! | PersistentVolume | Host-path storage for a local build context |
//! | PersistentVolumeClaim | Binds the context storage into the builder pod |
//! | Secret | Registry credentials read by Kaniko (`config.json`) |
//! | Pod | One-shot Kaniko executor |

pub mod claim;
pub mod common;
pub mod pod;
pub mod secret;
pub mod volume;

pub use common::{ProvisionStrategy, standard_labels};
