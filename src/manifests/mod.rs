//! Optional user-authored manifests and the names derived from them.
//!
//! | File | Resource |
//! |------|----------|
//! | `volume.yaml` | PersistentVolume |
//! | `volume-claim.yaml` | PersistentVolumeClaim |
//! | `pod-kaniko.yaml` | builder Pod (name only) |

pub mod loader;
pub mod resolver;

pub use loader::{CLAIM_MANIFEST, ManifestSet, POD_MANIFEST, VOLUME_MANIFEST};
pub use resolver::{ManifestResolver, ResolvedIdentities};
