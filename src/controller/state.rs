//! Per-run state: what was created, and where the builder pod stands.

/// Which resources this run created.
///
/// A flag is set only at the moment the cluster accepted the create call.
/// Teardown deletes nothing whose flag is unset, so objects owned by someone
/// else are never touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionedResourceSet {
    pub volume: bool,
    pub claim: bool,
    pub pod: bool,
    /// Informational only; the credential secret outlives the run
    pub secret: bool,
}

/// Lifecycle phase of the builder pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PodLifecycleState {
    /// Accepted by the cluster, containers not yet running.
    Pending,
    /// At least one container is running.
    Running,
    /// All containers exited successfully.
    Succeeded,
    /// At least one container exited with an error.
    Failed,
    /// Phase could not be determined, or no pod exists.
    #[default]
    Unknown,
}

impl PodLifecycleState {
    /// Map a pod's `status.phase`.
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => PodLifecycleState::Pending,
            Some("Running") => PodLifecycleState::Running,
            Some("Succeeded") => PodLifecycleState::Succeeded,
            Some("Failed") => PodLifecycleState::Failed,
            _ => PodLifecycleState::Unknown,
        }
    }

    /// Check if the pod will not change phase anymore.
    ///
    /// `Unknown` counts as terminal for waiting purposes: there is nothing
    /// left to observe.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PodLifecycleState::Pending | PodLifecycleState::Running)
    }
}

impl std::fmt::Display for PodLifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodLifecycleState::Pending => write!(f, "Pending"),
            PodLifecycleState::Running => write!(f, "Running"),
            PodLifecycleState::Succeeded => write!(f, "Succeeded"),
            PodLifecycleState::Failed => write!(f, "Failed"),
            PodLifecycleState::Unknown => write!(f, "Unknown"),
        }
    }
}
