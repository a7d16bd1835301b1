//! In-memory cluster (testing only).
//!
//! [`MemoryCluster`] keeps created objects in maps, records every call in
//! order, lets tests script the phases a pod reports and fails selected
//! operations on demand.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret};
use kube::ResourceExt;

use super::{ClusterClient, ClusterError, ClusterResult};

/// Operations that can be made to fail with [`MemoryCluster::fail_on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateVolume,
    DeleteVolume,
    CreateClaim,
    ReadClaimPhase,
    DeleteClaim,
    ListSecrets,
    CreateSecret,
    CreatePod,
    ReadPodPhase,
    PodLogs,
    ListPods,
    DeletePod,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::CreateVolume => "create_volume",
            Operation::DeleteVolume => "delete_volume",
            Operation::CreateClaim => "create_claim",
            Operation::ReadClaimPhase => "read_claim_phase",
            Operation::DeleteClaim => "delete_claim",
            Operation::ListSecrets => "list_secrets",
            Operation::CreateSecret => "create_secret",
            Operation::CreatePod => "create_pod",
            Operation::ReadPodPhase => "read_pod_phase",
            Operation::PodLogs => "pod_logs",
            Operation::ListPods => "list_pods",
            Operation::DeletePod => "delete_pod",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Default)]
struct State {
    volumes: BTreeMap<String, PersistentVolume>,
    claims: BTreeMap<String, PersistentVolumeClaim>,
    secrets: BTreeMap<String, Secret>,
    pods: BTreeMap<String, Pod>,
    phase_script: VecDeque<String>,
    last_phase: Option<String>,
    pod_logs: String,
    failing: HashSet<Operation>,
    calls: Vec<String>,
}

/// In-memory [`ClusterClient`].
#[derive(Debug, Default)]
pub struct MemoryCluster {
    state: Mutex<State>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later call of `op` fail with [`ClusterError::Unavailable`].
    pub fn fail_on(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    /// Phases reported by successive pod status reads; the last one sticks.
    pub fn script_pod_phases(&self, phases: &[&str]) {
        let mut state = self.lock();
        state.phase_script = phases.iter().map(|p| p.to_string()).collect();
    }

    /// Logs returned for any pod.
    pub fn set_pod_logs(&self, logs: &str) {
        self.lock().pod_logs = logs.to_string();
    }

    /// Seed a secret as if another run had created it.
    pub fn insert_secret(&self, secret: Secret) {
        let mut state = self.lock();
        state.secrets.insert(secret.name_any(), secret);
    }

    /// Seed a pod as if someone else had created it.
    pub fn insert_pod(&self, pod: Pod) {
        let mut state = self.lock();
        state.pods.insert(pod.name_any(), pod);
    }

    pub fn volumes(&self) -> Vec<PersistentVolume> {
        self.lock().volumes.values().cloned().collect()
    }

    pub fn claims(&self) -> Vec<PersistentVolumeClaim> {
        self.lock().claims.values().cloned().collect()
    }

    pub fn secrets(&self) -> Vec<Secret> {
        self.lock().secrets.values().cloned().collect()
    }

    pub fn pods(&self) -> Vec<Pod> {
        self.lock().pods.values().cloned().collect()
    }

    /// Every call made so far, formatted as `operation:name`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls of a single operation.
    pub fn calls_of(&self, op: Operation) -> Vec<String> {
        let prefix = format!("{}:", op);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }

    fn record(&self, op: Operation, name: &str) -> ClusterResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(format!("{}:{}", op, name));
        if state.failing.contains(&op) {
            return Err(ClusterError::Unavailable(format!("{} failed for {}", op, name)));
        }
        Ok(state)
    }
}

fn insert_new<K: Clone>(
    map: &mut BTreeMap<String, K>,
    kind: &'static str,
    name: String,
    obj: &K,
) -> ClusterResult<K> {
    if map.contains_key(&name) {
        return Err(ClusterError::AlreadyExists { kind, name });
    }
    map.insert(name, obj.clone());
    Ok(obj.clone())
}

fn remove_existing<K>(
    map: &mut BTreeMap<String, K>,
    kind: &'static str,
    name: &str,
) -> ClusterResult<()> {
    map.remove(name)
        .map(|_| ())
        .ok_or_else(|| ClusterError::NotFound {
            kind,
            name: name.to_string(),
        })
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn create_volume(&self, volume: &PersistentVolume) -> ClusterResult<PersistentVolume> {
        let name = volume.name_any();
        let mut state = self.record(Operation::CreateVolume, &name)?;
        insert_new(&mut state.volumes, "PersistentVolume", name, volume)
    }

    async fn delete_volume(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.record(Operation::DeleteVolume, name)?;
        remove_existing(&mut state.volumes, "PersistentVolume", name)
    }

    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        let name = claim.name_any();
        let mut state = self.record(Operation::CreateClaim, &name)?;
        insert_new(&mut state.claims, "PersistentVolumeClaim", name, claim)
    }

    async fn read_claim_phase(&self, name: &str) -> ClusterResult<Option<String>> {
        let state = self.record(Operation::ReadClaimPhase, name)?;
        if state.claims.contains_key(name) {
            Ok(Some("Bound".to_string()))
        } else {
            Err(ClusterError::NotFound {
                kind: "PersistentVolumeClaim",
                name: name.to_string(),
            })
        }
    }

    async fn delete_claim(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.record(Operation::DeleteClaim, name)?;
        remove_existing(&mut state.claims, "PersistentVolumeClaim", name)
    }

    async fn list_secret_names(&self) -> ClusterResult<Vec<String>> {
        let state = self.record(Operation::ListSecrets, "*")?;
        Ok(state.secrets.keys().cloned().collect())
    }

    async fn create_secret(&self, secret: &Secret) -> ClusterResult<Secret> {
        let name = secret.name_any();
        let mut state = self.record(Operation::CreateSecret, &name)?;
        insert_new(&mut state.secrets, "Secret", name, secret)
    }

    async fn create_pod(&self, pod: &Pod) -> ClusterResult<Pod> {
        let name = pod.name_any();
        let mut state = self.record(Operation::CreatePod, &name)?;
        insert_new(&mut state.pods, "Pod", name, pod)
    }

    async fn read_pod_phase(&self, name: &str) -> ClusterResult<Option<String>> {
        let mut state = self.record(Operation::ReadPodPhase, name)?;
        if !state.pods.contains_key(name) {
            return Err(ClusterError::NotFound {
                kind: "Pod",
                name: name.to_string(),
            });
        }
        if let Some(next) = state.phase_script.pop_front() {
            state.last_phase = Some(next);
        }
        Ok(state.last_phase.clone().or_else(|| Some("Pending".to_string())))
    }

    async fn pod_logs(&self, name: &str) -> ClusterResult<String> {
        let state = self.record(Operation::PodLogs, name)?;
        Ok(state.pod_logs.clone())
    }

    async fn list_pod_names(&self) -> ClusterResult<Vec<String>> {
        let state = self.record(Operation::ListPods, "*")?;
        Ok(state.pods.keys().cloned().collect())
    }

    async fn delete_pod(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.record(Operation::DeletePod, name)?;
        remove_existing(&mut state.pods, "Pod", name)
    }
}
