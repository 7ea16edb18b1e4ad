use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::info;
use tracing::warn;

use super::member::LocalMember;
use super::ClusterHandle;
use super::InstanceSettings;
use super::MemberClass;
use super::MemberId;
use super::MemberInfo;
use crate::ClusterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Shutdown,
}

/// In-process cluster of core and edge members.
///
/// Writes are acknowledged once a majority of core members accepted
/// them; edge members receive every committed entry best-effort and
/// catch up on restart, as does a core member that was down when an
/// entry committed. A stopped member keeps only its durable log, so
/// stop/start cycles genuinely exercise recovery.
pub struct LocalCluster {
    members: Vec<Arc<LocalMember>>,
    core_count: usize,
    /// Entries acknowledged to the client; the catch-up source for
    /// members that were down when an entry committed.
    committed: DashMap<Vec<u8>, Vec<u8>>,
    phase: RwLock<Phase>,
    /// Membership transitions are exclusive against data operations so
    /// that a member is never mid-restart while an entry commits.
    ops: RwLock<()>,
}

impl LocalCluster {
    /// Bootstraps all member data directories under `cluster_dir` with
    /// their per-instance settings resolved. Members stay down until
    /// [`ClusterHandle::start`].
    pub fn new(
        cluster_dir: &Path,
        core_count: usize,
        edge_count: usize,
        core_settings: &InstanceSettings,
        edge_settings: &InstanceSettings,
    ) -> std::result::Result<Self, ClusterError> {
        let mut members = Vec::with_capacity(core_count + edge_count);

        for index in 0..core_count as u32 {
            let id = MemberId::new(MemberClass::Core, index);
            members.push(Arc::new(LocalMember::bootstrap(
                id,
                cluster_dir,
                core_settings.resolve(index),
            )?));
        }
        for index in 0..edge_count as u32 {
            let id = MemberId::new(MemberClass::Edge, index);
            members.push(Arc::new(LocalMember::bootstrap(
                id,
                cluster_dir,
                edge_settings.resolve(index),
            )?));
        }

        Ok(Self {
            members,
            core_count,
            committed: DashMap::new(),
            phase: RwLock::new(Phase::Created),
            ops: RwLock::new(()),
        })
    }

    fn member(&self, id: MemberId) -> std::result::Result<&Arc<LocalMember>, ClusterError> {
        self.members
            .iter()
            .find(|m| m.id() == id)
            .ok_or(ClusterError::UnknownMember(id))
    }

    pub(crate) fn member_by_backup_address(&self, address: SocketAddr) -> Option<&Arc<LocalMember>> {
        self.members.iter().find(|m| m.info().backup_address == address)
    }

    fn quorum(&self) -> usize {
        self.core_count / 2 + 1
    }

    fn ensure_running(&self) -> std::result::Result<(), ClusterError> {
        match *self.phase.read() {
            Phase::Running => Ok(()),
            Phase::Created | Phase::Shutdown => Err(ClusterError::NotRunning),
        }
    }
}

#[async_trait]
impl ClusterHandle for LocalCluster {
    async fn start(&self) -> std::result::Result<(), ClusterError> {
        let mut phase = self.phase.write();
        match *phase {
            Phase::Created => {}
            Phase::Running => {
                return Err(ClusterError::Lifecycle("cluster already started".into()))
            }
            Phase::Shutdown => {
                return Err(ClusterError::Lifecycle(
                    "cluster cannot be restarted after shutdown".into(),
                ))
            }
        }

        for member in &self.members {
            member.start(&self.committed)?;
        }
        *phase = Phase::Running;
        info!(members = self.members.len(), cores = self.core_count, "cluster started");
        Ok(())
    }

    async fn shutdown(&self) -> std::result::Result<(), ClusterError> {
        let mut phase = self.phase.write();
        if *phase == Phase::Shutdown {
            return Ok(());
        }

        let _ops = self.ops.write();
        for member in &self.members {
            match member.stop() {
                Ok(()) | Err(ClusterError::MemberStopped(_)) => {}
                Err(e) => warn!(member = %member.id(), error = %e, "member refused to stop"),
            }
        }
        *phase = Phase::Shutdown;
        info!("cluster shut down");
        Ok(())
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.members.iter().map(|m| m.info().clone()).collect()
    }

    async fn stop_member(&self, id: MemberId) -> std::result::Result<(), ClusterError> {
        self.ensure_running()?;
        let _ops = self.ops.write();
        self.member(id)?.stop()
    }

    async fn start_member(&self, id: MemberId) -> std::result::Result<(), ClusterError> {
        self.ensure_running()?;
        let _ops = self.ops.write();
        self.member(id)?.start(&self.committed)
    }

    async fn is_member_live(&self, id: MemberId) -> bool {
        self.member(id).map(|m| m.is_running()).unwrap_or(false)
    }

    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> std::result::Result<(), ClusterError> {
        self.ensure_running()?;
        let _ops = self.ops.read();

        let required = self.quorum();
        let mut acks = 0usize;
        let mut live = 0usize;

        for member in self.members.iter().filter(|m| m.id().class == MemberClass::Core) {
            if !member.is_running() {
                continue;
            }
            live += 1;
            match member.apply(&key, &value) {
                Ok(()) => acks += 1,
                Err(ClusterError::MemberStopped(_)) => {}
                Err(e) => {
                    warn!(member = %member.id(), error = %e, "core member rejected entry")
                }
            }
        }

        if acks < required {
            return Err(ClusterError::NoQuorum { live, required });
        }

        self.committed.insert(key.clone(), value.clone());

        for member in self.members.iter().filter(|m| m.id().class == MemberClass::Edge) {
            match member.apply(&key, &value) {
                Ok(()) | Err(ClusterError::MemberStopped(_)) => {}
                Err(e) => {
                    warn!(member = %member.id(), error = %e, "edge member missed entry, will catch up on restart")
                }
            }
        }

        Ok(())
    }

    async fn get(&self, key: Vec<u8>) -> std::result::Result<Option<Vec<u8>>, ClusterError> {
        self.ensure_running()?;
        let _ops = self.ops.read();

        let mut queried = 0usize;
        for member in &self.members {
            match member.read(&key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => queried += 1,
                Err(ClusterError::MemberStopped(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if queried == 0 {
            return Err(ClusterError::NoQuorum { live: 0, required: 1 });
        }
        Ok(None)
    }
}
