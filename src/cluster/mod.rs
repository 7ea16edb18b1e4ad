//! Cluster collaborator interface and the in-process implementation.
//!
//! The harness itself never looks inside the cluster: everything it
//! needs is behind [`ClusterHandle`] — lifecycle, member enumeration
//! with advertised backup addresses, per-member stop/start, and the
//! application-level read/write surface the workload drives.

mod local;
mod member;
mod settings;
pub use local::*;
pub use settings::*;

#[cfg(test)]
mod local_test;

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ClusterError;

/// Whether a member votes in the consensus protocol or passively
/// consumes replicated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberClass {
    Core,
    Edge,
}

impl fmt::Display for MemberClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberClass::Core => write!(f, "core"),
            MemberClass::Edge => write!(f, "edge"),
        }
    }
}

/// Identity of one cluster member: its class plus its index within that
/// class. Displayed as `core-0`, `edge-2`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId {
    pub class: MemberClass,
    pub index: u32,
}

impl MemberId {
    pub fn new(class: MemberClass, index: u32) -> Self {
        Self { class, index }
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.class, self.index)
    }
}

/// One row of the member enumeration exposed to the workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: MemberId,
    pub backup_address: SocketAddr,
}

/// Lifecycle and data surface of the cluster under stress.
///
/// Mutated concurrently by the churn worker (stop/start) while the
/// workload and backup workers read from it; implementations own their
/// internal concurrency safety under that interleaving.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterHandle: Send + Sync + 'static {
    /// Bring every configured member up. Called exactly once per run.
    async fn start(&self) -> std::result::Result<(), ClusterError>;

    /// Stop all members and refuse further operations. Runs on every
    /// exit path of the harness, so it must be idempotent.
    async fn shutdown(&self) -> std::result::Result<(), ClusterError>;

    /// Stable member enumeration; membership does not change during a
    /// run, only liveness does.
    fn members(&self) -> Vec<MemberInfo>;

    async fn stop_member(&self, id: MemberId) -> std::result::Result<(), ClusterError>;

    async fn start_member(&self, id: MemberId) -> std::result::Result<(), ClusterError>;

    async fn is_member_live(&self, id: MemberId) -> bool;

    /// Application-level write; acknowledged only once a quorum of core
    /// members has accepted it.
    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> std::result::Result<(), ClusterError>;

    /// Application-level read from any live member.
    async fn get(&self, key: Vec<u8>) -> std::result::Result<Option<Vec<u8>>, ClusterError>;
}
