//! Stress Harness Error Hierarchy
//!
//! Defines error types for the backup/churn interaction stress harness,
//! categorized by the phase in which they occur (setup, cluster
//! interaction, backup transfer) and by how the stress workers must
//! react to them (transient vs. invariant violation).

use std::net::SocketAddr;
use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

use crate::cluster::MemberId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Working directory preparation failures, aborts the run before any
    /// worker is launched
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Cluster lifecycle failures outside any worker loop (start/shutdown)
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// One or more stress workers reported failure; working directories
    /// are preserved for inspection
    #[error("stress run failed, failing workers: {0:?}")]
    WorkersFailed(Vec<&'static str>),

    /// A worker task panicked or was aborted before reporting a result
    #[error("worker task died before reporting: {0}")]
    TaskDied(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to prepare working directory {path}: {source}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove working directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by a [`ClusterHandle`](crate::cluster::ClusterHandle).
///
/// The harness runs three workers against a cluster that is being
/// churned on purpose, so a sharp line is drawn between availability
/// errors (expected while members restart) and everything else.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Target member is stopped or mid-restart
    #[error("member {0} is not serving")]
    MemberStopped(MemberId),

    /// Not enough members alive to serve the operation
    #[error("insufficient live members: {live}/{required}")]
    NoQuorum { live: usize, required: usize },

    /// Target member is already running
    #[error("member {0} is already running")]
    AlreadyRunning(MemberId),

    /// Cluster has not been started or has been shut down
    #[error("cluster is not running")]
    NotRunning,

    /// No member with the given identity exists in the topology
    #[error("unknown member {0}")]
    UnknownMember(MemberId),

    /// start/shutdown called out of order
    #[error("cluster lifecycle violation: {0}")]
    Lifecycle(String),

    /// Per-instance settings rejected at member construction
    #[error("invalid member settings: {0}")]
    Settings(String),

    /// Durable state could not be read or written
    #[error("cluster storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Durable log contains records that no longer decode
    #[error("corrupt durable log for member {member}: {detail}")]
    CorruptLog { member: MemberId, detail: String },
}

impl ClusterError {
    /// True for errors attributable to a member (or the whole cluster)
    /// being down or mid-restart. Workers treat these as expected while
    /// churn is in progress; everything else violates an invariant.
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            ClusterError::MemberStopped(_)
                | ClusterError::NoQuorum { .. }
                | ClusterError::AlreadyRunning(_)
                | ClusterError::NotRunning
        )
    }
}

/// Errors raised by a [`BackupRunner`](crate::backup::BackupRunner).
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Target member currently unreachable; retried on a later pass
    #[error("backup target {address} unavailable: {detail}")]
    Unavailable { address: SocketAddr, detail: String },

    /// The store copy itself misbehaved
    #[error("store copy protocol violation at {address}: {detail}")]
    Protocol { address: SocketAddr, detail: String },

    /// Artifact could not be written
    #[error("backup i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome classification for one iteration of a stress worker.
///
/// Transient errors keep the loop alive; an invariant violation trips
/// the shared failure signal and ends the whole run.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("transient cluster condition: {0}")]
    Transient(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl From<ClusterError> for StepError {
    fn from(e: ClusterError) -> Self {
        if e.is_availability() {
            StepError::Transient(e.to_string())
        } else {
            StepError::Invariant(e.to_string())
        }
    }
}

impl From<BackupError> for StepError {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::Unavailable { .. } => StepError::Transient(e.to_string()),
            BackupError::Protocol { .. } | BackupError::Io(_) => {
                StepError::Invariant(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MemberClass, MemberId};

    fn member() -> MemberId {
        MemberId::new(MemberClass::Core, 0)
    }

    #[test]
    fn availability_errors_classify_as_transient() {
        for e in [
            ClusterError::MemberStopped(member()),
            ClusterError::NoQuorum { live: 1, required: 2 },
            ClusterError::AlreadyRunning(member()),
            ClusterError::NotRunning,
        ] {
            assert!(e.is_availability());
            assert!(matches!(StepError::from(e), StepError::Transient(_)));
        }
    }

    #[test]
    fn storage_and_membership_errors_classify_as_invariant() {
        let corrupt = ClusterError::CorruptLog {
            member: member(),
            detail: "truncated record".into(),
        };
        assert!(!corrupt.is_availability());
        assert!(matches!(StepError::from(corrupt), StepError::Invariant(_)));

        let unknown = ClusterError::UnknownMember(member());
        assert!(matches!(StepError::from(unknown), StepError::Invariant(_)));
    }

    #[test]
    fn backup_unavailable_is_transient_everything_else_fatal() {
        let addr: SocketAddr = "127.0.0.1:8000".parse().unwrap();
        let unavailable = BackupError::Unavailable {
            address: addr,
            detail: "member restarting".into(),
        };
        assert!(matches!(StepError::from(unavailable), StepError::Transient(_)));

        let protocol = BackupError::Protocol {
            address: addr,
            detail: "unexpected response".into(),
        };
        assert!(matches!(StepError::from(protocol), StepError::Invariant(_)));

        let io = BackupError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(matches!(StepError::from(io), StepError::Invariant(_)));
    }
}
