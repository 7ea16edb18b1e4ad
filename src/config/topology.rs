use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::cluster::MemberClass;
use crate::Error;
use crate::Result;

/// Shape of the cluster under stress and where its state lives on disk.
///
/// Backup addresses are derived, never configured per member: member
/// `index` of a class advertises `127.0.0.1:(base_port + index)`, so
/// every member of a class gets a unique, deterministic address.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopologyConfig {
    /// Members participating in the consensus protocol
    #[serde(default = "default_core_count")]
    pub core_count: usize,

    /// Members consuming replicated state without voting
    #[serde(default = "default_edge_count")]
    pub edge_count: usize,

    /// Root under which `cluster/` and `backups/` are created
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    #[serde(default = "default_base_core_backup_port")]
    pub base_core_backup_port: u16,

    #[serde(default = "default_base_edge_backup_port")]
    pub base_edge_backup_port: u16,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            core_count: default_core_count(),
            edge_count: default_edge_count(),
            working_dir: default_working_dir(),
            base_core_backup_port: default_base_core_backup_port(),
            base_edge_backup_port: default_base_edge_backup_port(),
        }
    }
}

impl TopologyConfig {
    /// Validates the topology
    /// # Errors
    /// Returns a message-carrying `Error::Config` if any rule is violated
    pub fn validate(&self) -> Result<()> {
        if self.core_count == 0 {
            return Err(Error::Config(ConfigError::Message(
                "core_count must be at least 1".into(),
            )));
        }

        if self.working_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "working_dir cannot be empty".into(),
            )));
        }

        self.validate_port_range("base_core_backup_port", self.base_core_backup_port, self.core_count)?;
        self.validate_port_range("base_edge_backup_port", self.base_edge_backup_port, self.edge_count)?;

        // The two per-class ranges must not hand the same port to two members.
        let core_end = self.base_core_backup_port as usize + self.core_count;
        let edge_end = self.base_edge_backup_port as usize + self.edge_count;
        let overlaps = (self.base_core_backup_port as usize) < edge_end
            && (self.base_edge_backup_port as usize) < core_end;
        if self.edge_count > 0 && overlaps {
            return Err(Error::Config(ConfigError::Message(format!(
                "backup port ranges overlap: cores {}..{} vs edges {}..{}",
                self.base_core_backup_port, core_end, self.base_edge_backup_port, edge_end
            ))));
        }

        Ok(())
    }

    fn validate_port_range(&self, name: &str, base: u16, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if base == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "{name} cannot be 0"
            ))));
        }
        if base as usize + count > u16::MAX as usize {
            return Err(Error::Config(ConfigError::Message(format!(
                "{name} {base} leaves no room for {count} members"
            ))));
        }
        Ok(())
    }

    pub fn member_count(&self) -> usize {
        self.core_count + self.edge_count
    }

    pub fn cluster_dir(&self) -> PathBuf {
        self.working_dir.join("cluster")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.working_dir.join("backups")
    }

    /// Advertised backup address for one member, unique per class/index.
    pub fn backup_address(&self, class: MemberClass, index: u32) -> SocketAddr {
        let base = match class {
            MemberClass::Core => self.base_core_backup_port,
            MemberClass::Edge => self.base_edge_backup_port,
        };
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), base + index as u16)
    }
}

fn default_core_count() -> usize {
    3
}
fn default_edge_count() -> usize {
    1
}
fn default_working_dir() -> PathBuf {
    std::env::temp_dir().join("cluster-stress")
}
fn default_base_core_backup_port() -> u16 {
    8000
}
fn default_base_edge_backup_port() -> u16 {
    9000
}
