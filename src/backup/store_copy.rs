use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::BackupRunner;
use crate::cluster::LocalCluster;
use crate::BackupError;

/// Store-copy implementation for [`LocalCluster`]: resolves the
/// advertised backup address to a member and copies its durable files
/// into the destination directory.
///
/// Classification mirrors what a remote store copy would report: an
/// address nobody advertises is a protocol error, a down member is
/// unavailable (the churn worker will have restarted it by a later
/// pass), and anything failing mid-copy is an I/O error.
pub struct LocalStoreCopy {
    cluster: Arc<LocalCluster>,
}

impl LocalStoreCopy {
    pub fn new(cluster: Arc<LocalCluster>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl BackupRunner for LocalStoreCopy {
    async fn backup(
        &self,
        target: SocketAddr,
        dest: &Path,
    ) -> std::result::Result<(), BackupError> {
        let member = self.cluster.member_by_backup_address(target).ok_or_else(|| {
            BackupError::Protocol {
                address: target,
                detail: "no member advertises this backup address".into(),
            }
        })?;

        if !member.backup_enabled() {
            return Err(BackupError::Protocol {
                address: target,
                detail: format!("member {} does not accept store copies", member.id()),
            });
        }

        if !member.is_running() {
            return Err(BackupError::Unavailable {
                address: target,
                detail: format!("member {} is not serving", member.id()),
            });
        }

        match copy_dir_files(member.data_dir(), dest).await {
            Ok(copied) => {
                debug!(member = %member.id(), files = copied, dest = %dest.display(), "store copy complete");
                Ok(())
            }
            // A file listed and then gone means the member rewrote its
            // store under us (restart, log maintenance): retry later.
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BackupError::Unavailable {
                address: target,
                detail: format!("member {} changed its store mid-copy", member.id()),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

async fn copy_dir_files(src: &Path, dest: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(dest).await?;

    let mut entries = tokio::fs::read_dir(src).await?;
    let mut copied = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::copy(entry.path(), dest.join(entry.file_name())).await?;
            copied += 1;
        }
    }
    Ok(copied)
}
