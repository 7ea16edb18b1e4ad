use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nanoid::nanoid;
use tokio::time::Duration;
use tracing::debug;

use super::drive;
use super::StressStep;
use crate::backup::BackupRunner;
use crate::cluster::MemberInfo;
use crate::config::StressConfig;
use crate::metrics::BACKUP_ATTEMPTS;
use crate::signal::RunGate;
use crate::BackupError;
use crate::StepError;

/// Backup worker: walks the member enumeration round-robin, taking one
/// store copy per iteration into a fresh artifact directory. A target
/// that is down mid-churn is expected; a protocol or I/O failure is
/// not.
pub struct BackupWorker {
    runner: Arc<dyn BackupRunner>,
    targets: Vec<MemberInfo>,
    backups_dir: PathBuf,
    pacing: Duration,
    cursor: usize,
}

impl BackupWorker {
    pub fn new(
        runner: Arc<dyn BackupRunner>,
        targets: Vec<MemberInfo>,
        backups_dir: PathBuf,
        stress: &StressConfig,
    ) -> Self {
        Self {
            runner,
            targets,
            backups_dir,
            pacing: stress.backup_pacing(),
            cursor: 0,
        }
    }

    /// Runs until the gate closes; true means no backup attempt failed
    /// with anything worse than an unavailable target.
    pub async fn run(mut self, gate: RunGate) -> bool {
        drive(&mut self, &gate).await
    }
}

#[async_trait]
impl StressStep for BackupWorker {
    fn name(&self) -> &'static str {
        "backup"
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn step(&mut self) -> std::result::Result<(), StepError> {
        let target = &self.targets[self.cursor % self.targets.len()];
        self.cursor = self.cursor.wrapping_add(1);

        let artifact = self.backups_dir.join(format!("{}-{}", target.id, nanoid!(10)));
        match self.runner.backup(target.backup_address, &artifact).await {
            Ok(()) => {
                BACKUP_ATTEMPTS.with_label_values(&["success"]).inc();
                debug!(member = %target.id, artifact = %artifact.display(), "store copy taken");
                Ok(())
            }
            Err(e @ BackupError::Unavailable { .. }) => {
                BACKUP_ATTEMPTS.with_label_values(&["unavailable"]).inc();
                Err(e.into())
            }
            Err(e) => {
                BACKUP_ATTEMPTS.with_label_values(&["failed"]).inc();
                Err(e.into())
            }
        }
    }
}
