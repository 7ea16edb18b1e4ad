//! Orchestrates one stress run end to end.
//!
//! Ordering is strict and scoped: prepare the working directories,
//! construct and start the cluster, verify every member is live, run
//! the three workers concurrently, join all of them regardless of
//! individual failure, shut the cluster down on every exit path, and
//! only after a fully clean verdict destroy the directories. A failing
//! run names the workers that failed and leaves everything on disk for
//! post-mortem inspection.


use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::error;
use tracing::info;

use crate::backup::BackupRunner;
use crate::backup::LocalStoreCopy;
use crate::cluster::setting_keys;
use crate::cluster::ClusterHandle;
use crate::cluster::InstanceSettings;
use crate::cluster::LocalCluster;
use crate::cluster::MemberClass;
use crate::config::HarnessConfig;
use crate::signal::FailureSignal;
use crate::signal::RunGate;
use crate::utils::fs::ensure_exists_and_empty;
use crate::workers::BackupWorker;
use crate::workers::ChurnWorker;
use crate::workers::WriteWorkload;
use crate::ClusterError;
use crate::Error;
use crate::Result;
use crate::SetupError;

const WORKER_NAMES: [&str; 3] = ["workload", "churn", "backup"];

/// One stress run: a validated configuration plus the failure signal
/// the run's workers share.
pub struct StressHarness {
    config: HarnessConfig,
    signal: FailureSignal,
}

impl StressHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            signal: FailureSignal::new(),
        }
    }

    /// Clone of the run's failure signal. Tripping it from outside
    /// (e.g. on SIGINT) winds the workers down and fails the run.
    pub fn signal(&self) -> FailureSignal {
        self.signal.clone()
    }

    /// Production entry point: prepares empty working directories,
    /// builds the in-process cluster with its store-copy collaborator,
    /// and exercises them.
    pub async fn execute(&self) -> Result<()> {
        let topology = &self.config.topology;
        let cluster_dir = prepare_dir(topology.cluster_dir())?;
        prepare_dir(topology.backups_dir())?;

        let cluster = Arc::new(LocalCluster::new(
            &cluster_dir,
            topology.core_count,
            topology.edge_count,
            &self.core_settings(),
            &self.edge_settings(),
        )?);
        let backup_runner = Arc::new(LocalStoreCopy::new(Arc::clone(&cluster)));

        self.run_with(cluster, backup_runner).await
    }

    /// Orchestrator core over the two collaborator traits, so tests can
    /// swap in failing ones. The cluster is shut down on every exit
    /// path, including a failed start.
    pub async fn run_with(
        &self,
        cluster: Arc<dyn ClusterHandle>,
        backup_runner: Arc<dyn BackupRunner>,
    ) -> Result<()> {
        let outcome = self.exercise(Arc::clone(&cluster), backup_runner).await;
        let shutdown = cluster.shutdown().await;

        let failed = outcome?;
        shutdown?;

        if !failed.is_empty() {
            error!(workers = ?failed, "stress run failed, working directories preserved for inspection");
            return Err(Error::WorkersFailed(failed));
        }

        self.remove_working_dirs()?;
        info!("stress run passed, working directories removed");
        Ok(())
    }

    /// Start, verify liveness, run the three workers to their joint
    /// verdict. Returns the names of the workers that failed.
    async fn exercise(
        &self,
        cluster: Arc<dyn ClusterHandle>,
        backup_runner: Arc<dyn BackupRunner>,
    ) -> Result<Vec<&'static str>> {
        cluster.start().await?;

        // Every configured member must be serving before any stressor
        // is allowed to make the cluster's life harder.
        for member in cluster.members() {
            if !cluster.is_member_live(member.id).await {
                return Err(ClusterError::MemberStopped(member.id).into());
            }
        }

        let stress = &self.config.stress;
        let gate = RunGate::new(stress.duration(), self.signal.clone());
        info!(duration = ?stress.duration(), "launching stress workers");

        let workload = WriteWorkload::new(Arc::clone(&cluster), stress);
        let churn = ChurnWorker::new(Arc::clone(&cluster), stress);
        let backup = BackupWorker::new(
            backup_runner,
            cluster.members(),
            self.config.topology.backups_dir(),
            stress,
        );

        let handles = [
            tokio::spawn({
                let gate = gate.clone();
                async move { workload.run(gate).await }
            }),
            tokio::spawn({
                let gate = gate.clone();
                async move { churn.run(gate).await }
            }),
            tokio::spawn(async move { backup.run(gate).await }),
        ];

        // Join all three regardless of individual failure; a tripped
        // signal never cancels an iteration already in flight.
        let mut failed = Vec::new();
        for (name, joined) in WORKER_NAMES.iter().zip(join_all(handles).await) {
            if !joined? {
                failed.push(*name);
            }
        }
        Ok(failed)
    }

    fn core_settings(&self) -> InstanceSettings {
        let mut settings = InstanceSettings::new();
        // Aggressive log maintenance keeps recovery honest while
        // members churn.
        settings.set_shared(setting_keys::LOG_ROTATION_SIZE, "1K");
        settings.set_shared(setting_keys::LOG_PRUNING_INTERVAL, "1s");
        settings.set_shared(setting_keys::LOG_PRUNING_STRATEGY, "keep_none");
        self.configure_backup(&mut settings, MemberClass::Core);
        settings
    }

    fn edge_settings(&self) -> InstanceSettings {
        let mut settings = InstanceSettings::new();
        self.configure_backup(&mut settings, MemberClass::Edge);
        settings
    }

    fn configure_backup(&self, settings: &mut InstanceSettings, class: MemberClass) {
        let topology = self.config.topology.clone();
        settings.set_shared(setting_keys::BACKUP_ENABLED, "true");
        settings.set_per_instance(setting_keys::BACKUP_ADDRESS, move |index| {
            topology.backup_address(class, index).to_string()
        });
    }

    fn remove_working_dirs(&self) -> Result<()> {
        let topology = &self.config.topology;
        for dir in [topology.cluster_dir(), topology.backups_dir()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|source| SetupError::Cleanup {
                    path: dir.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

fn prepare_dir(dir: PathBuf) -> Result<PathBuf> {
    Ok(ensure_exists_and_empty(&dir).map_err(|source| SetupError::WorkingDirectory {
        path: dir.clone(),
        source,
    })?)
}
