use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tokio::time::Duration;

use super::drive;
use super::StressStep;
use crate::cluster::ClusterHandle;
use crate::cluster::MemberId;
use crate::config::StressConfig;
use crate::signal::RunGate;
use crate::utils::async_task::poll_until;
use crate::StepError;

/// Churn worker: stops a random member, waits, restarts it, and holds
/// the cluster to a bounded rejoin. A member that never comes back is
/// the one failure churn itself can prove; everything racing with the
/// other workers surfaces as an availability error and is tolerated.
pub struct ChurnWorker {
    cluster: Arc<dyn ClusterHandle>,
    members: Vec<MemberId>,
    pause: Duration,
    rejoin_timeout: Duration,
    rejoin_poll_interval: Duration,
}

impl ChurnWorker {
    /// Membership is stable for the length of a run, so the target set
    /// is snapshotted once. The topology guarantees at least one core
    /// member.
    pub fn new(cluster: Arc<dyn ClusterHandle>, stress: &StressConfig) -> Self {
        let members = cluster.members().iter().map(|m| m.id).collect();
        Self {
            cluster,
            members,
            pause: stress.churn_pause(),
            rejoin_timeout: stress.rejoin_timeout(),
            rejoin_poll_interval: stress.rejoin_poll_interval(),
        }
    }

    /// Runs until the gate closes; true means every stop/start cycle
    /// ended with the member live again within the bound.
    pub async fn run(mut self, gate: RunGate) -> bool {
        drive(&mut self, &gate).await
    }
}

#[async_trait]
impl StressStep for ChurnWorker {
    fn name(&self) -> &'static str {
        "churn"
    }

    fn pacing(&self) -> Duration {
        self.pause
    }

    async fn step(&mut self) -> std::result::Result<(), StepError> {
        let target = {
            let mut rng = rand::thread_rng();
            self.members[rng.gen_range(0..self.members.len())]
        };

        self.cluster.stop_member(target).await?;
        sleep(self.pause).await;
        self.cluster.start_member(target).await?;

        let cluster = &self.cluster;
        let rejoined = poll_until(self.rejoin_timeout, self.rejoin_poll_interval, || async move {
            cluster.is_member_live(target).await
        })
        .await;

        if rejoined {
            Ok(())
        } else {
            Err(StepError::Invariant(format!(
                "member {target} did not rejoin within {:?} of its restart",
                self.rejoin_timeout
            )))
        }
    }
}
