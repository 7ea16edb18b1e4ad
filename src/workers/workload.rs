use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;

use super::drive;
use super::StressStep;
use crate::cluster::ClusterHandle;
use crate::config::StressConfig;
use crate::signal::RunGate;
use crate::utils::convert::kv;
use crate::utils::convert::value_with_size;
use crate::StepError;

pub(crate) const VALUE_SIZE: usize = 64;

/// Deterministic payload for one numbered write: a fixed-size value
/// carrying its own key in the tail, so a read-back detects both loss
/// and cross-key corruption.
pub(crate) fn payload_for(key: &[u8]) -> Vec<u8> {
    let mut value = value_with_size(VALUE_SIZE);
    value[VALUE_SIZE - key.len()..].copy_from_slice(key);
    value
}

/// Write workload: puts a monotonically numbered entry against the live
/// cluster, then reads it back. Availability errors are expected while
/// members churn; an acknowledged write that is then unreadable is not.
pub struct WriteWorkload {
    cluster: Arc<dyn ClusterHandle>,
    pacing: Duration,
    next_seq: u64,
}

impl WriteWorkload {
    pub fn new(cluster: Arc<dyn ClusterHandle>, stress: &StressConfig) -> Self {
        Self {
            cluster,
            pacing: stress.workload_pacing(),
            next_seq: 0,
        }
    }

    /// Runs until the gate closes; true means no invariant was violated.
    pub async fn run(mut self, gate: RunGate) -> bool {
        drive(&mut self, &gate).await
    }
}

#[async_trait]
impl StressStep for WriteWorkload {
    fn name(&self) -> &'static str {
        "workload"
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn step(&mut self) -> std::result::Result<(), StepError> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = kv(seq);
        let value = payload_for(&key);

        self.cluster.put(key.clone(), value.clone()).await?;

        // The write is acknowledged committed from here on; losing it
        // is an invariant violation, not a transient condition.
        match self.cluster.get(key).await {
            Ok(Some(read)) if read == value => Ok(()),
            Ok(Some(_)) => Err(StepError::Invariant(format!(
                "write {seq} read back with a corrupted payload"
            ))),
            Ok(None) => Err(StepError::Invariant(format!(
                "committed write {seq} is unreadable"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
