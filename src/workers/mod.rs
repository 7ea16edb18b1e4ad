//! The three stress workers and their shared drive loop.
//!
//! Each worker repeats one domain action against the cluster while the
//! run gate stays open. Outcomes are classified per iteration: an
//! expected transient condition is logged and the loop continues, an
//! invariant violation trips the shared failure signal and ends the
//! worker with a failing verdict. Tripping never interrupts another
//! worker mid-operation; it only stops new iterations from starting.

mod backup;
mod churn;
mod workload;
pub use backup::*;
pub use churn::*;
pub use workload::*;

#[cfg(test)]
mod workload_test;

use async_trait::async_trait;
use tokio::time::sleep;
use tokio::time::Duration;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::metrics::record_worker_failure;
use crate::metrics::TRANSIENT_CONDITIONS;
use crate::metrics::WORKER_ITERATIONS;
use crate::signal::RunGate;
use crate::StepError;

/// One domain action of a stress worker, repeated by [`drive`].
#[async_trait]
pub(crate) trait StressStep: Send {
    /// Stable name used in logs, metric labels and the failure verdict.
    fn name(&self) -> &'static str;

    /// Pause between iterations.
    fn pacing(&self) -> Duration;

    async fn step(&mut self) -> std::result::Result<(), StepError>;
}

/// Retry-until-cancelled loop shared by all worker variants. Returns
/// whether the worker ran to the end of the gate without violating an
/// invariant.
pub(crate) async fn drive(worker: &mut dyn StressStep, gate: &RunGate) -> bool {
    info!(worker = worker.name(), "stress worker running");

    while gate.keep_going() {
        match worker.step().await {
            Ok(()) => {
                WORKER_ITERATIONS.with_label_values(&[worker.name()]).inc();
            }
            Err(StepError::Transient(detail)) => {
                TRANSIENT_CONDITIONS.with_label_values(&[worker.name()]).inc();
                warn!(worker = worker.name(), %detail, "transient condition, continuing");
            }
            Err(StepError::Invariant(detail)) => {
                record_worker_failure(worker.name());
                error!(worker = worker.name(), %detail, "invariant violated, tripping the failure signal");
                gate.signal().trip();
                return false;
            }
        }
        sleep(worker.pacing()).await;
    }

    info!(worker = worker.name(), "stress worker wound down cleanly");
    true
}
