//! Shared run-termination state for the stress workers.
//!
//! [`FailureSignal`] is a one-way flag: the first worker that detects an
//! unrecoverable condition trips it, and every other worker refuses to
//! start a new iteration. There is deliberately no reset path.
//! [`RunGate`] combines the signal with the configured run deadline into
//! the single predicate every worker loop polls.

use tokio::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;


/// Process-wide failure flag shared by all stress workers.
///
/// Backed by a one-shot [`CancellationToken`]: tripping is idempotent
/// under concurrent writers and can never be undone. Tripping does not
/// interrupt an in-flight operation; it only stops new iterations.
#[derive(Clone, Debug, Default)]
pub struct FailureSignal {
    token: CancellationToken,
}

impl FailureSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Mark the run as failed. Safe to call from any worker, any number
    /// of times.
    pub fn trip(&self) {
        if !self.token.is_cancelled() {
            warn!("failure signal tripped, stress workers will wind down");
        }
        self.token.cancel();
    }

    pub fn is_tripped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Termination predicate for the worker loops: keep going while the
/// failure signal is untripped and the run deadline has not passed.
#[derive(Clone, Debug)]
pub struct RunGate {
    signal: FailureSignal,
    deadline: Instant,
}

impl RunGate {
    pub fn new(duration: Duration, signal: FailureSignal) -> Self {
        Self {
            signal,
            deadline: Instant::now() + duration,
        }
    }

    /// Cheap and side-effect free; polled on every worker iteration.
    pub fn keep_going(&self) -> bool {
        !self.signal.is_tripped() && Instant::now() < self.deadline
    }

    pub fn signal(&self) -> &FailureSignal {
        &self.signal
    }
}
