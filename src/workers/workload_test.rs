use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Duration;

use super::*;
use crate::cluster::MockClusterHandle;
use crate::config::StressConfig;
use crate::signal::FailureSignal;
use crate::signal::RunGate;
use crate::utils::convert::vk;
use crate::ClusterError;

fn stress() -> StressConfig {
    StressConfig {
        workload_pacing_in_ms: 10,
        ..Default::default()
    }
}

fn gate_for(secs: u64) -> (FailureSignal, RunGate) {
    let signal = FailureSignal::new();
    let gate = RunGate::new(Duration::from_secs(secs), signal.clone());
    (signal, gate)
}

#[tokio::test(start_paused = true)]
async fn numbered_writes_reading_back_keep_the_worker_alive() {
    let mut cluster = MockClusterHandle::new();
    let written = Arc::new(Mutex::new(Vec::new()));
    let written_in = Arc::clone(&written);
    cluster.expect_put().returning(move |key, _| {
        written_in.lock().push(vk(&key));
        Ok(())
    });
    cluster
        .expect_get()
        .returning(|key| Ok(Some(payload_for(&key))));

    let (signal, gate) = gate_for(1);
    let worker = WriteWorkload::new(Arc::new(cluster), &stress());

    assert!(worker.run(gate).await);
    assert!(!signal.is_tripped());

    // Each iteration wrote the next sequence number.
    let written = written.lock();
    assert!(!written.is_empty());
    for (expected, seq) in written.iter().enumerate() {
        assert_eq!(expected as u64, *seq);
    }
}

#[tokio::test(start_paused = true)]
async fn availability_errors_are_tolerated_until_the_deadline() {
    let mut cluster = MockClusterHandle::new();
    cluster.expect_put().returning(|_, _| {
        Err(ClusterError::NoQuorum {
            live: 1,
            required: 2,
        })
    });

    let (signal, gate) = gate_for(1);
    let worker = WriteWorkload::new(Arc::new(cluster), &stress());

    assert!(worker.run(gate).await);
    assert!(!signal.is_tripped());
}

#[tokio::test(start_paused = true)]
async fn unreadable_committed_write_trips_the_signal() {
    let mut cluster = MockClusterHandle::new();
    cluster.expect_put().returning(|_, _| Ok(()));
    cluster.expect_get().returning(|_| Ok(None));

    let (signal, gate) = gate_for(3600);
    let worker = WriteWorkload::new(Arc::new(cluster), &stress());

    assert!(!worker.run(gate).await);
    assert!(signal.is_tripped());
}

#[tokio::test(start_paused = true)]
async fn corrupted_read_back_trips_the_signal() {
    let mut cluster = MockClusterHandle::new();
    cluster.expect_put().returning(|_, _| Ok(()));
    cluster
        .expect_get()
        .returning(|_| Ok(Some(b"garbage".to_vec())));

    let (signal, gate) = gate_for(3600);
    let worker = WriteWorkload::new(Arc::new(cluster), &stress());

    assert!(!worker.run(gate).await);
    assert!(signal.is_tripped());
}

#[tokio::test(start_paused = true)]
async fn non_availability_cluster_errors_trip_the_signal() {
    let mut cluster = MockClusterHandle::new();
    cluster.expect_put().returning(|_, _| {
        Err(ClusterError::Storage(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk gone",
        )))
    });

    let (signal, gate) = gate_for(3600);
    let worker = WriteWorkload::new(Arc::new(cluster), &stress());

    assert!(!worker.run(gate).await);
    assert!(signal.is_tripped());
}
