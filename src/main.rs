use std::path::Path;

use cluster_stress::start_server;
use cluster_stress::utils::fs::open_file_for_append;
use cluster_stress::HarnessConfig;
use cluster_stress::Result;
use cluster_stress::SetupError;
use cluster_stress::StressHarness;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let settings = HarnessConfig::load(None)?;

    // Initializing Logs
    let _guard = init_observability(&settings.topology.working_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());
    if settings.monitoring.prometheus_enabled {
        let port = settings.monitoring.prometheus_port;
        tokio::spawn(start_server(port, graceful_rx.clone()));
        info!(port, "prometheus metrics server started");
    }

    let harness = StressHarness::new(settings);

    // CTRL+C trips the shared failure signal; every worker winds down
    // at its next iteration boundary and the run is reported failed.
    let abort = harness.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("CTRL+C detected, aborting the stress run");
            abort.trip();
        }
    });

    info!("stress run starting");
    let verdict = harness.execute().await;
    let _ = graceful_tx.send(());

    match verdict {
        Ok(()) => {
            info!("stress run passed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "stress run failed");
            Err(e)
        }
    }
}

fn init_observability(working_dir: &Path) -> Result<WorkerGuard> {
    let log_file =
        open_file_for_append(working_dir.join("stress.log")).map_err(|source| {
            SetupError::WorkingDirectory {
                path: working_dir.to_path_buf(),
                source,
            }
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
