use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use lazy_static::lazy_static;
use prometheus::GaugeVec;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref WORKER_ITERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("stress_worker_iterations", "completed iterations per stress worker"),
        &["worker"]
    )
    .expect("metric can not be created");

    pub static ref TRANSIENT_CONDITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stress_worker_transient_conditions",
            "expected transient conditions tolerated per stress worker"
        ),
        &["worker"]
    )
    .expect("metric can not be created");

    pub static ref BACKUP_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("stress_backup_attempts", "backup attempts by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref WORKER_FAILED_AT: GaugeVec = GaugeVec::new(
        Opts::new(
            "stress_worker_failed_at",
            "unix timestamp of the invariant violation that tripped the run"
        ),
        &["worker"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

fn register_custom_metrics() {
    REGISTRY
        .register(Box::new(WORKER_ITERATIONS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(TRANSIENT_CONDITIONS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(BACKUP_ATTEMPTS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(WORKER_FAILED_AT.clone()))
        .expect("collector can be registered");
}

/// record down which worker tripped the run, for dashboards watching a
/// long soak.
pub(crate) fn record_worker_failure(worker: &str) {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs_f64();
    WORKER_FAILED_AT.with_label_values(&[worker]).set(timestamp);
}

pub async fn start_server(port: u16, mut shutdown_signal: watch::Receiver<()>) {
    register_custom_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(render_metrics())
}

/// Export metrics for Prometheus to scrape
pub fn render_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        eprintln!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
