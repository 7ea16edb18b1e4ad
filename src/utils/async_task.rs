use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;

/// Polls `probe` every `interval` until it reports true or
/// `timeout_duration` elapses. Returns whether the probe ever
/// succeeded.
pub async fn poll_until<F, Fut>(
    timeout_duration: Duration,
    interval: Duration,
    probe: F,
) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    timeout(timeout_duration, async {
        loop {
            if probe().await {
                return;
            }
            sleep(interval).await;
        }
    })
    .await
    .is_ok()
}
