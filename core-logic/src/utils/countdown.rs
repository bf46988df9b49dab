use crate::traits::{WaitOutcome, Waiter};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Stand-in deadline for waits too long to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Real-time waiter: one cancellable sleep, with a progress line every
/// `progress_every` while the wait is running.
#[derive(Debug, Clone)]
pub struct CountdownWaiter {
    progress_every: Duration,
}

impl CountdownWaiter {
    pub fn new(progress_every: Duration) -> Self {
        Self { progress_every }
    }
}

impl Default for CountdownWaiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl Waiter for CountdownWaiter {
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> WaitOutcome {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        if duration.is_zero() {
            return WaitOutcome::Elapsed;
        }

        if duration >= Duration::from_secs(60) {
            info!("⏳ Waiting {}", format_duration(duration));
        }

        let deadline = instant_after(duration);
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let show_progress = !self.progress_every.is_zero() && duration > self.progress_every;
        let period = self.progress_every.clamp(Duration::from_secs(1), FAR_FUTURE);
        let mut ticker = tokio::time::interval_at(instant_after(period), period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = &mut sleep => return WaitOutcome::Elapsed,
                _ = ticker.tick(), if show_progress => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    info!("⏱️ {} remaining", format_duration(left));
                }
            }
        }
    }
}

fn instant_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// `HH:MM:SS` rendering used by countdown lines.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
