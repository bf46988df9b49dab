use crate::metrics::MetricsSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Bot: Send {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Runs until `cancel` fires, then returns the cumulative counters.
    async fn start(&mut self, cancel: CancellationToken) -> Result<MetricsSnapshot>;
}

/// Outcome of a single cancellable wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_cancelled(self) -> bool {
        self == WaitOutcome::Cancelled
    }
}

/// Every suspension point of a bot goes through a `Waiter`.
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> WaitOutcome;
}
