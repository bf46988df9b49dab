use anyhow::Result;
use async_trait::async_trait;
use core_logic::{Bot, BotRunner, MetricsCollector, MetricsSnapshot};
use tokio_util::sync::CancellationToken;

struct CountingBot {
    rounds_before_cancel: u64,
}

#[async_trait]
impl Bot for CountingBot {
    fn name(&self) -> &str {
        "counting-bot"
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<MetricsSnapshot> {
        let mut metrics = MetricsCollector::new();
        loop {
            if cancel.is_cancelled() {
                return Ok(metrics.snapshot());
            }
            metrics.record_success();
            if metrics.attempts() == self.rounds_before_cancel {
                cancel.cancel();
            }
            tokio::task::yield_now().await;
        }
    }
}

struct FailingBot;

#[async_trait]
impl Bot for FailingBot {
    fn name(&self) -> &str {
        "failing-bot"
    }

    async fn start(&mut self, _cancel: CancellationToken) -> Result<MetricsSnapshot> {
        Err(anyhow::anyhow!("launch URL rejected"))
    }
}

#[tokio::test]
async fn test_runner_returns_counters_after_cancel() {
    let mut bot = CountingBot {
        rounds_before_cancel: 5,
    };

    let stats = BotRunner::run_with_token(&mut bot, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.attempts, 5);
    assert_eq!(stats.successes, 5);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_runner_propagates_bot_error() {
    let mut bot = FailingBot;
    let result = BotRunner::run_with_token(&mut bot, CancellationToken::new()).await;
    assert!(result.is_err());
}
