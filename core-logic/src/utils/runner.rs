use crate::metrics::MetricsSnapshot;
use crate::traits::Bot;
use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct BotRunner;

impl BotRunner {
    /// Runs a bot until Ctrl+C, then prints its cumulative counters.
    pub async fn run<B: Bot + ?Sized>(bot: &mut B) -> Result<MetricsSnapshot> {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Finishing up...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        Self::run_with_token(bot, token).await
    }

    /// Same as [`BotRunner::run`] with a caller-owned cancellation token.
    pub async fn run_with_token<B: Bot + ?Sized>(
        bot: &mut B,
        token: CancellationToken,
    ) -> Result<MetricsSnapshot> {
        info!("🚀 Starting {} (press Ctrl+C to stop)", bot.name());

        let stats = match bot.start(token).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("{} stopped with an error: {:?}", bot.name(), e);
                return Err(e);
            }
        };

        Self::report(bot.name(), &stats);
        Ok(stats)
    }

    fn report(name: &str, stats: &MetricsSnapshot) {
        info!("🛑 {} stopped.", name);
        info!(
            "Total Time: {}s | Attempts: {} | Success: {} | Skipped: {} | Fail: {} | Success Rate: {:.2}%",
            stats.elapsed_secs,
            stats.attempts,
            stats.successes,
            stats.skipped,
            stats.failed,
            stats.success_rate
        );
        if stats.remote_calls > 0 {
            info!(
                "Remote calls: {} | Avg latency: {:.0}ms",
                stats.remote_calls, stats.avg_latency_ms
            );
        }
    }
}
