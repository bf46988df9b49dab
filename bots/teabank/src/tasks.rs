//! Task rounds: walk the task id range, one completion call per id.
//!
//! A quota refusal skips the task and the round moves on. A round that
//! completed nothing is followed by the long idle pause.

use crate::api::{Action, ActionRunner};
use crate::config::TeaBankConfig;
use crate::session::SessionPayload;
use crate::token::TokenManager;
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{
    format_duration, Bot, MetricsCollector, MetricsSnapshot, Waiter, CYCLE_RESULT_TARGET,
};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub task_ids: RangeInclusive<u32>,
    pub task_delay: Duration,
    pub round_delay: Duration,
    pub idle_round_delay: Duration,
}

impl TaskSettings {
    pub fn from_config(config: &TeaBankConfig) -> Self {
        Self {
            task_ids: config.tasks.first_task_id..=config.tasks.last_task_id,
            task_delay: config.task_delay(),
            round_delay: config.round_delay(),
            idle_round_delay: config.idle_round_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Tally of one pass over the task range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub completed: u32,
    pub skipped: u32,
    pub failed: u32,
    /// The round stopped early because of cancellation
    pub interrupted: bool,
}

impl RoundSummary {
    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Completed => self.completed += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Failed => self.failed += 1,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.completed == 0
    }
}

pub struct TasksBot {
    tokens: TokenManager,
    waiter: Arc<dyn Waiter>,
    settings: TaskSettings,
    metrics: MetricsCollector,
    rounds: u64,
}

impl TasksBot {
    pub fn new(
        runner: Arc<dyn ActionRunner>,
        session: Arc<SessionPayload>,
        waiter: Arc<dyn Waiter>,
        config: &TeaBankConfig,
    ) -> Self {
        Self {
            tokens: TokenManager::new(
                runner,
                session,
                waiter.clone(),
                config.registration_retry(),
            ),
            waiter,
            settings: TaskSettings::from_config(config),
            metrics: MetricsCollector::new(),
            rounds: 0,
        }
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Runs every task id once, refreshing the token before each call.
    pub async fn run_round(&mut self, cancel: &CancellationToken) -> RoundSummary {
        let mut summary = RoundSummary::default();
        let task_ids = self.settings.task_ids.clone();
        let last = *task_ids.end();

        if self.tokens.acquire(cancel).await.is_none() {
            summary.interrupted = true;
            return summary;
        }

        for task_id in task_ids {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let Some(outcome) = self.complete(task_id, cancel).await else {
                summary.interrupted = true;
                break;
            };
            summary.record(outcome);

            if task_id == last {
                break;
            }

            if self.tokens.acquire(cancel).await.is_none()
                || self
                    .waiter
                    .wait(self.settings.task_delay, cancel)
                    .await
                    .is_cancelled()
            {
                summary.interrupted = true;
                break;
            }
        }

        summary
    }

    /// `None` when the call was abandoned on cancellation.
    async fn complete(&mut self, task_id: u32, cancel: &CancellationToken) -> Option<TaskOutcome> {
        let action = Action::Task(task_id);
        let started = Instant::now();
        let result = self.tokens.perform(action, cancel).await;
        self.metrics.record_remote_call(started.elapsed());

        let outcome = match result {
            Err(e) if e.is_cancelled() => return None,
            Ok(_) => {
                self.metrics.record_success();
                info!("✅ Task {} SUCCESS", task_id);
                TaskOutcome::Completed
            }
            Err(e) if e.is_rate_limited() => {
                self.metrics.record_skipped();
                info!("⚡ Task {} SKIPPED | daily limit reached", task_id);
                TaskOutcome::Skipped
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!("❌ Task {} FAILED | {}", task_id, e);
                TaskOutcome::Failed
            }
        };
        Some(outcome)
    }
}

#[async_trait]
impl Bot for TasksBot {
    fn name(&self) -> &str {
        "teabank-tasks"
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<MetricsSnapshot> {
        while !cancel.is_cancelled() {
            self.rounds += 1;
            info!(
                "📋 Round #{}: tasks {}..={}",
                self.rounds,
                self.settings.task_ids.start(),
                self.settings.task_ids.end()
            );

            let summary = self.run_round(&cancel).await;
            info!(
                target: CYCLE_RESULT_TARGET,
                "Round #{} | Completed: {} | Skipped: {} | Failed: {}",
                self.rounds,
                summary.completed,
                summary.skipped,
                summary.failed
            );

            if summary.interrupted {
                break;
            }

            let pause = if summary.is_idle() {
                info!(
                    "💤 Nothing completed this round. Resting {}",
                    format_duration(self.settings.idle_round_delay)
                );
                self.settings.idle_round_delay
            } else {
                self.settings.round_delay
            };

            if self.waiter.wait(pause, &cancel).await.is_cancelled() {
                break;
            }
        }

        Ok(self.metrics.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_idle() {
        let mut summary = RoundSummary::default();
        summary.record(TaskOutcome::Skipped);
        summary.record(TaskOutcome::Failed);
        assert!(summary.is_idle());

        summary.record(TaskOutcome::Completed);
        assert!(!summary.is_idle());
        assert_eq!(summary.completed + summary.skipped + summary.failed, 3);
    }

    #[test]
    fn test_settings_from_defaults() {
        let settings = TaskSettings::from_config(&TeaBankConfig::default());
        assert_eq!(settings.task_ids, 1..=257);
        assert_eq!(settings.task_delay, Duration::from_millis(100));
        assert_eq!(settings.idle_round_delay, Duration::from_secs(3600));
    }
}
