//! Farming loop: start, wait for the harvest, claim, repeat.
//!
//! Every state-changing call runs on a freshly registered token. The water
//! level comes from the registration response; a dry account walks through
//! the zero-water delays before the next cycle is attempted.

use crate::api::{Action, ActionResult, ActionRunner};
use crate::config::TeaBankConfig;
use crate::session::SessionPayload;
use crate::token::TokenManager;
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{
    format_duration, Bot, MetricsCollector, MetricsSnapshot, StepBackoff, Waiter,
    CYCLE_RESULT_TARGET,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Longest harvest wait taken from a server-reported `time_left`.
pub const MAX_CLAIM_WAIT: Duration = Duration::from_secs(24 * 3600);

/// Delays and schedule of one farming run.
#[derive(Debug, Clone)]
pub struct FarmingSettings {
    pub status_retry: Duration,
    pub claim_fallback: Duration,
    pub cycle_rest: Duration,
    pub zero_water_delays: Vec<Duration>,
}

impl FarmingSettings {
    pub fn from_config(config: &TeaBankConfig) -> Self {
        Self {
            status_retry: config.status_retry(),
            claim_fallback: config.claim_fallback(),
            cycle_rest: config.cycle_rest(),
            zero_water_delays: config.zero_water_delays(),
        }
    }
}

/// How a single cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    Claimed(ActionResult),
    ClaimFailed,
    /// Registration reported no water; wait this long before the next cycle
    NoWater(Duration),
    /// Neither start nor status produced a successful answer
    NotStarted,
    Cancelled,
}

/// Time to wait before claiming, given the start/status answer.
///
/// `CAN_CLAIM` with no time left claims at once; a positive `time_left` is
/// waited out, capped at [`MAX_CLAIM_WAIT`]; anything else falls back to
/// `fallback`.
pub fn claim_wait(result: &ActionResult, fallback: Duration) -> Duration {
    if result.ready_to_claim() {
        Duration::ZERO
    } else if result.time_left > 0 {
        Duration::from_secs(result.time_left).min(MAX_CLAIM_WAIT)
    } else {
        fallback
    }
}

pub struct FarmingBot {
    tokens: TokenManager,
    waiter: Arc<dyn Waiter>,
    settings: FarmingSettings,
    water_backoff: StepBackoff,
    metrics: MetricsCollector,
    cycles: u64,
}

impl FarmingBot {
    pub fn new(
        runner: Arc<dyn ActionRunner>,
        session: Arc<SessionPayload>,
        waiter: Arc<dyn Waiter>,
        config: &TeaBankConfig,
    ) -> Self {
        let settings = FarmingSettings::from_config(config);
        Self {
            tokens: TokenManager::new(
                runner,
                session,
                waiter.clone(),
                config.registration_retry(),
            ),
            water_backoff: StepBackoff::new(settings.zero_water_delays.clone()),
            waiter,
            settings,
            metrics: MetricsCollector::new(),
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// One pass through register → start/status → wait → claim.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        if self.tokens.acquire(cancel).await.is_none() {
            return CycleOutcome::Cancelled;
        }

        let water = self
            .tokens
            .last_registration()
            .map(|r| r.water)
            .unwrap_or_default();

        if water == 0 {
            let delay = self.water_backoff.next_delay();
            let steps = self.water_backoff.len();
            let step = match self.water_backoff.position() {
                0 => steps,
                n => n,
            };
            warn!(
                "💧 Water is 0 ({}/{}). Next try in {}",
                step,
                steps,
                format_duration(delay)
            );
            return CycleOutcome::NoWater(delay);
        }
        self.water_backoff.reset();
        info!("💧 Water: {}", water);

        let mut farming = self.call(Action::Start, cancel).await.filter(|r| r.success);

        if farming.is_none() {
            info!("🌱 Start not accepted, checking farming status");
            if self.tokens.acquire(cancel).await.is_none() {
                return CycleOutcome::Cancelled;
            }
            farming = self.call(Action::Status, cancel).await.filter(|r| r.success);
        }

        if cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }

        let Some(farming) = farming else {
            return CycleOutcome::NotStarted;
        };

        let wait = claim_wait(&farming, self.settings.claim_fallback);
        info!(
            "📊 Status: {} | Time left: {}s",
            farming.status.as_deref().unwrap_or("unknown"),
            farming.time_left
        );

        if wait.is_zero() {
            info!("🌾 Harvest is ready");
        } else {
            info!("⏰ Harvest in {}", format_duration(wait));
            if self.waiter.wait(wait, cancel).await.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
        }

        if self.tokens.acquire(cancel).await.is_none() {
            return CycleOutcome::Cancelled;
        }

        match self.call(Action::Claim, cancel).await {
            Some(result) if result.success => CycleOutcome::Claimed(result),
            _ if cancel.is_cancelled() => CycleOutcome::Cancelled,
            _ => CycleOutcome::ClaimFailed,
        }
    }

    async fn call(&mut self, action: Action, cancel: &CancellationToken) -> Option<ActionResult> {
        let started = Instant::now();
        let result = self.tokens.perform(action, cancel).await;
        self.metrics.record_remote_call(started.elapsed());

        match result {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => None,
            Err(e) if e.is_rate_limited() => {
                warn!("⏭️ {} refused by quota: {}", action, e);
                None
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                None
            }
        }
    }

    fn record(&mut self, outcome: &CycleOutcome) {
        let cycle = self.cycles;
        match outcome {
            CycleOutcome::Claimed(result) => {
                self.metrics.record_success();
                info!(
                    target: CYCLE_RESULT_TARGET,
                    "Cycle #{} SUCCESS | Claimed: {} | Tokens: {} | {}",
                    cycle,
                    text(&result.claimed_amount),
                    text(&result.claimed_amount_token),
                    result.message.as_deref().unwrap_or("-")
                );
            }
            CycleOutcome::ClaimFailed => {
                self.metrics.record_failure();
                warn!(target: CYCLE_RESULT_TARGET, "Cycle #{} FAILED | Claim rejected", cycle);
            }
            CycleOutcome::NotStarted => {
                self.metrics.record_failure();
                warn!(
                    target: CYCLE_RESULT_TARGET,
                    "Cycle #{} FAILED | No farming status",
                    cycle
                );
            }
            CycleOutcome::NoWater(_) => {
                self.metrics.record_skipped();
                info!(target: CYCLE_RESULT_TARGET, "Cycle #{} SKIPPED | No water", cycle);
            }
            CycleOutcome::Cancelled => {}
        }
    }
}

#[async_trait]
impl Bot for FarmingBot {
    fn name(&self) -> &str {
        "teabank-farm"
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<MetricsSnapshot> {
        while !cancel.is_cancelled() {
            self.cycles += 1;
            info!("🔄 Cycle #{}", self.cycles);

            let outcome = self.run_cycle(&cancel).await;
            self.record(&outcome);

            let pause = match outcome {
                CycleOutcome::Cancelled => break,
                CycleOutcome::NoWater(delay) => delay,
                CycleOutcome::NotStarted => self.settings.status_retry,
                CycleOutcome::Claimed(_) | CycleOutcome::ClaimFailed => self.settings.cycle_rest,
            };

            if self.waiter.wait(pause, &cancel).await.is_cancelled() {
                break;
            }
        }

        Ok(self.metrics.snapshot())
    }
}

fn text(value: &Option<Value>) -> String {
    value
        .as_ref()
        .and_then(crate::api::response::value_text)
        .unwrap_or_else(|| "-".to_string())
}
