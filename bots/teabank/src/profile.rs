//! One-shot account summary.

use crate::api::response::value_text;
use crate::api::{Action, ActionResult, ActionRunner};
use crate::config::TeaBankConfig;
use crate::session::SessionPayload;
use crate::token::TokenManager;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::{Bot, MetricsCollector, MetricsSnapshot, NetworkError, Waiter};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub water: u64,
    pub energy: u64,
    pub balance: Option<String>,
    pub ton_balance: Option<String>,
    pub trees_count: Option<String>,
    pub income_per_day: Option<String>,
    pub income_per_hour: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl Profile {
    /// Builds a profile from a user-state response; the name falls back to the launch identity.
    pub fn from_result(result: &ActionResult, session: &SessionPayload) -> Self {
        let income = result.extra.get("income");
        let income_field = |key: &str| income.and_then(|v| v.get(key)).and_then(value_text);

        Self {
            name: result
                .extra_text("first_name")
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| session.user.display_name()),
            water: result.water,
            energy: result.energy,
            balance: result.balance.as_ref().and_then(value_text),
            ton_balance: result.ton_balance.as_ref().and_then(value_text),
            trees_count: result.extra_text("trees_count"),
            income_per_day: income_field("per_day"),
            income_per_hour: income_field("per_hour"),
            country: result.extra_text("country"),
            city: result.extra_text("city"),
        }
    }

    pub fn log(&self) {
        let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "n/a".to_string());

        info!("👤 {}", self.name);
        info!("💰 Balance: {} | TON: {}", na(&self.balance), na(&self.ton_balance));
        info!("💧 Water: {} | ⚡ Energy: {}", self.water, self.energy);
        info!("🌳 Trees: {}", na(&self.trees_count));
        info!(
            "💵 Income: {} TON/day | {} TON/hour",
            na(&self.income_per_day),
            na(&self.income_per_hour)
        );
        info!("🌍 {} / {}", na(&self.country), na(&self.city));
    }
}

/// Registers, then reads the user state. On failure the token is renewed and
/// the read is tried once more.
///
/// Returns `Ok(None)` when cancelled before the state was read.
pub async fn fetch_profile(
    tokens: &mut TokenManager,
    cancel: &CancellationToken,
) -> Result<Option<Profile>, NetworkError> {
    if tokens.acquire(cancel).await.is_none() {
        return Ok(None);
    }

    let result = match tokens.perform(Action::FetchState, cancel).await {
        Err(e) if !e.is_cancelled() => {
            warn!("fetch-state failed: {}. Renewing token and retrying once", e);
            match tokens.refresh(cancel).await {
                Ok(_) => tokens.perform(Action::FetchState, cancel).await,
                Err(e) => Err(e),
            }
        }
        first => first,
    };

    match result {
        Ok(result) => Ok(Some(Profile::from_result(&result, tokens.session()))),
        Err(e) if e.is_cancelled() => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct ProfileBot {
    tokens: TokenManager,
    metrics: MetricsCollector,
    profile: Option<Profile>,
}

impl ProfileBot {
    pub fn new(
        runner: Arc<dyn ActionRunner>,
        session: Arc<SessionPayload>,
        waiter: Arc<dyn Waiter>,
        config: &TeaBankConfig,
    ) -> Self {
        Self {
            tokens: TokenManager::new(runner, session, waiter, config.registration_retry()),
            metrics: MetricsCollector::new(),
            profile: None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl Bot for ProfileBot {
    fn name(&self) -> &str {
        "teabank-profile"
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<MetricsSnapshot> {
        match fetch_profile(&mut self.tokens, &cancel).await {
            Ok(Some(profile)) => {
                self.metrics.record_success();
                profile.log();
                self.profile = Some(profile);
            }
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_failure();
                return Err(anyhow!(e).context("Failed to fetch profile"));
            }
        }

        Ok(self.metrics.snapshot())
    }
}
