//! Shared startup for the TeaBank binaries.

use crate::api::{ActionRunner, HttpActionRunner};
use crate::config::TeaBankConfig;
use crate::session::SessionPayload;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use core_logic::{CountdownWaiter, InputError, Waiter};
use dialoguer::{theme::ColorfulTheme, Input};
use std::env;
use std::sync::Arc;
use tracing::info;

pub const LAUNCH_URL_ENV: &str = "TEABANK_LAUNCH_URL";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, default_value = "bots/teabank/config.toml")]
    pub config: String,

    /// Telegram WebApp launch URL; prompted for when absent
    #[arg(short, long)]
    pub url: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything a bot needs, built once per run.
pub struct Bootstrap {
    pub config: TeaBankConfig,
    pub session: Arc<SessionPayload>,
    pub runner: Arc<dyn ActionRunner>,
    pub waiter: Arc<dyn Waiter>,
}

/// Launch URL from `--url`, then the environment, then an interactive prompt.
pub fn read_launch_url(args: &Args) -> Result<String> {
    if let Some(url) = args.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(url.to_string());
    }

    if let Ok(url) = env::var(LAUNCH_URL_ENV) {
        if !url.trim().is_empty() {
            info!("Using launch URL from {}", LAUNCH_URL_ENV);
            return Ok(url);
        }
    }

    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Paste the Telegram WebApp launch URL")
        .interact_text()
        .context("Failed to read launch URL")
}

pub fn bootstrap(args: &Args) -> Result<Bootstrap> {
    let config = TeaBankConfig::from_path(&args.config).context("Failed to load config")?;

    let url = read_launch_url(args)?;
    let session = parse_session(&url, &config)?;
    info!(
        "👤 Session for {} (id {})",
        session.user.display_name(),
        session.user.id
    );

    let runner = HttpActionRunner::new(&config)?;
    let waiter = CountdownWaiter::new(config.progress_every());

    Ok(Bootstrap {
        session: Arc::new(session),
        runner: Arc::new(runner),
        waiter: Arc::new(waiter),
        config,
    })
}

/// Parses the launch URL and applies the configured staleness limit.
pub fn parse_session(url: &str, config: &TeaBankConfig) -> Result<SessionPayload, InputError> {
    let session = SessionPayload::from_launch_url(url)?;
    session.check_fresh(config.session.max_age_secs, Utc::now().timestamp())?;
    Ok(session)
}
