//! # TeaBank Bot
//!
//! Drives the TeaBank Telegram mini app through its HTTP API using the signed
//! session from a WebApp launch link.
//!
//! ## Modules
//!
//! - [`session`] - Launch URL and init data parsing
//! - [`api`] - Request templates, response model and the reqwest runner
//! - [`token`] - Token registration and refresh
//! - [`farming`] - Start/claim farming loop
//! - [`tasks`] - Task completion rounds
//! - [`profile`] - Account summary
//! - [`config`] - TOML configuration
//! - [`cli`] - Startup shared by the binaries

pub mod api;
pub mod cli;
pub mod config;
pub mod farming;
pub mod profile;
pub mod session;
pub mod tasks;
pub mod token;

pub use api::{Action, ActionResult, ActionRunner, Endpoint, HttpActionRunner};
pub use config::TeaBankConfig;
pub use farming::{claim_wait, CycleOutcome, FarmingBot};
pub use profile::{fetch_profile, Profile, ProfileBot};
pub use session::{SessionPayload, TelegramUser};
pub use tasks::{RoundSummary, TasksBot};
pub use token::{Token, TokenManager};
