//! # Core Logic - Shared Utilities for the Bot Workspace
//!
//! This crate provides the plumbing every bot in the workspace shares:
//! error taxonomy, logging, retry policy, run counters and the runner that
//! wires Ctrl+C into a cancellation token.
//!
//! ## Modules
//!
//! - [`config`] - Configuration pieces shared between bots
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Cumulative run counters
//! - [`traits`] - `Bot` and `Waiter` seams

pub mod config;
pub mod error;
pub mod metrics;
pub mod traits;
pub(crate) mod utils;

pub use config::ProxyConfig;
pub use error::{ConfigError, CoreError, FailureKind, InputError, NetworkError};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use traits::{Bot, WaitOutcome, Waiter};

pub use utils::{
    format_duration, setup_logger, BotRunner, CountdownWaiter, CYCLE_RESULT_TARGET,
};

pub use utils::retry::{is_transient_error, RetryConfig, StepBackoff};
