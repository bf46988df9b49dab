//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod countdown;
pub(crate) mod logger;
pub(crate) mod retry;
pub(crate) mod runner;

pub use countdown::{format_duration, CountdownWaiter};
pub use logger::{setup_logger, CYCLE_RESULT_TARGET};
pub use runner::BotRunner;
