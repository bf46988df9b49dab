//! Configuration loader for the TeaBank bots
//!
//! Every field has a default, so an empty or missing file yields a working
//! configuration that targets the public TeaBank endpoints.

use core_logic::{ConfigError, ProxyConfig, RetryConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1";
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "You have reached the daily task limit.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeaBankConfig {
    pub api: ApiConfig,
    pub client: ClientProfile,
    pub session: SessionConfig,
    pub farming: FarmingConfig,
    pub tasks: TasksConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint for registration, user state and farming
    pub user_api_url: String,
    /// Endpoint for task completion
    pub tasks_api_url: String,
    /// Origin the mini app is served from; sent as Origin and Referer
    pub app_origin: String,
    pub request_timeout_secs: u64,
    /// Exact `error` text that marks a quota refusal
    pub rate_limit_message: String,
    /// `ip:port[:user:pass]` or a full proxy URL
    pub proxy: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            user_api_url: "https://api.teabank.io/user-api/".to_string(),
            tasks_api_url: "https://api.teabank.io/tasks-api/".to_string(),
            app_origin: "https://app.teabank.io".to_string(),
            request_timeout_secs: 30,
            rate_limit_message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
            proxy: None,
        }
    }
}

/// Constants the registration payload reports about the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientProfile {
    pub user_agent: String,
    pub tg_version: String,
    pub platform: String,
    pub language: String,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tg_version: "9.0".to_string(),
            platform: "android".to_string(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Reject launch links whose `auth_date` is older than this. Unset disables the check.
    pub max_age_secs: Option<u64>,
    /// Delay after a failed registration
    pub register_retry_secs: u64,
    /// Growth factor per consecutive registration failure (1.0 keeps the delay fixed)
    pub register_backoff_base: f64,
    pub register_max_retry_secs: u64,
    pub register_jitter: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: None,
            register_retry_secs: 300,
            register_backoff_base: 1.0,
            register_max_retry_secs: 300,
            register_jitter: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FarmingConfig {
    /// Wait when neither start nor status produced a usable answer
    pub status_retry_secs: u64,
    /// Wait when the service reports no remaining time and no claimable status
    pub claim_fallback_secs: u64,
    /// Pause between cycles
    pub cycle_rest_secs: u64,
    /// Delays used for consecutive cycles with no water, in order
    pub zero_water_delays_secs: Vec<u64>,
}

impl Default for FarmingConfig {
    fn default() -> Self {
        Self {
            status_retry_secs: 600,
            claim_fallback_secs: 3 * 3600,
            cycle_rest_secs: 30,
            zero_water_delays_secs: vec![6 * 3600, 5 * 3600, 3 * 3600, 2 * 3600],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub first_task_id: u32,
    pub last_task_id: u32,
    pub task_delay_ms: u64,
    /// Pause between rounds that completed at least one task
    pub round_delay_secs: u64,
    /// Pause after a round where nothing succeeded
    pub idle_round_delay_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            first_task_id: 1,
            last_task_id: 257,
            task_delay_ms: 100,
            round_delay_secs: 1,
            idle_round_delay_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Interval of countdown lines during long waits (0 disables them)
    pub progress_every_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            progress_every_secs: 300,
        }
    }
}

impl TeaBankConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: defaults are used and a warning is logged.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        if !path.exists() {
            warn!("{} not found. Using built-in defaults.", shown);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: shown.clone(),
            msg: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { msg, .. } => ConfigError::Parse { path: shown, msg },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            msg: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("api.user_api_url", &self.api.user_api_url),
            ("api.tasks_api_url", &self.api.tasks_api_url),
            ("api.app_origin", &self.api.app_origin),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigError::InvalidUrl {
                    field: field.to_string(),
                    url: value.clone(),
                });
            }
        }

        if self.api.request_timeout_secs == 0 {
            return Err(invalid("api.request_timeout_secs", "must be greater than 0"));
        }
        if self.api.rate_limit_message.trim().is_empty() {
            return Err(invalid("api.rate_limit_message", "must not be empty"));
        }
        if let Some(proxy) = &self.api.proxy {
            if ProxyConfig::from_line(proxy).is_none() {
                return Err(invalid("api.proxy", "expected ip:port[:user:pass] or a URL"));
            }
        }
        if self.session.register_backoff_base < 1.0 {
            return Err(invalid("session.register_backoff_base", "must be at least 1.0"));
        }
        if self.session.register_max_retry_secs < self.session.register_retry_secs {
            return Err(invalid(
                "session.register_max_retry_secs",
                "must not be below session.register_retry_secs",
            ));
        }
        if self.farming.zero_water_delays_secs.is_empty() {
            return Err(invalid("farming.zero_water_delays_secs", "must list at least one delay"));
        }
        if self.tasks.first_task_id > self.tasks.last_task_id {
            return Err(invalid(
                "tasks.last_task_id",
                "must not be below tasks.first_task_id",
            ));
        }

        Ok(())
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.api.proxy.as_deref().and_then(ProxyConfig::from_line)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Retry policy for registration failures
    pub fn registration_retry(&self) -> RetryConfig {
        RetryConfig {
            base_delay_ms: self.session.register_retry_secs * 1000,
            max_delay_ms: self.session.register_max_retry_secs * 1000,
            exponential_base: self.session.register_backoff_base,
            jitter: self.session.register_jitter,
        }
    }

    pub fn zero_water_delays(&self) -> Vec<Duration> {
        self.farming
            .zero_water_delays_secs
            .iter()
            .map(|secs| Duration::from_secs(*secs))
            .collect()
    }

    pub fn status_retry(&self) -> Duration {
        Duration::from_secs(self.farming.status_retry_secs)
    }

    pub fn claim_fallback(&self) -> Duration {
        Duration::from_secs(self.farming.claim_fallback_secs)
    }

    pub fn cycle_rest(&self) -> Duration {
        Duration::from_secs(self.farming.cycle_rest_secs)
    }

    pub fn task_delay(&self) -> Duration {
        Duration::from_millis(self.tasks.task_delay_ms)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_secs(self.tasks.round_delay_secs)
    }

    pub fn idle_round_delay(&self) -> Duration {
        Duration::from_secs(self.tasks.idle_round_delay_secs)
    }

    pub fn progress_every(&self) -> Duration {
        Duration::from_secs(self.logging.progress_every_secs)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
