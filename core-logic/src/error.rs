//! # Core Error Types
//!
//! Centralized error definitions shared by every bot in the workspace.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Input(InputError),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<InputError> for CoreError {
    fn from(e: InputError) -> Self {
        CoreError::Input(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid endpoint URL for '{field}': '{url}'")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse {path}: {msg}")]
    Parse { path: String, msg: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Operator input that can never succeed, no matter how often it is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Launch URL is empty")]
    Empty,

    #[error("Launch URL is not a valid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Launch URL does not contain tgWebAppData")]
    MissingWebAppData,

    #[error("Init data does not contain a user field")]
    MissingUser,

    #[error("User field is not valid JSON: {reason}")]
    InvalidUser { reason: String },

    #[error("Session is {age_secs}s old (limit {max_secs}s); open the mini app again for a fresh link")]
    StaleSession { age_secs: u64, max_secs: u64 },
}

/// How the caller should react to a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth repeating after a delay.
    Transient,
    /// Repeating the same request will not help.
    Permanent,
    /// The service refused because a quota is used up; skip and move on.
    RateLimited,
}

/// Network and remote-API errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Transport failure talking to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Rate limited by {endpoint}: {message}")]
    RateLimited { endpoint: String, message: String },

    #[error("HTTP error {status_code} from {endpoint}: {body}")]
    HttpError {
        status_code: u16,
        endpoint: String,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    /// The run was cancelled while the request was in flight
    #[error("Request to {endpoint} abandoned on shutdown")]
    Cancelled { endpoint: String },
}

impl NetworkError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NetworkError::Timeout { .. }
            | NetworkError::Transport { .. }
            | NetworkError::InvalidResponse { .. } => FailureKind::Transient,
            NetworkError::RateLimited { .. } => FailureKind::RateLimited,
            NetworkError::Cancelled { .. } => FailureKind::Permanent,
            NetworkError::HttpError { status_code, .. } => {
                if *status_code == 429 || *status_code >= 500 {
                    FailureKind::Transient
                } else {
                    FailureKind::Permanent
                }
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == FailureKind::RateLimited
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, NetworkError::Cancelled { .. })
    }
}
