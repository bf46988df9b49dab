//! Remote API surface
//!
//! - [`Action`]: the closed set of calls the bots make, with their request templates
//! - [`ActionResult`]: response body read through typed, defaulted fields
//! - [`ActionRunner`]: one request/response exchange per call, no internal retry
//! - [`HttpActionRunner`]: the reqwest implementation

pub mod client;
pub mod response;

pub use client::{interpret_response, HttpActionRunner};
pub use response::{ActionResult, CLAIMABLE_STATUS};

use crate::config::ClientProfile;
use crate::session::SessionPayload;
use crate::token::Token;
use async_trait::async_trait;
use core_logic::NetworkError;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    UserApi,
    TasksApi,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::UserApi => f.write_str("user-api"),
            Endpoint::TasksApi => f.write_str("tasks-api"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Register,
    FetchState,
    Start,
    Status,
    Claim,
    Task(u32),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Register => f.write_str("register"),
            Action::FetchState => f.write_str("fetch-state"),
            Action::Start => f.write_str("start"),
            Action::Status => f.write_str("status"),
            Action::Claim => f.write_str("claim"),
            Action::Task(id) => write!(f, "task({})", id),
        }
    }
}

impl Action {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Action::Task(_) => Endpoint::TasksApi,
            _ => Endpoint::UserApi,
        }
    }

    pub fn requires_token(&self) -> bool {
        !matches!(self, Action::Register)
    }

    /// Request body for this action.
    pub fn body(
        &self,
        token: Option<&Token>,
        session: &SessionPayload,
        client: &ClientProfile,
    ) -> Value {
        let token = token.map(Token::expose).unwrap_or_default();

        match self {
            Action::Register => {
                let user = &session.user;
                json!({
                    "user": user,
                    "initData": session.init_data,
                    "id": user.id.to_string(),
                    "first_name": user.first_name,
                    "last_name": user.last_name.as_deref().unwrap_or_default(),
                    "photo_url": user.photo_url.as_deref().unwrap_or_default(),
                    "referral": session.referral(),
                    "utm_source": "",
                    "utm_medium": "",
                    "utm_campaign": "",
                    "utm_content": "",
                    "utm_term": "",
                    "referrer": "",
                    "userAgent": client.user_agent,
                    "tg_version": client.tg_version,
                    "platform": client.platform,
                    "language": client.language,
                    "task": "checkOrRegisterUser",
                })
            }
            Action::FetchState => json!({
                "task": "getUserData",
                "token": token,
            }),
            Action::Start | Action::Status | Action::Claim => json!({
                "task": "startFarming",
                "action": self.farming_verb(),
                "initData": session.init_data,
                "token": token,
            }),
            Action::Task(id) => json!({
                "task": "completeTask",
                "token": token,
                "taskId": id,
                "userData": session.init_data,
            }),
        }
    }

    fn farming_verb(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Claim => "claim",
            _ => "status",
        }
    }
}

#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Performs a single exchange for `action`.
    ///
    /// `token` must be the latest issued token for every action except
    /// [`Action::Register`].
    async fn perform(
        &self,
        action: &Action,
        token: Option<&Token>,
        session: &SessionPayload,
    ) -> Result<ActionResult, NetworkError>;
}
