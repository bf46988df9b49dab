//! Bearer token lifecycle
//!
//! The service hands out a fresh token on every registration and expects the
//! latest one on each state-changing call. [`TokenManager`] owns that single
//! value and replays the registration payload whenever a new one is needed.

use crate::api::{Action, ActionResult, ActionRunner, Endpoint};
use crate::session::SessionPayload;
use core_logic::{FailureKind, NetworkError, RetryConfig, Waiter};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

const PREVIEW_CHARS: usize = 12;

/// Opaque credential issued by the service. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters, safe to log.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(PREVIEW_CHARS).collect();
        if self.0.chars().count() > PREVIEW_CHARS {
            format!("{}…", head)
        } else {
            head
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.preview())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

pub struct TokenManager {
    runner: Arc<dyn ActionRunner>,
    session: Arc<SessionPayload>,
    waiter: Arc<dyn Waiter>,
    retry: RetryConfig,
    current: Option<Token>,
    last_registration: Option<ActionResult>,
    refreshes: u64,
}

impl TokenManager {
    pub fn new(
        runner: Arc<dyn ActionRunner>,
        session: Arc<SessionPayload>,
        waiter: Arc<dyn Waiter>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            runner,
            session,
            waiter,
            retry,
            current: None,
            last_registration: None,
            refreshes: 0,
        }
    }

    /// One registration attempt. Failures are returned classified, never retried here.
    pub async fn refresh(&mut self, cancel: &CancellationToken) -> Result<Token, NetworkError> {
        let result = self.send(&Action::Register, None, cancel).await?;

        let token = result
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Token::new)
            .ok_or_else(|| NetworkError::InvalidResponse {
                endpoint: Endpoint::UserApi.to_string(),
                reason: "registration response carries no token".to_string(),
            })?;

        self.refreshes += 1;
        debug!("🔑 Token #{} issued: {}", self.refreshes, token);
        self.current = Some(token.clone());
        self.last_registration = Some(result);
        Ok(token)
    }

    /// Registers until a token is issued. Returns `None` only when cancelled.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Option<Token> {
        let mut failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return None;
            }

            match self.refresh(cancel).await {
                Ok(token) => {
                    if failures > 0 {
                        info!("🔑 Registration recovered after {} failed attempts", failures);
                    }
                    return Some(token);
                }
                Err(e) if e.is_cancelled() => return None,
                Err(e) => {
                    let delay = self.retry.delay_for(failures);
                    failures += 1;

                    match e.kind() {
                        FailureKind::Permanent => error!(
                            "Registration rejected (attempt {}): {}. Retrying in {}s",
                            failures,
                            e,
                            delay.as_secs()
                        ),
                        _ => warn!(
                            "Registration failed (attempt {}): {}. Retrying in {}s",
                            failures,
                            e,
                            delay.as_secs()
                        ),
                    }

                    if self.waiter.wait(delay, cancel).await.is_cancelled() {
                        return None;
                    }
                }
            }
        }
    }

    /// Performs `action` with the held token and keeps any token the response rotates in.
    pub async fn perform(
        &mut self,
        action: Action,
        cancel: &CancellationToken,
    ) -> Result<ActionResult, NetworkError> {
        let result = self.send(&action, self.current.as_ref(), cancel).await?;
        self.absorb(&result);
        Ok(result)
    }

    async fn send(
        &self,
        action: &Action,
        token: Option<&Token>,
        cancel: &CancellationToken,
    ) -> Result<ActionResult, NetworkError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(NetworkError::Cancelled {
                endpoint: action.endpoint().to_string(),
            }),
            result = self.runner.perform(action, token, &self.session) => result,
        }
    }

    /// Keeps the newest token when a response carries one.
    pub fn absorb(&mut self, result: &ActionResult) {
        if let Some(token) = result.token.as_deref().filter(|t| !t.is_empty()) {
            if self.current.as_ref().map(Token::expose) != Some(token) {
                debug!("🔑 Token rotated by response");
                self.current = Some(Token::new(token));
            }
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Body of the most recent successful registration.
    pub fn last_registration(&self) -> Option<&ActionResult> {
        self.last_registration.as_ref()
    }

    pub fn session(&self) -> &Arc<SessionPayload> {
        &self.session
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_hides_tail() {
        let token = Token::new("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        assert_eq!(token.preview(), "eyJhbGciOiJI…");
        assert!(!format!("{:?}", token).contains("signature"));
    }

    #[test]
    fn test_short_token_preview() {
        assert_eq!(Token::new("abc").preview(), "abc");
    }
}
