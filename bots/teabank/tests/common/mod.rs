#![allow(dead_code)]

use async_trait::async_trait;
use core_logic::{NetworkError, WaitOutcome, Waiter};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teabank_bot::{Action, ActionResult, ActionRunner, SessionPayload, Token};
use tokio_util::sync::CancellationToken;

pub type Reply = Result<ActionResult, NetworkError>;

pub const INIT_DATA: &str = "query_id=AAF1&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ada%22%7D&auth_date=1700000000&hash=abc";

pub fn session() -> Arc<SessionPayload> {
    Arc::new(SessionPayload::from_init_data(INIT_DATA).unwrap())
}

pub fn ok(value: Value) -> Reply {
    Ok(serde_json::from_value(value).unwrap())
}

pub fn timeout() -> Reply {
    Err(NetworkError::Timeout {
        timeout_ms: 30_000,
        endpoint: "user-api".to_string(),
    })
}

pub fn http(status_code: u16) -> Reply {
    Err(NetworkError::HttpError {
        status_code,
        endpoint: "user-api".to_string(),
        body: String::new(),
    })
}

pub fn rate_limited() -> Reply {
    Err(NetworkError::RateLimited {
        endpoint: "tasks-api".to_string(),
        message: "You have reached the daily task limit.".to_string(),
    })
}

/// A call seen by the runner, with the token it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub action: Action,
    pub token: Option<String>,
}

/// Replays scripted replies per action. The last reply of a queue repeats.
///
/// Successful registrations without a `token` get `tok-<n>`, where `n`
/// counts registration calls.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<HashMap<Action, VecDeque<Reply>>>,
    any_task: Mutex<Option<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, action: Action, replies: Vec<Reply>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(action, replies.into_iter().collect());
        self
    }

    pub fn on_any_task(self, reply: Reply) -> Self {
        *self.any_task.lock().unwrap() = Some(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.calls().into_iter().map(|c| c.action).collect()
    }

    fn next_reply(&self, action: &Action) -> Reply {
        let mut script = self.script.lock().unwrap();
        if let Some(queue) = script.get_mut(action) {
            if queue.len() > 1 {
                return queue.pop_front().unwrap();
            }
            if let Some(last) = queue.front() {
                return last.clone();
            }
        }

        if matches!(action, Action::Task(_)) {
            if let Some(reply) = self.any_task.lock().unwrap().clone() {
                return reply;
            }
        }

        Err(NetworkError::Transport {
            endpoint: action.endpoint().to_string(),
            reason: format!("no reply scripted for {}", action),
        })
    }
}

#[async_trait]
impl ActionRunner for ScriptedRunner {
    async fn perform(
        &self,
        action: &Action,
        token: Option<&Token>,
        _session: &SessionPayload,
    ) -> Result<ActionResult, NetworkError> {
        let registrations = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                action: *action,
                token: token.map(|t| t.expose().to_string()),
            });
            calls.iter().filter(|c| c.action == Action::Register).count()
        };

        let mut reply = self.next_reply(action);
        if let (Action::Register, Ok(result)) = (action, &mut reply) {
            if result.token.is_none() {
                result.token = Some(format!("tok-{}", registrations));
            }
        }
        reply
    }
}

/// Registers normally but never answers a task call.
#[derive(Default)]
pub struct StalledTasks {
    registrations: Mutex<u32>,
}

impl StalledTasks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionRunner for StalledTasks {
    async fn perform(
        &self,
        action: &Action,
        _token: Option<&Token>,
        _session: &SessionPayload,
    ) -> Result<ActionResult, NetworkError> {
        if *action == Action::Register {
            let n = {
                let mut count = self.registrations.lock().unwrap();
                *count += 1;
                *count
            };
            return ok(serde_json::json!({ "token": format!("tok-{}", n) }));
        }
        std::future::pending().await
    }
}

/// Records every requested wait without sleeping.
#[derive(Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Duration>>,
    cancel_after: Option<usize>,
}

impl RecordingWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run on the `n`-th wait.
    pub fn cancel_after(n: usize) -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            cancel_after: Some(n),
        }
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Waiter for RecordingWaiter {
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> WaitOutcome {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        let count = {
            let mut waits = self.waits.lock().unwrap();
            waits.push(duration);
            waits.len()
        };

        if self.cancel_after == Some(count) {
            cancel.cancel();
            return WaitOutcome::Cancelled;
        }
        WaitOutcome::Elapsed
    }
}

pub fn hours(h: u64) -> Duration {
    Duration::from_secs(h * 3600)
}
