mod common;

use common::{http, ok, session, timeout, RecordingWaiter, ScriptedRunner, StalledTasks};
use core_logic::{NetworkError, RetryConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use teabank_bot::{Action, TokenManager};
use tokio_util::sync::CancellationToken;

fn manager(runner: Arc<ScriptedRunner>, waiter: Arc<RecordingWaiter>) -> TokenManager {
    TokenManager::new(
        runner,
        session(),
        waiter,
        RetryConfig::fixed(Duration::from_secs(300)),
    )
}

#[tokio::test]
async fn test_acquire_succeeds_after_transient_failures() {
    let runner = Arc::new(ScriptedRunner::new().on(
        Action::Register,
        vec![
            timeout(),
            http(503),
            Err(NetworkError::InvalidResponse {
                endpoint: "user-api".to_string(),
                reason: "expected value".to_string(),
            }),
            ok(json!({ "token": "fresh", "water": 2 })),
        ],
    ));
    let waiter = Arc::new(RecordingWaiter::new());
    let mut tokens = manager(runner.clone(), waiter.clone());

    let token = tokens.acquire(&CancellationToken::new()).await.unwrap();

    assert_eq!(token.expose(), "fresh");
    assert_eq!(waiter.waits(), vec![Duration::from_secs(300); 3]);
    assert_eq!(runner.actions(), vec![Action::Register; 4]);
    assert_eq!(tokens.current().map(|t| t.expose()), Some("fresh"));
    assert_eq!(tokens.last_registration().map(|r| r.water), Some(2));
}

#[tokio::test]
async fn test_permanent_rejection_is_still_retried() {
    let runner = Arc::new(
        ScriptedRunner::new().on(Action::Register, vec![http(403), ok(json!({}))]),
    );
    let waiter = Arc::new(RecordingWaiter::new());
    let mut tokens = manager(runner, waiter.clone());

    let token = tokens.acquire(&CancellationToken::new()).await.unwrap();

    assert_eq!(token.expose(), "tok-2");
    assert_eq!(waiter.waits().len(), 1);
}

#[tokio::test]
async fn test_acquire_returns_none_when_cancelled() {
    let runner = Arc::new(ScriptedRunner::new().on(Action::Register, vec![timeout()]));
    let waiter = Arc::new(RecordingWaiter::cancel_after(2));
    let mut tokens = manager(runner.clone(), waiter.clone());

    assert!(tokens.acquire(&CancellationToken::new()).await.is_none());
    assert_eq!(waiter.waits().len(), 2);
    assert_eq!(runner.actions().len(), 2);
    assert!(tokens.current().is_none());
}

#[tokio::test]
async fn test_registration_without_token_is_invalid() {
    let runner = Arc::new(
        ScriptedRunner::new().on(Action::Register, vec![ok(json!({ "token": "" }))]),
    );
    let mut tokens = manager(runner, Arc::new(RecordingWaiter::new()));

    let err = tokens.refresh(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, NetworkError::InvalidResponse { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_response_token_replaces_held_token() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Action::Register, vec![ok(json!({}))])
            .on(Action::FetchState, vec![ok(json!({ "token": "rotated" }))])
            .on(Action::Status, vec![ok(json!({ "success": true }))]),
    );
    let mut tokens = manager(runner.clone(), Arc::new(RecordingWaiter::new()));

    let cancel = CancellationToken::new();
    tokens.refresh(&cancel).await.unwrap();
    tokens.perform(Action::FetchState, &cancel).await.unwrap();
    tokens.perform(Action::Status, &cancel).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls[1].token.as_deref(), Some("tok-1"));
    assert_eq!(calls[2].token.as_deref(), Some("rotated"));
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_cancel_abandons_in_flight_request() {
    let mut tokens = TokenManager::new(
        Arc::new(StalledTasks::new()),
        session(),
        Arc::new(RecordingWaiter::new()),
        RetryConfig::fixed(Duration::from_secs(300)),
    );
    let cancel = CancellationToken::new();
    tokens.acquire(&cancel).await.unwrap();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = tokens.perform(Action::Task(1), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(tokens.current().map(|t| t.expose()), Some("tok-1"));
}
