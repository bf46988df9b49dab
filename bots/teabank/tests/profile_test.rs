mod common;

use common::{http, ok, session, RecordingWaiter, ScriptedRunner};
use core_logic::Bot;
use serde_json::json;
use std::sync::Arc;
use teabank_bot::{fetch_profile, Action, ProfileBot, TeaBankConfig, TokenManager};
use tokio_util::sync::CancellationToken;

fn tokens(runner: Arc<ScriptedRunner>) -> TokenManager {
    TokenManager::new(
        runner,
        session(),
        Arc::new(RecordingWaiter::new()),
        TeaBankConfig::default().registration_retry(),
    )
}

#[tokio::test]
async fn test_failed_read_renews_token_and_retries_once() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Action::Register, vec![ok(json!({}))])
            .on(
                Action::FetchState,
                vec![http(500), ok(json!({ "first_name": "Ada", "water": 4 }))],
            ),
    );
    let mut tokens = tokens(runner.clone());

    let profile = fetch_profile(&mut tokens, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.water, 4);
    assert_eq!(
        runner.actions(),
        vec![
            Action::Register,
            Action::FetchState,
            Action::Register,
            Action::FetchState,
        ]
    );

    let calls = runner.calls();
    assert_eq!(calls[3].token.as_deref(), Some("tok-2"));
}

#[tokio::test]
async fn test_second_failed_read_is_returned() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Action::Register, vec![ok(json!({}))])
            .on(Action::FetchState, vec![http(403)]),
    );
    let mut tokens = tokens(runner.clone());

    let err = fetch_profile(&mut tokens, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(
        runner
            .actions()
            .iter()
            .filter(|a| **a == Action::FetchState)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_profile_bot_reports_failure() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Action::Register, vec![ok(json!({}))])
            .on(Action::FetchState, vec![http(500)]),
    );
    let mut bot = ProfileBot::new(
        runner,
        session(),
        Arc::new(RecordingWaiter::new()),
        &TeaBankConfig::default(),
    );

    assert!(bot.start(CancellationToken::new()).await.is_err());
    assert!(bot.profile().is_none());

    let stats = bot.metrics();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.successes, 0);
}

#[tokio::test]
async fn test_profile_bot_keeps_profile() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Action::Register, vec![ok(json!({}))])
            .on(
                Action::FetchState,
                vec![ok(json!({ "balance": "7.5", "energy": 10 }))],
            ),
    );
    let mut bot = ProfileBot::new(
        runner,
        session(),
        Arc::new(RecordingWaiter::new()),
        &TeaBankConfig::default(),
    );

    let stats = bot.start(CancellationToken::new()).await.unwrap();

    assert_eq!(stats.successes, 1);
    let profile = bot.profile().unwrap();
    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.balance.as_deref(), Some("7.5"));
    assert_eq!(profile.energy, 10);
}
