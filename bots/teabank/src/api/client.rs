//! HTTP implementation of [`ActionRunner`]
//!
//! One `reqwest::Client` per run. Browser headers are installed once as
//! defaults; per-endpoint fetch metadata is prebuilt and attached to every
//! request. Response decompression is left to reqwest.

use super::{Action, ActionResult, ActionRunner, Endpoint};
use crate::config::TeaBankConfig;
use crate::session::SessionPayload;
use crate::token::Token;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::NetworkError;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use tracing::debug;

const BODY_PREVIEW_CHARS: usize = 200;

pub struct HttpActionRunner {
    client: Client,
    config: TeaBankConfig,
    user_api_headers: HeaderMap,
    tasks_api_headers: HeaderMap,
}

impl HttpActionRunner {
    pub fn new(config: &TeaBankConfig) -> Result<Self> {
        let mut client_builder = Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(proxy_config) = config.proxy() {
            let proxy = Proxy::all(&proxy_config.url)
                .with_context(|| format!("Failed to create proxy for URL: {}", proxy_config.url))?;

            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                client_builder = client_builder.proxy(proxy.basic_auth(username, password));
            } else {
                client_builder = client_builder.proxy(proxy);
            }
        }

        let client = client_builder
            .build()
            .context("Failed to build reqwest client")?;

        Ok(Self {
            client,
            user_api_headers: endpoint_headers(config, Endpoint::UserApi)?,
            tasks_api_headers: endpoint_headers(config, Endpoint::TasksApi)?,
            config: config.clone(),
        })
    }

    fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::UserApi => &self.config.api.user_api_url,
            Endpoint::TasksApi => &self.config.api.tasks_api_url,
        }
    }

    fn headers(&self, endpoint: Endpoint) -> HeaderMap {
        match endpoint {
            Endpoint::UserApi => self.user_api_headers.clone(),
            Endpoint::TasksApi => self.tasks_api_headers.clone(),
        }
    }
}

#[async_trait]
impl ActionRunner for HttpActionRunner {
    async fn perform(
        &self,
        action: &Action,
        token: Option<&Token>,
        session: &SessionPayload,
    ) -> Result<ActionResult, NetworkError> {
        let endpoint = action.endpoint();
        let body = action.body(token, session, &self.config.client);

        debug!("→ {} {}", action, endpoint);

        let response = self
            .client
            .post(self.url(endpoint))
            .headers(self.headers(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &self.config, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(endpoint, &self.config, e))?;

        debug!("← {} {} ({} bytes)", action, status.as_u16(), bytes.len());

        interpret_response(endpoint, status, &bytes, &self.config.api.rate_limit_message)
    }
}

/// Classifies a completed exchange.
///
/// The rate-limit message is recognised regardless of status code. A 2xx
/// from the tasks API counts as success even when its body is not a JSON
/// object.
pub fn interpret_response(
    endpoint: Endpoint,
    status: StatusCode,
    body: &[u8],
    rate_limit_message: &str,
) -> Result<ActionResult, NetworkError> {
    let parsed = serde_json::from_slice::<ActionResult>(body);

    if let Ok(result) = &parsed {
        if result.error.as_deref().map(str::trim) == Some(rate_limit_message.trim()) {
            return Err(NetworkError::RateLimited {
                endpoint: endpoint.to_string(),
                message: rate_limit_message.to_string(),
            });
        }
    }

    if !status.is_success() {
        return Err(NetworkError::HttpError {
            status_code: status.as_u16(),
            endpoint: endpoint.to_string(),
            body: preview(body),
        });
    }

    match (parsed, endpoint) {
        (Ok(result), _) => Ok(result),
        (Err(e), Endpoint::TasksApi) => {
            debug!("Task reply is not a JSON object ({}); treating as done", e);
            Ok(ActionResult::default())
        }
        (Err(e), Endpoint::UserApi) => Err(NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn transport_error(endpoint: Endpoint, config: &TeaBankConfig, e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            timeout_ms: config.request_timeout().as_millis() as u64,
            endpoint: endpoint.to_string(),
        }
    } else if e.is_decode() {
        NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    } else {
        NetworkError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

fn default_headers(config: &TeaBankConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_str(&config.client.user_agent).context("Invalid user agent")?,
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(HeaderName::from_static("sec-gpc"), HeaderValue::from_static("1"));
    Ok(headers)
}

fn endpoint_headers(config: &TeaBankConfig, endpoint: Endpoint) -> Result<HeaderMap> {
    let origin = config.api.app_origin.trim_end_matches('/');
    let referer = format!("{}/", origin);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_str(origin).context("Invalid app origin")?,
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_str(&referer).context("Invalid app origin")?,
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-site"),
    );

    match endpoint {
        Endpoint::UserApi => {
            headers.insert(
                HeaderName::from_static("priority"),
                HeaderValue::from_static("u=4"),
            );
        }
        Endpoint::TasksApi => {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static("application/json, text/plain, */*"),
            );
            headers.insert(
                HeaderName::from_static("priority"),
                HeaderValue::from_static("u=0"),
            );
        }
    }

    Ok(headers)
}

fn preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_logic::FailureKind;

    const LIMIT: &str = "You have reached the daily task limit.";

    fn interpret(status: u16, body: &str) -> Result<ActionResult, NetworkError> {
        interpret_at(Endpoint::TasksApi, status, body)
    }

    fn interpret_at(
        endpoint: Endpoint,
        status: u16,
        body: &str,
    ) -> Result<ActionResult, NetworkError> {
        interpret_response(
            endpoint,
            StatusCode::from_u16(status).unwrap(),
            body.as_bytes(),
            LIMIT,
        )
    }

    #[test]
    fn test_success_body() {
        let result = interpret(200, r#"{"success":true,"token":"t"}"#).unwrap();
        assert!(result.success);
        assert_eq!(result.token.as_deref(), Some("t"));
    }

    #[test]
    fn test_rate_limit_on_any_status() {
        let body = format!(r#"{{"error":"{}"}}"#, LIMIT);
        for status in [200, 400, 403] {
            let err = interpret(status, &body).unwrap_err();
            assert_eq!(err.kind(), FailureKind::RateLimited);
        }
    }

    #[test]
    fn test_other_error_message_is_not_rate_limit() {
        let err = interpret(400, r#"{"error":"Task already completed"}"#).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(interpret(429, "").unwrap_err().kind(), FailureKind::Transient);
        assert_eq!(interpret(502, "<html>").unwrap_err().kind(), FailureKind::Transient);
        assert_eq!(interpret(401, "{}").unwrap_err().kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_undecodable_success_is_transient() {
        let err = interpret_at(Endpoint::UserApi, 200, "<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidResponse { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_task_success_without_json_body() {
        for body in ["", "OK", "[]"] {
            let result = interpret(200, body).unwrap();
            assert!(result.error.is_none());
        }
        assert!(interpret(204, "").is_ok());
        assert_eq!(interpret(500, "OK").unwrap_err().kind(), FailureKind::Transient);
    }

    #[test]
    fn test_runner_builds_with_proxy() {
        let mut config = TeaBankConfig::default();
        config.api.proxy = Some("127.0.0.1:8080:user:pass".to_string());
        assert!(HttpActionRunner::new(&config).is_ok());
    }

    #[test]
    fn test_endpoint_headers() {
        let config = TeaBankConfig::default();
        let tasks = endpoint_headers(&config, Endpoint::TasksApi).unwrap();
        let user = endpoint_headers(&config, Endpoint::UserApi).unwrap();

        assert_eq!(tasks["priority"], "u=0");
        assert_eq!(user["priority"], "u=4");
        assert_eq!(user[header::ORIGIN], "https://app.teabank.io");
        assert_eq!(user[header::REFERER], "https://app.teabank.io/");
    }
}
