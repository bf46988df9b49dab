//! Launch URL parsing
//!
//! A Telegram WebApp launch link carries the signed init data in a
//! `tgWebAppData` parameter (usually in the fragment). The init data is itself
//! a percent-encoded query string whose `user` value is percent-encoded JSON,
//! so values are decoded twice on the way in.

use core_logic::InputError;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Telegram user as embedded in the init data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_write_to_pm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Fields Telegram adds later are carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TelegramUser {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Identity bundle extracted once per run; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPayload {
    /// Decoded init data, replayed verbatim to the service
    pub init_data: String,
    pub user: TelegramUser,
    pub auth_date: Option<i64>,
    pub query_id: Option<String>,
    pub signature: Option<String>,
    pub hash: Option<String>,
    /// Referral code the link was opened with
    pub start_param: Option<String>,
}

impl SessionPayload {
    pub fn from_launch_url(input: &str) -> Result<Self, InputError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InputError::Empty);
        }

        let encoded = web_app_data(input)?;
        let init_data = decode(&encoded);
        Self::from_init_data(&init_data)
    }

    /// Parses an already-decoded init data string.
    pub fn from_init_data(init_data: &str) -> Result<Self, InputError> {
        let mut user = None;
        let mut auth_date = None;
        let mut query_id = None;
        let mut signature = None;
        let mut hash = None;
        let mut start_param = None;

        for (key, value) in pairs(init_data) {
            let value = decode(value);
            match key {
                "user" => {
                    let parsed: TelegramUser = serde_json::from_str(&value).map_err(|e| {
                        InputError::InvalidUser {
                            reason: e.to_string(),
                        }
                    })?;
                    user = Some(parsed);
                }
                "auth_date" => auth_date = value.parse().ok(),
                "query_id" => query_id = Some(value),
                "signature" => signature = Some(value),
                "hash" => hash = Some(value),
                "start_param" if !value.is_empty() => start_param = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            init_data: init_data.to_string(),
            user: user.ok_or(InputError::MissingUser)?,
            auth_date,
            query_id,
            signature,
            hash,
            start_param,
        })
    }

    /// Seconds since `auth_date`, if the link carried one.
    pub fn age_secs(&self, now_unix: i64) -> Option<u64> {
        self.auth_date
            .map(|issued| now_unix.saturating_sub(issued).max(0) as u64)
    }

    /// Fails when the session is older than `max_age_secs`.
    ///
    /// Links without an `auth_date` pass, since their age is unknown.
    pub fn check_fresh(&self, max_age_secs: Option<u64>, now_unix: i64) -> Result<(), InputError> {
        match (max_age_secs, self.age_secs(now_unix)) {
            (Some(max_secs), Some(age_secs)) if age_secs > max_secs => {
                Err(InputError::StaleSession { age_secs, max_secs })
            }
            _ => Ok(()),
        }
    }

    pub fn referral(&self) -> &str {
        self.start_param.as_deref().unwrap_or_default()
    }
}

fn web_app_data(input: &str) -> Result<String, InputError> {
    let url = Url::parse(input).map_err(|e| InputError::InvalidUrl {
        reason: e.to_string(),
    })?;

    let data = [url.fragment(), url.query()]
        .into_iter()
        .flatten()
        .find_map(|part| {
            pairs(part)
                .find(|(key, _)| *key == "tgWebAppData")
                .map(|(_, value)| value.to_string())
        })
        .filter(|value| !value.is_empty())
        .ok_or(InputError::MissingWebAppData);
    data
}

fn pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
