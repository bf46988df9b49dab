use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Status label the service uses once a farm can be harvested.
pub const CLAIMABLE_STATUS: &str = "CAN_CLAIM";

/// Response body of any action.
///
/// Every field is optional on the wire. Absent, `null` and unparsable values
/// fall back to the defaults below instead of failing the whole response:
/// `success` → `false`, counters → `0`, text fields → `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionResult {
    pub token: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Seconds until the farm can be claimed
    #[serde(deserialize_with = "lenient_u64")]
    pub time_left: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub water: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub energy: u64,
    pub balance: Option<Value>,
    pub ton_balance: Option<Value>,
    pub claimed_amount: Option<Value>,
    pub claimed_amount_token: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionResult {
    pub fn is_claimable(&self) -> bool {
        self.status.as_deref() == Some(CLAIMABLE_STATUS)
    }

    /// Claimable right now, no countdown left.
    pub fn ready_to_claim(&self) -> bool {
        self.is_claimable() && self.time_left == 0
    }

    /// Text of an extra field, with JSON strings unquoted.
    pub fn extra_text(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(value_text)
    }
}

/// Renders a scalar JSON value without quotes; `null` gives `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let as_float = |v: f64| if v.is_finite() && v > 0.0 { v as u64 } else { 0 };

    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().map_or(0, as_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(as_float))
                .unwrap_or(0)
        }
        _ => 0,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}
