//! Gateway response bodies.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Default poll interval when the gateway omits one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
/// Default device-code lifetime when the gateway omits one.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 600;

/// `POST /cli/device/start`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStartResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `POST /cli/device/poll`
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePollResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl DevicePollResponse {
    /// The access token, only when the grant is approved and a token is present.
    pub fn approved_token(&self) -> Option<&str> {
        match (self.status.as_deref(), self.access_token.as_deref()) {
            (Some("approved"), Some(token)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

/// `POST /providers/{id}/connect`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    pub connection_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
}

impl ConnectResponse {
    /// `connection_id`, then `id`, then `"unknown"`.
    pub fn display_id(&self) -> &str {
        self.connection_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

/// `GET /env`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvExport {
    #[serde(rename = "BIMO_GATEWAY_URL", default)]
    pub gateway_url: Option<String>,
    #[serde(rename = "BIMO_KEY", default)]
    pub key: Option<String>,
}

/// One row of `GET /providers/connections`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConnection {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionList {
    #[serde(default)]
    pub data: Value,
}

/// `GET /providers/{id}/usage`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageReport {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub monthly_cost: f64,
    #[serde(default)]
    pub daily_spend: Vec<DailySpend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailySpend {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cost: f64,
}

fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(id_from_value(Value::deserialize(deserializer)?))
}

fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    id_from_value(Value::deserialize(deserializer)?)
        .ok_or_else(|| serde::de::Error::custom("connection id must be a string or number"))
}

/// Numbers, numeric strings, and null all read as an amount; anything else is zero.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
