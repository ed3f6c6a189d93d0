//! SMS provider abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SmsError;

/// What a provider reports back after accepting a send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
    /// Remaining account credits, when the vendor exposes them.
    pub credits: Option<f64>,
    /// Human-readable status from the vendor.
    pub message: String,
}

/// A vendor SMS API.
///
/// Implementations issue the HTTP calls and turn every failure (HTTP status,
/// vendor-reported error, transport) into an [`SmsError`]; they never panic.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Registry key, e.g. `"iprogtech"`.
    fn name(&self) -> &str;

    /// Send one message body to every number. Numbers are already canonical.
    async fn send(&self, numbers: &[String], message: &str) -> Result<SendReceipt, SmsError>;

    /// Fetch the remaining account balance.
    async fn check_balance(&self) -> Result<f64, SmsError>;
}

/// Read a JSON number that some vendors send as a string.
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Read an identifier that may be a JSON string or number.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull a human-readable error out of a vendor error body.
///
/// Looks at `message`/`error` first, then the first string found in any
/// field (validation errors are often `{"field": ["reason"]}`).
pub(crate) fn vendor_error_message(body: &Value) -> Option<String> {
    let body = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let obj = body.as_object()?;
    for key in ["message", "error", "errors"] {
        if let Some(msg) = obj.get(key).and_then(first_string) {
            return Some(msg);
        }
    }
    obj.values().find_map(first_string)
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}
