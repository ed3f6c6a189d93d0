//! Semaphore SMS API client.
//!
//! One endpoint for any number of recipients; a send is accepted when the
//! response carries a `message_id`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::SemaphoreConfig;
use crate::error::SmsError;
use crate::sms::provider::{SendReceipt, SmsProvider, json_id, json_number, vendor_error_message};

pub const PROVIDER_NAME: &str = "semaphore";

/// Semaphore client.
pub struct SemaphoreClient {
    api_key: SecretString,
    sender_name: String,
    api_url: String,
    account_url: String,
    client: reqwest::Client,
}

impl SemaphoreClient {
    pub fn new(api_key: SecretString, sender_name: &str, api_url: &str, account_url: &str) -> Self {
        Self {
            api_key,
            sender_name: sender_name.to_string(),
            api_url: api_url.to_string(),
            account_url: account_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a client if an API key is configured.
    pub fn from_config(config: &SemaphoreConfig) -> Option<Self> {
        let key = config.api_key.clone()?;
        Some(Self::new(
            key,
            &config.sender_name,
            &config.api_url,
            &config.account_url,
        ))
    }

    fn transport_error(e: reqwest::Error) -> SmsError {
        SmsError::Transport {
            provider: PROVIDER_NAME.into(),
            reason: e.to_string(),
        }
    }
}

/// Interpret a Semaphore send response.
///
/// Successful sends come back as an array of per-recipient message objects;
/// the first one's `message_id` is reported.
fn parse_send_response(body: &Value) -> Result<SendReceipt, SmsError> {
    let first = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    let message_id = first.and_then(|m| m.get("message_id")).and_then(json_id);

    match message_id {
        Some(id) => {
            let status = first
                .and_then(|m| m.get("status"))
                .and_then(Value::as_str)
                .unwrap_or("Queued");
            Ok(SendReceipt {
                message_id: Some(id),
                credits: None,
                message: format!("SMS sent successfully ({status})"),
            })
        }
        None => Err(SmsError::Vendor {
            provider: PROVIDER_NAME.into(),
            message: vendor_error_message(body)
                .unwrap_or_else(|| "Failed to send SMS via Semaphore".to_string()),
        }),
    }
}

#[async_trait]
impl SmsProvider for SemaphoreClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, numbers: &[String], message: &str) -> Result<SendReceipt, SmsError> {
        let payload = serde_json::json!({
            "apikey": self.api_key.expose_secret(),
            "number": numbers.join(","),
            "message": message,
            "sendername": self.sender_name,
        });

        tracing::debug!(recipients = numbers.len(), "Semaphore send");

        let resp = self
            .client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Self::transport_error)?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(vendor_error_message)
                .unwrap_or_else(|| format!("Semaphore API returned HTTP {status}"));
            tracing::warn!(status = %status, "Semaphore send rejected: {message}");
            return Err(SmsError::Vendor {
                provider: PROVIDER_NAME.into(),
                message,
            });
        }

        let body = body.ok_or_else(|| SmsError::InvalidResponse {
            provider: PROVIDER_NAME.into(),
            reason: "response body is not JSON".into(),
        })?;

        let receipt = parse_send_response(&body).inspect_err(|e| {
            tracing::warn!(error = %e, "Semaphore reported a failed send");
        })?;

        tracing::info!(
            recipients = numbers.len(),
            message_id = ?receipt.message_id,
            "SMS sent via Semaphore"
        );
        Ok(receipt)
    }

    async fn check_balance(&self) -> Result<f64, SmsError> {
        let resp = self
            .client
            .get(&self.account_url)
            .query(&[("apikey", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SmsError::Vendor {
                provider: PROVIDER_NAME.into(),
                message: format!("Balance check returned HTTP {status}"),
            });
        }

        let body: Value = resp.json().await.map_err(|e| SmsError::InvalidResponse {
            provider: PROVIDER_NAME.into(),
            reason: e.to_string(),
        })?;

        body.get("credit_balance")
            .and_then(json_number)
            .ok_or_else(|| SmsError::InvalidResponse {
                provider: PROVIDER_NAME.into(),
                reason: "missing credit_balance".into(),
            })
    }
}
