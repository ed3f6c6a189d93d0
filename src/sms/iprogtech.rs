//! iProgTech SMS API client.
//!
//! Single recipients go to `/sms_messages`, anything more to
//! `/sms_messages/send_bulk`. A successful send is followed by a balance
//! lookup so callers can see remaining credits.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::IProgTechConfig;
use crate::error::SmsError;
use crate::sms::provider::{SendReceipt, SmsProvider, json_id, json_number, vendor_error_message};

pub const PROVIDER_NAME: &str = "iprogtech";

/// iProgTech client.
pub struct IProgTechClient {
    api_token: SecretString,
    api_url: String,
    sms_provider: u8,
    client: reqwest::Client,
}

impl IProgTechClient {
    pub fn new(api_token: SecretString, api_url: &str, sms_provider: u8) -> Self {
        Self {
            api_token,
            api_url: api_url.trim_end_matches('/').to_string(),
            sms_provider,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client if an API token is configured.
    pub fn from_config(config: &IProgTechConfig) -> Option<Self> {
        let token = config.api_token.clone()?;
        Some(Self::new(token, &config.api_url, config.sms_provider))
    }

    /// Send endpoint for the given recipient count.
    fn send_url(&self, recipient_count: usize) -> String {
        if recipient_count > 1 {
            format!("{}/sms_messages/send_bulk", self.api_url)
        } else {
            format!("{}/sms_messages", self.api_url)
        }
    }

    fn balance_url(&self) -> String {
        format!("{}/account/sms_credits", self.api_url)
    }

    fn transport_error(e: reqwest::Error) -> SmsError {
        SmsError::Transport {
            provider: PROVIDER_NAME.into(),
            reason: e.to_string(),
        }
    }
}

/// Interpret an iProgTech send response body.
fn parse_send_response(body: &Value) -> Result<SendReceipt, SmsError> {
    let accepted = body.get("status").and_then(json_number) == Some(200.0);
    if !accepted {
        return Err(SmsError::Vendor {
            provider: PROVIDER_NAME.into(),
            message: vendor_error_message(body)
                .unwrap_or_else(|| "Failed to send SMS via iProgTech".to_string()),
        });
    }

    let message_id = body
        .get("message_id")
        .or_else(|| body.get("data").and_then(|d| d.get("message_id")))
        .and_then(json_id);

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "SMS sent successfully".to_string());

    Ok(SendReceipt {
        message_id,
        credits: None,
        message,
    })
}

#[async_trait]
impl SmsProvider for IProgTechClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, numbers: &[String], message: &str) -> Result<SendReceipt, SmsError> {
        let url = self.send_url(numbers.len());
        let payload = serde_json::json!({
            "api_token": self.api_token.expose_secret(),
            "phone_number": numbers.join(","),
            "message": message,
            "sms_provider": self.sms_provider,
        });

        tracing::debug!(recipients = numbers.len(), bulk = numbers.len() > 1, "iProgTech send");

        let resp = self
            .client
            .post(&url)
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
                .unwrap_or_else(|| format!("iProgTech API returned HTTP {status}"));
            tracing::warn!(status = %status, "iProgTech send rejected: {message}");
            return Err(SmsError::Vendor {
                provider: PROVIDER_NAME.into(),
                message,
            });
        }

        let body = body.ok_or_else(|| SmsError::InvalidResponse {
            provider: PROVIDER_NAME.into(),
            reason: "response body is not JSON".into(),
        })?;

        let mut receipt = parse_send_response(&body).inspect_err(|e| {
            tracing::warn!(error = %e, "iProgTech reported a failed send");
        })?;

        match self.check_balance().await {
            Ok(credits) => receipt.credits = Some(credits),
            Err(e) => tracing::warn!(error = %e, "iProgTech balance check after send failed"),
        }

        tracing::info!(
            recipients = numbers.len(),
            message_id = ?receipt.message_id,
            "SMS sent via iProgTech"
        );
        Ok(receipt)
    }

    async fn check_balance(&self) -> Result<f64, SmsError> {
        let resp = self
            .client
            .get(self.balance_url())
            .query(&[("api_token", self.api_token.expose_secret())])
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

        body.get("data")
            .and_then(|d| d.get("load_balance"))
            .and_then(json_number)
            .ok_or_else(|| SmsError::InvalidResponse {
                provider: PROVIDER_NAME.into(),
                reason: "missing data.load_balance".into(),
            })
    }
}
