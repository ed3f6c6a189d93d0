//! SMS dispatch facade.
//!
//! Validates input, normalizes recipients, picks a provider from the
//! registry and folds every outcome into a [`DispatchResult`]. Nothing is
//! retried and no error escapes as a panic or `Err`.

use serde::Serialize;

use crate::config::SmsConfig;
use crate::error::SmsError;
use crate::sms::phone::normalize_phone_number;
use crate::sms::registry::ProviderRegistry;
use crate::sms::templates::truncate_message;

/// One addressee of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Recipient {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Normalized outcome of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    /// Human-readable, safe to show directly in the UI.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    /// Machine-readable failure code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Valid numbers handed to the provider.
    pub sent_to: usize,
    /// Recipients dropped because their number did not normalize.
    pub dropped: usize,
    #[serde(skip)]
    invalid_request: bool,
}

impl DispatchResult {
    fn failure(err: &SmsError, provider: Option<&str>, sent_to: usize, dropped: usize) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            provider: provider.map(str::to_string),
            error: Some(err.code().to_string()),
            sent_to,
            dropped,
            invalid_request: err.is_validation(),
            ..Default::default()
        }
    }

    /// Whether the failure was caused by caller input rather than config or vendor.
    pub fn is_invalid_request(&self) -> bool {
        self.invalid_request
    }
}

/// Outcome of a balance lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub success: bool,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Numbers that survived normalization, plus how many did not.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizedRecipients {
    pub numbers: Vec<String>,
    pub dropped: usize,
}

/// Normalize each recipient, dropping (and logging) the invalid ones.
pub fn normalize_recipients(recipients: &[Recipient]) -> NormalizedRecipients {
    let mut out = NormalizedRecipients::default();
    for recipient in recipients {
        match normalize_phone_number(&recipient.phone_number) {
            Some(number) => out.numbers.push(number),
            None => {
                tracing::warn!(
                    phone = %recipient.phone_number,
                    name = ?recipient.display_name,
                    "Dropping recipient with invalid phone number"
                );
                out.dropped += 1;
            }
        }
    }
    out
}

/// Single entry point for outbound SMS.
pub struct SmsDispatcher {
    registry: ProviderRegistry,
    default_provider: String,
}

impl SmsDispatcher {
    pub fn new(registry: ProviderRegistry, default_provider: impl Into<String>) -> Self {
        Self {
            registry,
            default_provider: default_provider.into().to_lowercase(),
        }
    }

    /// Build the registry from config and use its default provider.
    pub fn from_config(config: &SmsConfig) -> Self {
        Self::new(
            ProviderRegistry::from_config(config),
            config.default_provider.clone(),
        )
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    fn resolve_name(&self, provider: Option<&str>) -> String {
        provider
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_provider.as_str())
            .to_lowercase()
    }

    fn not_configured(name: &str) -> SmsError {
        SmsError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: "Set its API credential in the environment.".to_string(),
        }
    }

    /// Send `message` to every valid recipient through the selected provider.
    pub async fn send(
        &self,
        recipients: &[Recipient],
        message: &str,
        provider: Option<&str>,
    ) -> DispatchResult {
        if recipients.is_empty() {
            return DispatchResult::failure(&SmsError::EmptyRecipients, None, 0, 0);
        }
        if message.trim().is_empty() {
            return DispatchResult::failure(&SmsError::EmptyMessage, None, 0, 0);
        }

        let NormalizedRecipients { numbers, dropped } = normalize_recipients(recipients);
        if numbers.is_empty() {
            return DispatchResult::failure(&SmsError::InvalidNumbers, None, 0, dropped);
        }

        let name = self.resolve_name(provider);
        let Some(client) = self.registry.get(&name) else {
            tracing::error!(provider = %name, "SMS provider not configured");
            return DispatchResult::failure(&Self::not_configured(&name), Some(&name), 0, dropped);
        };

        let body = truncate_message(message);
        tracing::info!(
            provider = %name,
            recipients = numbers.len(),
            dropped,
            length = body.chars().count(),
            "Dispatching SMS"
        );

        match client.send(&numbers, &body).await {
            Ok(receipt) => DispatchResult {
                success: true,
                message: receipt.message,
                provider: Some(name),
                message_id: receipt.message_id,
                credits: receipt.credits,
                error: None,
                sent_to: numbers.len(),
                dropped,
                invalid_request: false,
            },
            Err(e) => {
                tracing::warn!(provider = %name, error = %e, "SMS dispatch failed");
                DispatchResult::failure(&e, Some(&name), numbers.len(), dropped)
            }
        }
    }

    /// Look up the remaining balance of the selected provider.
    pub async fn check_balance(&self, provider: Option<&str>) -> BalanceResult {
        let name = self.resolve_name(provider);
        let outcome = match self.registry.get(&name) {
            Some(client) => client.check_balance().await,
            None => Err(Self::not_configured(&name)),
        };

        match outcome {
            Ok(credits) => BalanceResult {
                success: true,
                provider: name,
                credits: Some(credits),
                message: format!("{credits} credits remaining"),
                error: None,
            },
            Err(e) => {
                tracing::warn!(provider = %name, error = %e, "Balance check failed");
                BalanceResult {
                    success: false,
                    provider: name,
                    credits: None,
                    message: e.to_string(),
                    error: Some(e.code().to_string()),
                }
            }
        }
    }
}
