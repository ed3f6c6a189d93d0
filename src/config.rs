//! Configuration types.
//!
//! Everything is read once at startup and handed to constructors; nothing
//! re-reads the environment afterwards.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_IPROGTECH_API_URL: &str = "https://sms.iprogtech.com/api/v1";
pub const DEFAULT_SEMAPHORE_API_URL: &str = "https://api.semaphore.co/api/v4/messages";
pub const DEFAULT_SEMAPHORE_ACCOUNT_URL: &str = "https://api.semaphore.co/api/v4/account";
pub const DEFAULT_SEMAPHORE_SENDER_NAME: &str = "SEMAPHORE";
pub const DEFAULT_PROVIDER: &str = "iprogtech";

/// iProgTech credentials and endpoint.
#[derive(Debug, Clone)]
pub struct IProgTechConfig {
    pub api_token: Option<SecretString>,
    pub api_url: String,
    /// Upstream carrier route selector passed through as `sms_provider`.
    pub sms_provider: u8,
}

impl Default for IProgTechConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: DEFAULT_IPROGTECH_API_URL.to_string(),
            sms_provider: 0,
        }
    }
}

/// Semaphore credentials and endpoints.
#[derive(Debug, Clone)]
pub struct SemaphoreConfig {
    pub api_key: Option<SecretString>,
    pub sender_name: String,
    pub api_url: String,
    pub account_url: String,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sender_name: DEFAULT_SEMAPHORE_SENDER_NAME.to_string(),
            api_url: DEFAULT_SEMAPHORE_API_URL.to_string(),
            account_url: DEFAULT_SEMAPHORE_ACCOUNT_URL.to_string(),
        }
    }
}

/// SMS subsystem configuration.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Provider used when a request does not name one.
    pub default_provider: String,
    pub iprogtech: IProgTechConfig,
    pub semaphore: SemaphoreConfig,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            iprogtech: IProgTechConfig::default(),
            semaphore: SemaphoreConfig::default(),
        }
    }
}

impl SmsConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let default_provider = get("SMS_DEFAULT_PROVIDER")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

        let sms_provider = match get("IPROGTECH_SMS_PROVIDER") {
            Some(raw) => raw.parse::<u8>().map_err(|e| ConfigError::InvalidValue {
                key: "IPROGTECH_SMS_PROVIDER".into(),
                message: format!("expected a small integer, got {raw:?} ({e})"),
            })?,
            None => 0,
        };

        let iprogtech = IProgTechConfig {
            api_token: get("IPROGTECH_API_TOKEN").map(SecretString::from),
            api_url: get("IPROGTECH_API_URL")
                .unwrap_or_else(|| DEFAULT_IPROGTECH_API_URL.to_string()),
            sms_provider,
        };

        let semaphore = SemaphoreConfig {
            api_key: get("SEMAPHORE_API_KEY").map(SecretString::from),
            sender_name: get("SEMAPHORE_SENDER_NAME")
                .unwrap_or_else(|| DEFAULT_SEMAPHORE_SENDER_NAME.to_string()),
            api_url: get("SEMAPHORE_API_URL")
                .unwrap_or_else(|| DEFAULT_SEMAPHORE_API_URL.to_string()),
            account_url: get("SEMAPHORE_ACCOUNT_URL")
                .unwrap_or_else(|| DEFAULT_SEMAPHORE_ACCOUNT_URL.to_string()),
        };

        Ok(Self {
            default_provider,
            iprogtech,
            semaphore,
        })
    }
}

/// HTTP server and storage settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("OSCA_NOTIFY_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(8080);
        let db_path = lookup("OSCA_NOTIFY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/osca-notify.db"));
        Self { port, db_path }
    }
}
