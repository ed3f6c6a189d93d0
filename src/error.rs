//! Error types for the OSCA notification service.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// SMS dispatch and provider errors.
///
/// Validation and configuration variants are raised before any network
/// call is made.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("No recipients provided")]
    EmptyRecipients,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("No valid phone numbers provided")]
    InvalidNumbers,

    #[error("SMS provider '{provider}' is not configured. {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("{provider}: {message}")]
    Vendor { provider: String, message: String },

    #[error("{provider} request failed: {reason}")]
    Transport { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl SmsError {
    /// Stable machine-readable code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRecipients => "EMPTY_RECIPIENTS",
            Self::EmptyMessage => "EMPTY_MESSAGE",
            Self::InvalidNumbers => "INVALID_NUMBERS",
            Self::ProviderNotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
            Self::Vendor { .. } | Self::InvalidResponse { .. } => "PROVIDER_ERROR",
            Self::Transport { .. } => "NETWORK_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to a config or vendor fault).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyRecipients | Self::EmptyMessage | Self::InvalidNumbers
        )
    }
}
