//! Lookup table of configured SMS providers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SmsConfig;
use crate::sms::iprogtech::IProgTechClient;
use crate::sms::provider::SmsProvider;
use crate::sms::semaphore::SemaphoreClient;

/// Registry of SMS providers keyed by name.
///
/// Built once at startup; the dispatcher only reads from it.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn SmsProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every vendor that has credentials in `config`.
    pub fn from_config(config: &SmsConfig) -> Self {
        let mut registry = Self::new();
        if let Some(client) = IProgTechClient::from_config(&config.iprogtech) {
            registry.register(Arc::new(client));
        }
        if let Some(client) = SemaphoreClient::from_config(&config.semaphore) {
            registry.register(Arc::new(client));
        }
        registry
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn SmsProvider>) {
        let name = provider.name().to_lowercase();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "Replaced existing SMS provider registration");
        } else {
            tracing::debug!(provider = %name, "Registered SMS provider");
        }
    }

    /// Get a provider by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn SmsProvider>> {
        self.providers.get(&name.trim().to_lowercase()).cloned()
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
