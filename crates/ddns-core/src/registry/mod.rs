//! Plugin-based provider registry
//!
//! The registry maps provider type names to factories so the daemon can turn
//! the configured provider list into DNS clients without hard-coding provider
//! crates into the engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! ddns_provider_cloudflare::register(&registry, http_client.clone());
//! ddns_provider_digitalocean::register(&registry, http_client);
//!
//! // Clients come back in the order the configuration lists them
//! let clients = registry.create_clients(&config.providers)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsClient, DnsClientFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Provider registry for plugin-based DNS client creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS client factories
    providers: RwLock<HashMap<String, Box<dyn DnsClientFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS client factory under `name`, replacing any previous one
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsClientFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), factory);
    }

    /// Whether a factory is registered for `name`
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Names of all registered providers, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Create one DNS client from its configuration
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if no factory is registered for the provider type.
    pub fn create_client(&self, config: &ProviderConfig) -> Result<Box<dyn DnsClient>> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let name = config.type_name();
        let factory = providers.get(name).ok_or_else(|| {
            Error::config(format!("no DNS provider registered for '{name}'"))
        })?;
        factory.create(config)
    }

    /// Create DNS clients for every configuration, preserving order
    pub fn create_clients(&self, configs: &[ProviderConfig]) -> Result<Vec<Box<dyn DnsClient>>> {
        configs.iter().map(|config| self.create_client(config)).collect()
    }
}
