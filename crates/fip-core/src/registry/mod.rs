//! Plugin-based API registry
//!
//! The registry maps API type names to factories, so the binary can build
//! whichever remote API the configuration names without a hardcoded match.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fip_core::registry::ApiRegistry;
//! use fip_core::config::ApiConfig;
//!
//! let registry = ApiRegistry::with_builtin();
//! fip_provider_neutron::register(&registry);
//!
//! let api = registry.create_api(&ApiConfig::Memory)?;
//! ```

use crate::api::MemoryFloatingIpApiFactory;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::traits::{FloatingIpApi, FloatingIpApiFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of remote API factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ApiRegistry {
    apis: RwLock<HashMap<String, Box<dyn FloatingIpApiFactory>>>,
}

impl ApiRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-core APIs (`memory`) registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_api("memory", Box::new(MemoryFloatingIpApiFactory));
        registry
    }

    /// Register an API factory under `name`, replacing any previous one
    pub fn register_api(&self, name: impl Into<String>, factory: Box<dyn FloatingIpApiFactory>) {
        let mut apis = self.apis.write().unwrap_or_else(|e| e.into_inner());
        apis.insert(name.into(), factory);
    }

    /// Create an API from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FloatingIpApi>)`: Created API instance
    /// - `Err(Error)`: If the API type is not registered or creation fails
    pub fn create_api(&self, config: &ApiConfig) -> Result<Box<dyn FloatingIpApi>> {
        let api_type = config.type_name();
        let apis = self.apis.read().unwrap_or_else(|e| e.into_inner());

        let factory = apis
            .get(api_type)
            .ok_or_else(|| Error::config(format!("Unknown API type: {}", api_type)))?;

        factory.create(config)
    }

    /// List all registered API types, sorted
    pub fn list_apis(&self) -> Vec<String> {
        let apis = self.apis.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = apis.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if an API type is registered
    pub fn has_api(&self, name: &str) -> bool {
        let apis = self.apis.read().unwrap_or_else(|e| e.into_inner());
        apis.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnavailableFactory;

    impl FloatingIpApiFactory for UnavailableFactory {
        fn create(&self, _config: &ApiConfig) -> Result<Box<dyn FloatingIpApi>> {
            Err(Error::not_found("Mock API not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ApiRegistry::new();

        assert!(!registry.has_api("mock"));

        registry.register_api("mock", Box::new(UnavailableFactory));

        assert!(registry.has_api("mock"));
        assert!(registry.list_apis().contains(&"mock".to_string()));
    }

    #[test]
    fn test_builtin_memory_api() {
        let registry = ApiRegistry::with_builtin();
        let api = registry.create_api(&ApiConfig::Memory).unwrap();
        assert_eq!(api.api_name(), "memory");
    }

    #[test]
    fn test_unknown_api_type() {
        let registry = ApiRegistry::with_builtin();
        let config = ApiConfig::Neutron {
            endpoint: "https://network.example.com".to_string(),
            token: "t".to_string(),
        };
        assert!(matches!(registry.create_api(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_factory_lookup() {
        let registry = ApiRegistry::new();
        registry.register_api("mock", Box::new(UnavailableFactory));

        let config = ApiConfig::Custom {
            factory: "mock".to_string(),
            config: serde_json::json!({}),
        };
        assert!(matches!(registry.create_api(&config), Err(Error::NotFound(_))));
    }
}
