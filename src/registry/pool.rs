//! Endpoint registry.
//!
//! # Responsibilities
//! - Hold the fixed set of candidate endpoints, in registration order
//! - Filter endpoints by capability
//! - Provide the full list for health checking and status reporting

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::{EndpointConfig, HealthCheckConfig};
use crate::registry::{endpoint::Endpoint, Capability};

/// Error raised when an endpoint definition cannot be turned into an endpoint.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("endpoint '{name}' has invalid base_url: {source}")]
    InvalidUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },
}

/// The fixed set of registered endpoints.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<Endpoint>>,
}

impl EndpointRegistry {
    /// Build a registry from endpoint definitions.
    pub fn from_config(
        configs: &[EndpointConfig],
        health: &HealthCheckConfig,
    ) -> Result<Self, RegistryError> {
        let mut endpoints = Vec::with_capacity(configs.len());
        for config in configs {
            let base_url =
                Url::parse(&config.base_url).map_err(|source| RegistryError::InvalidUrl {
                    name: config.name.clone(),
                    source,
                })?;
            let capabilities = config
                .capabilities
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(Capability::new);
            let health_path = config
                .health_path
                .clone()
                .unwrap_or_else(|| health.path.clone());

            endpoints.push(Arc::new(Endpoint::new(
                config.name.clone(),
                base_url,
                capabilities,
                health_path,
                health.failure_threshold,
            )));
        }

        tracing::debug!(count = endpoints.len(), "Endpoint registry built");
        Ok(Self { endpoints })
    }

    /// Build a registry from already-constructed endpoints.
    pub fn from_endpoints(endpoints: Vec<Arc<Endpoint>>) -> Self {
        Self { endpoints }
    }

    /// Endpoints serving `capability`, in registration order.
    pub fn list_endpoints(&self, capability: &Capability) -> Vec<Arc<Endpoint>> {
        self.endpoints
            .iter()
            .filter(|e| e.serves(capability))
            .cloned()
            .collect()
    }

    /// Return a list of all endpoints (for health checking).
    pub fn all_endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Look up an endpoint by name.
    pub fn get(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.iter().find(|e| e.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, caps: &[&str]) -> EndpointConfig {
        EndpointConfig {
            name: name.to_string(),
            base_url: format!("https://{name}.example.org"),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            health_path: None,
        }
    }

    #[test]
    fn test_list_by_capability() {
        let registry = EndpointRegistry::from_config(
            &[
                config("a", &["manga"]),
                config("b", &["anime"]),
                config("c", &["Manga", "anime"]),
            ],
            &HealthCheckConfig::default(),
        )
        .unwrap();

        let manga: Vec<_> = registry
            .list_endpoints(&Capability::new("manga"))
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(manga, vec!["a", "c"]);

        let anime: Vec<_> = registry
            .list_endpoints(&Capability::new("anime"))
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(anime, vec!["b", "c"]);

        assert!(registry.list_endpoints(&Capability::new("novel")).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_health_path_override() {
        let mut custom = config("a", &["manga"]);
        custom.health_path = Some("/status".into());
        let registry = EndpointRegistry::from_config(
            &[custom, config("b", &["manga"])],
            &HealthCheckConfig::default(),
        )
        .unwrap();
        assert_eq!(registry.get("a").unwrap().health_path, "/status");
        assert_eq!(registry.get("b").unwrap().health_path, "/health");
        assert!(registry.get("zzz").is_none());
    }

    #[test]
    fn test_invalid_url() {
        let mut bad = config("a", &["manga"]);
        bad.base_url = "::".into();
        let err = EndpointRegistry::from_config(&[bad], &HealthCheckConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }
}
