//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint identity (unique names, parseable base URLs)
//! - Validate value ranges (limits > 0, sweep fits in cache)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::{HistoryBackend, RouterConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("duplicate endpoint name '{0}'")]
    DuplicateEndpoint(String),

    #[error("endpoint '{name}' has invalid base_url '{url}': {reason}")]
    InvalidBaseUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("endpoint '{0}' declares no capabilities")]
    NoCapabilities(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("cache.sweep_batch ({batch}) must not exceed cache.max_entries ({max})")]
    SweepTooLarge { batch: usize, max: usize },

    #[error("path '{0}' must start with '/'")]
    RelativePath(String),

    #[error("history.directory is required for the file backend")]
    MissingHistoryDirectory,

    #[error("admin API enabled with the placeholder api_key")]
    PlaceholderApiKey,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut names = HashSet::new();
    for endpoint in &config.endpoints {
        if !names.insert(endpoint.name.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint(endpoint.name.clone()));
        }

        match Url::parse(&endpoint.base_url) {
            Ok(url) if url.cannot_be_a_base() => errors.push(ValidationError::InvalidBaseUrl {
                name: endpoint.name.clone(),
                url: endpoint.base_url.clone(),
                reason: "not a base URL".to_string(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidBaseUrl {
                name: endpoint.name.clone(),
                url: endpoint.base_url.clone(),
                reason: e.to_string(),
            }),
        }

        if endpoint.capabilities.iter().all(|c| c.trim().is_empty()) {
            errors.push(ValidationError::NoCapabilities(endpoint.name.clone()));
        }

        if let Some(path) = &endpoint.health_path {
            if !path.starts_with('/') {
                errors.push(ValidationError::RelativePath(path.clone()));
            }
        }
    }

    let dispatch = &config.dispatch;
    if dispatch.max_concurrent_requests == 0 {
        errors.push(ValidationError::Zero {
            field: "dispatch.max_concurrent_requests",
        });
    }
    if dispatch.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "dispatch.request_timeout_ms",
        });
    }

    let cache = &config.cache;
    if cache.enabled {
        if cache.max_entries == 0 {
            errors.push(ValidationError::Zero {
                field: "cache.max_entries",
            });
        }
        if cache.sweep_batch == 0 {
            errors.push(ValidationError::Zero {
                field: "cache.sweep_batch",
            });
        } else if cache.sweep_batch > cache.max_entries {
            errors.push(ValidationError::SweepTooLarge {
                batch: cache.sweep_batch,
                max: cache.max_entries,
            });
        }
    }

    let health = &config.health_check;
    if health.failure_threshold == 0 {
        errors.push(ValidationError::Zero {
            field: "health_check.failure_threshold",
        });
    }
    if health.enabled {
        if health.interval_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "health_check.interval_secs",
            });
        }
        if health.timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "health_check.timeout_secs",
            });
        }
    }
    if !health.path.starts_with('/') {
        errors.push(ValidationError::RelativePath(health.path.clone()));
    }

    if config.history.capacity == 0 {
        errors.push(ValidationError::Zero {
            field: "history.capacity",
        });
    }
    if config.history.backend == HistoryBackend::File && config.history.directory.is_none() {
        errors.push(ValidationError::MissingHistoryDirectory);
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::PlaceholderApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
