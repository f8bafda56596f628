//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → handed to lifecycle::startup to build the service
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the endpoint set is fixed for the
//!   lifetime of a service instance
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::CacheConfig;
pub use schema::DispatchConfig;
pub use schema::EndpointConfig;
pub use schema::HealthCheckConfig;
pub use schema::HistoryBackend;
pub use schema::HistoryConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RouterConfig;
