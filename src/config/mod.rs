//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: SERVICE_*, REDIS_*, PORT, ...)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the advertised record never changes
//!   while the service runs
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendKind, DiscoveryConfig, ListenerConfig, LogFormat, ObservabilityConfig, RecordConfig,
    RedisConfig, RestConfig, ServiceConfig, ShutdownConfig, TimeoutConfig,
};
