//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, port, static assets).
    pub listener: ListenerConfig,

    /// Descriptor advertised to the discovery backend.
    pub record: RecordConfig,

    /// Discovery backend selection and settings.
    pub discovery: DiscoveryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address without port (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Local listening port. Zero asks the OS for an ephemeral port.
    pub port: u16,

    /// Directory served for paths no route matches.
    pub static_dir: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: "webroot".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Settings for the advertised service record.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Service name.
    pub name: String,

    /// Externally reachable host or domain.
    pub host: String,

    /// Externally visible port (e.g. 80 behind a platform router).
    pub port: u16,

    /// Base path the API is mounted under.
    pub root: String,

    /// Publish the locally bound port instead of `port`.
    pub advertise_bound_port: bool,

    /// Free-form metadata published with the record.
    pub metadata: BTreeMap<String, String>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("kind".to_string(), "raider".to_string());
        metadata.insert("message".to_string(), "Hello 🌍".to_string());
        metadata.insert("uri".to_string(), "/ping".to_string());

        Self {
            name: "botsgarden".to_string(),
            host: "localhost".to_string(),
            port: 80,
            root: "/api".to_string(),
            advertise_bound_port: false,
            metadata,
        }
    }
}

/// Which discovery backend stores the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Redis hash.
    #[default]
    Redis,
    /// HTTP registry exposing register/remove/update/records paths.
    Rest,
    /// Process-local map.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redis => write!(f, "redis"),
            BackendKind::Rest => write!(f, "rest"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "rest" | "http" => Ok(BackendKind::Rest),
            "memory" | "local" => Ok(BackendKind::Memory),
            other => Err(format!("unknown discovery backend '{}'", other)),
        }
    }
}

/// Discovery backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Backend selected at startup.
    pub backend: BackendKind,

    /// Deadline for each backend call in milliseconds.
    pub timeout_ms: u64,

    /// Query and log all known records after the publish attempt.
    pub scan_on_startup: bool,

    /// Redis backend settings.
    pub redis: RedisConfig,

    /// REST backend settings.
    pub rest: RestConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            timeout_ms: 5_000,
            scan_on_startup: true,
            redis: RedisConfig::default(),
            rest: RestConfig::default(),
        }
    }
}

/// Redis backend configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Optional password.
    pub auth: Option<String>,
    /// Hash holding every record.
    pub collection_key: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            auth: None,
            collection_key: "vert.x.ms".to_string(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("collection_key", &self.collection_key)
            .finish()
    }
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RestConfig {
    pub host: String,
    pub port: u16,
    /// Path receiving `POST` of new records.
    pub register_path: String,
    /// Path prefix receiving `DELETE {path}/{id}`.
    pub remove_path: String,
    /// Path prefix receiving `PUT {path}/{id}`.
    pub update_path: String,
    /// Path answering `GET` with every record.
    pub records_path: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8500,
            register_path: "/register".to_string(),
            remove_path: "/remove".to_string(),
            update_path: "/update".to_string(),
            records_path: "/records".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight requests may run after the listener stops accepting.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
