//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    load_config_with(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file or default values.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |var: &str| env(var).filter(|v| !v.is_empty());

    if let Some(v) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("PORT") {
        config.listener.port = parse_var("PORT", v)?;
    }
    if let Some(v) = lookup("STATIC_DIR") {
        config.listener.static_dir = v;
    }

    if let Some(v) = lookup("SERVICE_NAME") {
        config.record.name = v;
    }
    if let Some(v) = lookup("SERVICE_HOST") {
        config.record.host = v;
    }
    if let Some(v) = lookup("SERVICE_PORT") {
        config.record.port = parse_var("SERVICE_PORT", v)?;
    }
    if let Some(v) = lookup("SERVICE_ROOT") {
        config.record.root = v;
    }
    if let Some(v) = lookup("ADVERTISE_BOUND_PORT") {
        config.record.advertise_bound_port = parse_var("ADVERTISE_BOUND_PORT", v)?;
    }

    if let Some(v) = lookup("DISCOVERY_BACKEND") {
        config.discovery.backend = parse_var("DISCOVERY_BACKEND", v)?;
    }
    if let Some(v) = lookup("DISCOVERY_TIMEOUT_MS") {
        config.discovery.timeout_ms = parse_var("DISCOVERY_TIMEOUT_MS", v)?;
    }

    if let Some(v) = lookup("REDIS_HOST") {
        config.discovery.redis.host = v;
    }
    if let Some(v) = lookup("REDIS_PORT") {
        config.discovery.redis.port = parse_var("REDIS_PORT", v)?;
    }
    if let Some(v) = lookup("REDIS_PASSWORD") {
        config.discovery.redis.auth = Some(v);
    }
    if let Some(v) = lookup("REDIS_RECORDS_KEY") {
        config.discovery.redis.collection_key = v;
    }

    if let Some(v) = lookup("DISCOVERY_REST_HOST") {
        config.discovery.rest.host = v;
    }
    if let Some(v) = lookup("DISCOVERY_REST_PORT") {
        config.discovery.rest.port = parse_var("DISCOVERY_REST_PORT", v)?;
    }

    if let Some(v) = lookup("DRAIN_TIMEOUT_SECS") {
        config.shutdown.drain_timeout_secs = parse_var("DRAIN_TIMEOUT_SECS", v)?;
    }
    if let Some(v) = lookup("LOG_FORMAT") {
        config.observability.log_format = parse_var("LOG_FORMAT", v)?;
    }

    Ok(())
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
        var,
        reason: e.to_string(),
        value,
    })
}
