//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, advertised ports valid)
//! - Check path shapes (API root and REST paths start with '/')
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BackendKind, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than zero"));
    }

    let record = &config.record;
    if record.name.trim().is_empty() {
        errors.push(ValidationError::new("record.name", "must not be empty"));
    }
    if record.host.trim().is_empty() {
        errors.push(ValidationError::new("record.host", "must not be empty"));
    }
    if record.port == 0 && !record.advertise_bound_port {
        errors.push(ValidationError::new(
            "record.port",
            "must be set unless advertise_bound_port is enabled",
        ));
    }
    check_path(&mut errors, "record.root", &record.root);
    check_route_root(&mut errors, "record.root", &record.root);

    let discovery = &config.discovery;
    if discovery.timeout_ms == 0 {
        errors.push(ValidationError::new("discovery.timeout_ms", "must be greater than zero"));
    }
    match discovery.backend {
        BackendKind::Redis => {
            if discovery.redis.host.trim().is_empty() {
                errors.push(ValidationError::new("discovery.redis.host", "must not be empty"));
            }
            if discovery.redis.port == 0 {
                errors.push(ValidationError::new("discovery.redis.port", "must not be zero"));
            }
            if discovery.redis.collection_key.is_empty() {
                errors.push(ValidationError::new("discovery.redis.collection_key", "must not be empty"));
            }
        }
        BackendKind::Rest => {
            let rest = &discovery.rest;
            if rest.host.trim().is_empty() {
                errors.push(ValidationError::new("discovery.rest.host", "must not be empty"));
            }
            if rest.port == 0 {
                errors.push(ValidationError::new("discovery.rest.port", "must not be zero"));
            }
            check_path(&mut errors, "discovery.rest.register_path", &rest.register_path);
            check_path(&mut errors, "discovery.rest.remove_path", &rest.remove_path);
            check_path(&mut errors, "discovery.rest.update_path", &rest.update_path);
            check_path(&mut errors, "discovery.rest.records_path", &rest.records_path);
        }
        BackendKind::Memory => {}
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, path: &str) {
    if !path.starts_with('/') {
        errors.push(ValidationError::new(field, format!("'{}' must start with '/'", path)));
    }
}

/// The root is spliced into route patterns, where these characters would
/// declare captures or wildcards.
const ROUTE_SYNTAX: [char; 4] = [':', '*', '{', '}'];

fn check_route_root(errors: &mut Vec<ValidationError>, field: &'static str, root: &str) {
    if let Some(c) = root.chars().find(|c| ROUTE_SYNTAX.contains(c)) {
        errors.push(ValidationError::new(
            field,
            format!("'{}' must not contain route syntax '{}'", root, c),
        ));
    }
}
