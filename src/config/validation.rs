//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the cluster selector resolves to a usable descriptor
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::cluster::resolve;
use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.handshake_secs", config.timeouts.handshake_secs),
        ("timeouts.subscription_secs", config.timeouts.subscription_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let mut names = HashSet::new();
    for (i, cluster) in config.clusters.iter().enumerate() {
        if !cluster.name.is_empty() && !names.insert(cluster.name.as_str()) {
            errors.push(ValidationError::new(
                format!("clusters[{}].name", i),
                format!("duplicate cluster name '{}'", cluster.name),
            ));
        }
    }

    if let Err(e) = resolve(&config.clusters, config.cluster.as_ref()) {
        errors.push(ValidationError::new("clusters", e.to_string()));
    }

    if !config.upstream.proxy_prefix.is_empty() && !config.upstream.proxy_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "upstream.proxy_prefix",
            "must start with '/'",
        ));
    }

    if let Some(tap_url) = &config.upstream.tap_url {
        match url::Url::parse(tap_url) {
            Ok(u) if u.scheme() == "ws" || u.scheme() == "wss" => {}
            Ok(u) => errors.push(ValidationError::new(
                "upstream.tap_url",
                format!("unsupported scheme '{}', expected ws or wss", u.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("upstream.tap_url", e.to_string())),
        }
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
