//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check addresses, URLs, header names and store keys are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ThrottleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{StoreBackend, ThrottleConfig, PLACEHOLDER_API_KEY};
use crate::store::is_valid_key;

/// Upper bound on read retries; anything larger cannot fit a sane budget.
pub const MAX_READ_RETRIES: u32 = 10;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("store.retries_on_timeout must be at most {max}, got {got}")]
    TooManyRetries { max: u32, got: u32 },

    #[error("store.endpoint '{0}' must be an http or https URL")]
    InvalidEndpoint(String),

    #[error("{field}: '{value}' is not a store-safe key segment")]
    UnsafeKey { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid header name")]
    InvalidHeader { field: &'static str, value: String },

    #[error("route '{0}' needs a host or a path prefix")]
    EmptyRoute(String),

    #[error("route '{name}': path prefix '{prefix}' must start with '/'")]
    InvalidPathPrefix { name: String, prefix: String },

    #[error("admin.api_key must be changed from the placeholder when admin is enabled")]
    PlaceholderApiKey,
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeader {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ThrottleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_addr(&mut errors, "upstream.address", &config.upstream.address);
    if config.upstream.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "upstream.max_body_bytes" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.connect_secs" });
    }

    let store = &config.store;
    if store.read_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "store.read_timeout_ms" });
    }
    if store.retries_on_timeout > MAX_READ_RETRIES {
        errors.push(ValidationError::TooManyRetries {
            max: MAX_READ_RETRIES,
            got: store.retries_on_timeout,
        });
    }
    if store.backend == StoreBackend::Http {
        let scheme_ok = url::Url::parse(&store.endpoint)
            .map(|u| u.scheme() == "http" || u.scheme() == "https")
            .unwrap_or(false);
        if !scheme_ok {
            errors.push(ValidationError::InvalidEndpoint(store.endpoint.clone()));
        }
        for (field, value) in [("store.namespace", &store.namespace), ("store.group", &store.group)] {
            if !is_valid_key(value) {
                errors.push(ValidationError::UnsafeKey {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    let throttle = &config.throttle;
    if throttle.default_max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "throttle.default_max_attempts" });
    }
    check_header(&mut errors, "throttle.client_ip_header", &throttle.client_ip_header);
    check_header(&mut errors, "throttle.max_attempts_header", &throttle.max_attempts_header);
    if !is_valid_key(&throttle.identity.sentinel_key) {
        errors.push(ValidationError::UnsafeKey {
            field: "throttle.identity.sentinel_key",
            value: throttle.identity.sentinel_key.clone(),
        });
    }

    for route in &config.routes {
        match (&route.host, &route.path_prefix) {
            (None, None) => errors.push(ValidationError::EmptyRoute(route.name.clone())),
            (_, Some(prefix)) if !prefix.starts_with('/') => {
                errors.push(ValidationError::InvalidPathPrefix {
                    name: route.name.clone(),
                    prefix: prefix.clone(),
                });
            }
            _ => {}
        }
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key == PLACEHOLDER_API_KEY || config.admin.api_key.is_empty() {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
