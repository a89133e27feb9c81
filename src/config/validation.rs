//! Configuration validation.
//!
//! Serde handles the syntactic layer; this module covers semantic checks:
//! a non-empty fleet, unique node names, parsable base URLs, sane intervals.
//! All errors are collected and returned together, not just the first.

use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("duplicate backend name: {0}")]
    DuplicateBackendName(String),

    #[error("backend {name} has invalid url {url}: {reason}")]
    InvalidBackendUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = std::collections::HashSet::new();
    for backend in &config.backends {
        if !seen.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackendName(backend.name.clone()));
        }
        if let Err(e) = Url::parse(&backend.url) {
            errors.push(ValidationError::InvalidBackendUrl {
                name: backend.name.clone(),
                url: backend.url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "health_check.interval_secs",
        });
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "health_check.timeout_secs",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "timeouts.request_secs",
        });
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
