//! Configuration loading from disk and environment.
//!
//! Deployment environments configure the balancer through variables
//! (`BACKEND_1_URL`, `LOAD_BALANCER_PORT`, ...); a TOML file covers everything
//! else. Environment values win over file values.

use std::fs;
use std::path::Path;

use crate::config::schema::{BackendConfig, BalancerConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides, validate.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: BalancerConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<BalancerConfig, ConfigError> {
    let mut config = BalancerConfig::default();
    apply_env_overrides(&mut config);

    if config.backends.is_empty() {
        // Local three-node fleet, matching the default deployment.
        config.backends = vec![
            BackendConfig {
                name: "Backend Server 1".to_string(),
                url: "http://localhost:8000".to_string(),
            },
            BackendConfig {
                name: "Backend Server 2".to_string(),
                url: "http://localhost:8001".to_string(),
            },
            BackendConfig {
                name: "Backend Server 3".to_string(),
                url: "http://localhost:8002".to_string(),
            },
        ];
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Recognized environment variables, applied on top of whatever the file
/// (or defaults) provided.
fn apply_env_overrides(config: &mut BalancerConfig) {
    if let Ok(port) = std::env::var("LOAD_BALANCER_PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        } else {
            tracing::warn!(value = %port, "Ignoring unparsable LOAD_BALANCER_PORT");
        }
    }

    if let Ok(interval) = std::env::var("HEALTH_CHECK_INTERVAL") {
        match interval.parse() {
            Ok(secs) => config.health_check.interval_secs = secs,
            Err(_) => tracing::warn!(value = %interval, "Ignoring unparsable HEALTH_CHECK_INTERVAL"),
        }
    }

    if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT") {
        match timeout.parse() {
            Ok(secs) => config.timeouts.request_secs = secs,
            Err(_) => tracing::warn!(value = %timeout, "Ignoring unparsable REQUEST_TIMEOUT"),
        }
    }

    // BACKEND_1_URL, BACKEND_2_URL, ... replace the configured fleet when any
    // are present. Numbering starts at 1 and stops at the first gap.
    let mut env_backends = Vec::new();
    for n in 1.. {
        match std::env::var(format!("BACKEND_{}_URL", n)) {
            Ok(url) => env_backends.push(BackendConfig {
                name: format!("Backend Server {}", n),
                url,
            }),
            Err(_) => break,
        }
    }
    if !env_backends.is_empty() {
        config.backends = env_backends;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_backends_replace_fleet() {
        let mut config = BalancerConfig::default();
        config.backends.push(BackendConfig {
            name: "from-file".into(),
            url: "http://localhost:7000".into(),
        });

        std::env::set_var("BACKEND_1_URL", "http://localhost:8000");
        std::env::set_var("BACKEND_2_URL", "http://localhost:8001");
        apply_env_overrides(&mut config);
        std::env::remove_var("BACKEND_1_URL");
        std::env::remove_var("BACKEND_2_URL");

        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].url, "http://localhost:8000");
        assert_eq!(config.backends[1].name, "Backend Server 2");
    }

    #[test]
    fn port_override_rewrites_bind_address() {
        let mut config = BalancerConfig::default();
        std::env::set_var("LOAD_BALANCER_PORT", "9100");
        apply_env_overrides(&mut config);
        std::env::remove_var("LOAD_BALANCER_PORT");

        assert_eq!(config.listener.bind_address, "0.0.0.0:9100");
    }

    #[test]
    fn toml_round_trip() {
        let toml = r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[backends]]
            name = "b1"
            url = "http://127.0.0.1:8000"

            [health_check]
            interval_secs = 3
        "#;
        let config: BalancerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.health_check.interval_secs, 3);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
