//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ThrottleConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ThrottleConfig, ConfigError> {
    let config: ThrottleConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ThrottleConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(parse_config("[store\nbroken"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_lists_all_problems() {
        let err = parse_config("[throttle]\ndefault_max_attempts = 0\n[store]\nread_timeout_ms = 0\n").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("throttle.default_max_attempts"));
        assert!(message.contains("store.read_timeout_ms"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/twofa-throttle.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("twofa-throttle-{}.toml", std::process::id()));
        fs::write(&path, "[throttle]\ndefault_max_attempts = 4\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.throttle.default_max_attempts, 4);

        fs::remove_file(&path).unwrap_or_default();
    }
}
