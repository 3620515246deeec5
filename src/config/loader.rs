//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ControlPlaneConfig;
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlPlaneConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ControlPlaneConfig, ConfigError> {
    let config: ControlPlaneConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::merge::DuplicatePolicy;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("node_id = \"edge-1\"").unwrap();
        assert_eq!(config.node_id, "edge-1");
        assert_eq!(config.watch.poll_interval_secs, 2);
        assert_eq!(config.listeners.external.port, 443);
        assert_eq!(config.merge.duplicates, DuplicatePolicy::LastWriterWins);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
            node_id = "edge-2"

            [watch]
            paths = ["/srv/conf.d", "/srv/extra"]
            ignore_hidden = false

            [listeners.internal]
            address = "10.0.0.1"
            common_name = "internal.example.com"

            [listeners.external]
            port = 8443

            [merge]
            duplicates = "reject"

            [observability]
            log_format = "json"
            metrics_enabled = false
        "#;
        let config = parse_config(content).unwrap();

        assert_eq!(config.watch.paths.len(), 2);
        assert!(!config.watch.ignore_hidden);
        assert_eq!(config.listeners.internal.port, 443);
        assert_eq!(config.listeners.internal.common_name, "internal.example.com");
        assert_eq!(config.listeners.external.port, 8443);
        assert_eq!(config.merge.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config("[watch]\npaths = []").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("watch.paths"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "node_id = \"from-disk\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.node_id, "from-disk");

        let missing = load_config(Path::new("/no/such/config.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
