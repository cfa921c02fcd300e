//! # Configuration Settings
//!
//! Defines the settings of the resource assembler and the CLI around it.

use crate::errors::{EdgeplaneError, Result};
use crate::xds::rbac::DEFAULT_RBAC_FILTER_NAME;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Annotation on an access log config asking for a per-service log file
pub const DEFAULT_AUTO_FILENAME_ANNOTATION: &str = "edgeplane.io/auto-generated-filename";
/// Label selecting credentials for the certificate index
pub const DEFAULT_INDEX_LABEL_KEY: &str = "edgeplane.io/secret-type";
pub const DEFAULT_INDEX_LABEL_VALUE: &str = "sds-cached";

/// Assembler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AssemblerSettings {
    /// Namespace used for cluster lookups when a service has none
    #[validate(length(min = 1, message = "Default namespace cannot be empty"))]
    pub default_namespace: String,

    /// Annotation key that turns on per-service access log file names
    #[validate(length(min = 1, message = "Auto-filename annotation cannot be empty"))]
    pub auto_filename_annotation: String,

    /// HTTP filter name of the synthesized RBAC filter
    #[validate(length(min = 1, message = "RBAC filter name cannot be empty"))]
    pub rbac_filter_name: String,

    #[validate(nested)]
    pub index: IndexSettings,

    #[validate(nested)]
    pub logging: LoggingSettings,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            default_namespace: crate::domain::DEFAULT_NAMESPACE.to_string(),
            auto_filename_annotation: DEFAULT_AUTO_FILENAME_ANNOTATION.to_string(),
            rbac_filter_name: DEFAULT_RBAC_FILTER_NAME.to_string(),
            index: IndexSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AssemblerSettings {
    /// Load settings from an optional file and `EDGEPLANE__*` environment
    /// variables, e.g. `EDGEPLANE__LOGGING__LEVEL=debug`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }
        let settings: Self = builder
            .add_source(
                ::config::Environment::with_prefix("EDGEPLANE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(EdgeplaneError::from)?;

        if self.rbac_filter_name.chars().any(char::is_whitespace) {
            return Err(EdgeplaneError::validation_field(
                "RBAC filter name cannot contain whitespace",
                "rbac_filter_name",
            ));
        }

        Ok(())
    }
}

/// Label selector of the certificate index
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IndexSettings {
    #[validate(length(min = 1, message = "Index label key cannot be empty"))]
    pub label_key: String,

    pub label_value: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            label_key: DEFAULT_INDEX_LABEL_KEY.to_string(),
            label_value: DEFAULT_INDEX_LABEL_VALUE.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = AssemblerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rbac_filter_name, "envoy.filters.http.rbac");
        assert_eq!(settings.index.label_value, "sds-cached");
    }

    #[test]
    fn test_empty_namespace_is_rejected() {
        let settings =
            AssemblerSettings { default_namespace: String::new(), ..AssemblerSettings::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "default_namespace: edge\nlogging:\n  level: debug\n  json: true").unwrap();

        let settings = AssemblerSettings::load(file.path().to_str()).unwrap();
        assert_eq!(settings.default_namespace, "edge");
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        assert_eq!(settings.auto_filename_annotation, DEFAULT_AUTO_FILENAME_ANNOTATION);
    }

    #[test]
    fn test_invalid_file_value_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rbac_filter_name: \"\"").unwrap();
        assert!(AssemblerSettings::load(file.path().to_str()).is_err());
    }
}
