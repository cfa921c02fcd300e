//! Access log model.

use super::common::DataSourceSpec;
use super::typed_config::{TypedConfig, FILE_ACCESS_LOG_TYPE_URL};
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::accesslog::v3::{access_log, AccessLog};
use envoy_types::pb::envoy::config::core::v3::{substitution_format_string, SubstitutionFormatString};
use envoy_types::pb::envoy::extensions::access_loggers::file::v3::{
    file_access_log::AccessLogFormat, FileAccessLog,
};
use serde::Deserialize;
use serde_json::Value;

/// `envoy.config.accesslog.v3.AccessLog` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLogSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub typed_config: Option<TypedConfig>,
}

impl AccessLogSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode access log", e))
    }

    /// Append `/{file_stem}.log` to the path of a file access logger.
    pub fn append_file_name(&mut self, file_stem: &str) -> Result<()> {
        let config = self
            .typed_config
            .as_mut()
            .filter(|config| config.type_url == FILE_ACCESS_LOG_TYPE_URL)
            .ok_or_else(|| {
                EdgeplaneError::validation_field(
                    "generated file names require a file access log typed config",
                    "typed_config",
                )
            })?;

        let base = match config.fields.get("path") {
            Some(Value::String(path)) => path.clone(),
            None => String::new(),
            Some(_) => {
                return Err(EdgeplaneError::validation_field(
                    "file access log path must be a string",
                    "typed_config.path",
                ))
            }
        };
        config
            .fields
            .insert("path".to_string(), Value::String(format!("{}/{}.log", base, file_stem)));
        Ok(())
    }

    pub fn to_proto(&self) -> Result<AccessLog> {
        let config_type = self
            .typed_config
            .as_ref()
            .map(|config| config.to_any().map(access_log::ConfigType::TypedConfig))
            .transpose()?;

        Ok(AccessLog { name: self.name.clone(), config_type, ..Default::default() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogFormatSpec {
    pub text_format_source: DataSourceSpec,
    #[serde(default)]
    pub omit_empty_values: bool,
    #[serde(default)]
    pub content_type: String,
}

/// `envoy.extensions.access_loggers.file.v3.FileAccessLog` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAccessLogSpec {
    pub path: String,
    #[serde(default)]
    pub log_format: Option<LogFormatSpec>,
}

impl FileAccessLogSpec {
    pub fn to_proto(&self) -> FileAccessLog {
        let access_log_format = self.log_format.as_ref().map(|format| {
            AccessLogFormat::LogFormat(SubstitutionFormatString {
                format: Some(substitution_format_string::Format::TextFormatSource(
                    format.text_format_source.to_proto(),
                )),
                omit_empty_values: format.omit_empty_values,
                content_type: format.content_type.clone(),
                ..Default::default()
            })
        });

        FileAccessLog { path: self.path.clone(), access_log_format }
    }
}
