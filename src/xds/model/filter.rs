//! HTTP filter and protocol upgrade models.

use super::typed_config::TypedConfig;
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::UpgradeConfig, http_filter, HttpFilter,
};
use envoy_types::pb::google::protobuf::BoolValue;
use serde::Deserialize;
use serde_json::Value;

/// HCM `HttpFilter` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFilterSpec {
    pub name: String,
    #[serde(default)]
    pub typed_config: Option<TypedConfig>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl HttpFilterSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode http filter", e))
    }

    pub fn to_proto(&self) -> Result<HttpFilter> {
        let config_type = self
            .typed_config
            .as_ref()
            .map(|config| config.to_any().map(http_filter::ConfigType::TypedConfig))
            .transpose()?;

        Ok(HttpFilter {
            name: self.name.clone(),
            config_type,
            is_optional: self.is_optional,
            disabled: self.disabled,
            ..Default::default()
        })
    }
}

/// HCM `UpgradeConfig` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradeConfigSpec {
    pub upgrade_type: String,
    #[serde(default)]
    pub filters: Vec<HttpFilterSpec>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl UpgradeConfigSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode upgrade config", e))
    }

    pub fn to_proto(&self) -> Result<UpgradeConfig> {
        Ok(UpgradeConfig {
            upgrade_type: self.upgrade_type.clone(),
            filters: self.filters.iter().map(HttpFilterSpec::to_proto).collect::<Result<_>>()?,
            enabled: self.enabled.map(|value| BoolValue { value }),
            ..Default::default()
        })
    }
}
