use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::accesslog::v3::{access_log, AccessLog};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::UpgradeConfig, http_filter, HttpFilter,
};

use super::helpers::{check_typed_config, nested};

pub fn validate_http_filter(filter: &HttpFilter) -> Result<()> {
    if filter.name.is_empty() {
        return Err(EdgeplaneError::validation_field("HTTP filter name cannot be empty", "name"));
    }

    if let Some(http_filter::ConfigType::TypedConfig(any)) = &filter.config_type {
        check_typed_config(any, "typed_config")?;
    }

    Ok(())
}

pub fn validate_access_log(access_log: &AccessLog) -> Result<()> {
    if access_log.name.is_empty() {
        return Err(EdgeplaneError::validation_field("Access log name cannot be empty", "name"));
    }

    match &access_log.config_type {
        Some(access_log::ConfigType::TypedConfig(any)) => check_typed_config(any, "typed_config"),
        None => Err(EdgeplaneError::validation_field(
            "Access log configuration is required",
            "typed_config",
        )),
    }
}

pub fn validate_upgrade_config(upgrade: &UpgradeConfig) -> Result<()> {
    if upgrade.upgrade_type.is_empty() {
        return Err(EdgeplaneError::validation_field(
            "Upgrade type cannot be empty",
            "upgrade_type",
        ));
    }

    for (index, filter) in upgrade.filters.iter().enumerate() {
        validate_http_filter(filter).map_err(|e| nested(index, "Upgrade filter", "filters", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::google::protobuf::Any;

    #[test]
    fn http_filter_validation() {
        let router = HttpFilter {
            name: "envoy.filters.http.router".to_string(),
            config_type: Some(http_filter::ConfigType::TypedConfig(Any {
                type_url: "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router"
                    .to_string(),
                value: vec![],
            })),
            ..Default::default()
        };
        assert!(validate_http_filter(&router).is_ok());

        let bad_url = HttpFilter {
            name: "custom".to_string(),
            config_type: Some(http_filter::ConfigType::TypedConfig(Any {
                type_url: "custom.Filter".to_string(),
                value: vec![],
            })),
            ..Default::default()
        };
        assert!(validate_http_filter(&bad_url).is_err());
    }

    #[test]
    fn access_log_requires_typed_config() {
        let log = AccessLog { name: "envoy.access_loggers.file".to_string(), ..Default::default() };
        assert!(validate_access_log(&log).is_err());
    }

    #[test]
    fn upgrade_requires_type() {
        assert!(validate_upgrade_config(&UpgradeConfig::default()).is_err());
        let websocket = UpgradeConfig { upgrade_type: "websocket".to_string(), ..Default::default() };
        assert!(validate_upgrade_config(&websocket).is_ok());
    }
}
