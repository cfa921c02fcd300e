use crate::errors::types::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::core::v3::transport_socket;
use envoy_types::pb::envoy::config::listener::v3::{filter::ConfigType, Filter, FilterChain};

use super::helpers::{check_typed_config, encode_check, nested};

pub fn validate_filter_chain(filter_chain: &FilterChain) -> Result<()> {
    encode_check(filter_chain, "Invalid filter chain")?;

    if filter_chain.name.is_empty() {
        return Err(EdgeplaneError::validation_field("Filter chain name cannot be empty", "name"));
    }

    if filter_chain.filters.is_empty() {
        return Err(EdgeplaneError::validation_field("At least one filter is required", "filters"));
    }

    for (index, filter) in filter_chain.filters.iter().enumerate() {
        validate_filter(filter).map_err(|e| nested(index, "Filter", "filters", e))?;
    }

    if let Some(socket) = &filter_chain.transport_socket {
        if socket.name.is_empty() {
            return Err(EdgeplaneError::validation_field(
                "Transport socket name cannot be empty",
                "transport_socket.name",
            ));
        }
        match &socket.config_type {
            Some(transport_socket::ConfigType::TypedConfig(any)) => {
                check_typed_config(any, "transport_socket.typed_config")?
            }
            None => {
                return Err(EdgeplaneError::validation_field(
                    "Transport socket configuration is required",
                    "transport_socket.typed_config",
                ))
            }
        }
    }

    Ok(())
}

fn validate_filter(filter: &Filter) -> Result<()> {
    if filter.name.is_empty() {
        return Err(EdgeplaneError::validation("Filter name cannot be empty"));
    }

    match &filter.config_type {
        Some(ConfigType::TypedConfig(any)) => check_typed_config(any, "typed_config"),
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation("Filter configuration is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::google::protobuf::Any;

    fn hcm_filter() -> Filter {
        Filter {
            name: "envoy.filters.network.http_connection_manager".to_string(),
            config_type: Some(ConfigType::TypedConfig(Any {
                type_url: "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager".to_string(),
                value: vec![],
            })),
        }
    }

    #[test]
    fn filter_chain_validation() {
        let chain = FilterChain {
            name: "edge/web".to_string(),
            filters: vec![hcm_filter()],
            ..Default::default()
        };
        assert!(validate_filter_chain(&chain).is_ok());

        let no_filters = FilterChain { name: "edge/web".to_string(), ..Default::default() };
        assert!(validate_filter_chain(&no_filters).is_err());
    }

    #[test]
    fn filter_without_config_is_rejected() {
        let chain = FilterChain {
            name: "edge/web".to_string(),
            filters: vec![Filter { name: "broken".to_string(), config_type: None }],
            ..Default::default()
        };
        let err = validate_filter_chain(&chain).unwrap_err();
        assert!(err.to_string().contains("Filter 0 validation failed"));
    }
}
