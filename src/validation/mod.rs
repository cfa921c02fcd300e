//! # Validation Module
//!
//! Structural validation of generated Envoy messages. Every record the
//! assembler hands out passes through one of these checks first, so the proxy
//! never receives a config it would reject on load.

pub mod envoy_validation;

pub use envoy_validation::{
    validate_access_log, validate_cluster, validate_filter_chain, validate_http_filter,
    validate_route, validate_route_configuration, validate_secret, validate_upgrade_config,
    validate_virtual_host,
};
