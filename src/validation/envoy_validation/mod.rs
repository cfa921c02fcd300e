//! Envoy-types protocol validation helpers grouped by resource type.

mod cluster;
mod filter;
mod helpers;
mod listener;
mod route;
mod secret;

pub use cluster::validate_cluster;
pub use filter::{validate_access_log, validate_http_filter, validate_upgrade_config};
pub use listener::validate_filter_chain;
pub use route::{validate_route, validate_route_configuration, validate_virtual_host};
pub use secret::validate_secret;

