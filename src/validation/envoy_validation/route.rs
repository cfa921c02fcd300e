use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::route::v3::{
    route::Action, route_action::ClusterSpecifier, Route, RouteAction, RouteConfiguration,
    RouteMatch, VirtualHost,
};

use super::helpers::{check_typed_config, encode_check, nested};

pub fn validate_route_configuration(route_config: &RouteConfiguration) -> Result<()> {
    encode_check(route_config, "Invalid route configuration")?;

    if route_config.name.is_empty() {
        return Err(EdgeplaneError::validation_field(
            "Route configuration name cannot be empty",
            "name",
        ));
    }

    if route_config.virtual_hosts.is_empty() {
        return Err(EdgeplaneError::validation_field(
            "At least one virtual host is required",
            "virtual_hosts",
        ));
    }

    for (index, vhost) in route_config.virtual_hosts.iter().enumerate() {
        validate_virtual_host(vhost)
            .map_err(|e| nested(index, "Virtual host", "virtual_hosts", e))?;
    }

    Ok(())
}

pub fn validate_virtual_host(vhost: &VirtualHost) -> Result<()> {
    if vhost.name.is_empty() {
        return Err(EdgeplaneError::validation_field("Virtual host name cannot be empty", "name"));
    }

    if vhost.domains.is_empty() {
        return Err(EdgeplaneError::validation_field("At least one domain is required", "domains"));
    }

    if vhost.domains.iter().any(String::is_empty) {
        return Err(EdgeplaneError::validation_field("Domain cannot be empty", "domains"));
    }

    for (index, route) in vhost.routes.iter().enumerate() {
        validate_route(route).map_err(|e| nested(index, "Route", "routes", e))?;
    }

    for any in vhost.typed_per_filter_config.values() {
        check_typed_config(any, "typed_per_filter_config")?;
    }

    Ok(())
}

pub fn validate_route(route: &Route) -> Result<()> {
    match &route.r#match {
        Some(route_match) => validate_route_match(route_match)?,
        None => return Err(EdgeplaneError::validation_field("Route match is required", "match")),
    }

    for any in route.typed_per_filter_config.values() {
        check_typed_config(any, "typed_per_filter_config")?;
    }

    match &route.action {
        Some(Action::Route(route_action)) => validate_route_action(route_action),
        Some(Action::DirectResponse(direct)) => {
            if !(200..600).contains(&direct.status) && !(100..200).contains(&direct.status) {
                return Err(EdgeplaneError::validation_field(
                    format!("Direct response status {} is out of range", direct.status),
                    "direct_response.status",
                ));
            }
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation_field("Route action is required", "action")),
    }
}

fn validate_route_match(route_match: &RouteMatch) -> Result<()> {
    if route_match.path_specifier.is_none() {
        return Err(EdgeplaneError::validation_field("Path specifier is required", "match"));
    }

    if route_match.headers.iter().any(|header| header.name.is_empty()) {
        return Err(EdgeplaneError::validation_field(
            "Header matcher name cannot be empty",
            "match.headers",
        ));
    }

    Ok(())
}

fn validate_route_action(route_action: &RouteAction) -> Result<()> {
    match &route_action.cluster_specifier {
        Some(ClusterSpecifier::Cluster(name)) if name.is_empty() => {
            Err(EdgeplaneError::validation_field("Cluster name cannot be empty", "route.cluster"))
        }
        Some(ClusterSpecifier::ClusterHeader(header)) if header.is_empty() => Err(
            EdgeplaneError::validation_field("Cluster header cannot be empty", "route.cluster_header"),
        ),
        Some(ClusterSpecifier::WeightedClusters(weighted)) => {
            if weighted.clusters.is_empty() {
                return Err(EdgeplaneError::validation_field(
                    "At least one weighted cluster is required",
                    "route.weighted_clusters",
                ));
            }
            if weighted.clusters.iter().any(|cluster| cluster.name.is_empty()) {
                return Err(EdgeplaneError::validation_field(
                    "Weighted cluster name cannot be empty",
                    "route.weighted_clusters",
                ));
            }
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation_field("Cluster specifier is required", "route")),
    }
}
