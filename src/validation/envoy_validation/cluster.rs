use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::{
    cluster::v3::{cluster::ClusterDiscoveryType, cluster::DiscoveryType, Cluster},
    core::v3::{address::Address as AddressType, Address},
    endpoint::v3::{lb_endpoint, ClusterLoadAssignment, LbEndpoint},
};

use super::helpers::{encode_check, nested};

pub fn validate_cluster(cluster: &Cluster) -> Result<()> {
    encode_check(cluster, "Invalid cluster configuration")?;

    if cluster.name.is_empty() {
        return Err(EdgeplaneError::validation_field("Cluster name cannot be empty", "name"));
    }

    if let Some(timeout) = &cluster.connect_timeout {
        if timeout.seconds < 0 || (timeout.seconds == 0 && timeout.nanos <= 0) {
            return Err(EdgeplaneError::validation_field(
                "Connect timeout must be positive",
                "connect_timeout",
            ));
        }
    }

    let is_eds = matches!(
        cluster.cluster_discovery_type,
        Some(ClusterDiscoveryType::Type(t)) if t == DiscoveryType::Eds as i32
    );

    if is_eds && cluster.eds_cluster_config.is_none() {
        return Err(EdgeplaneError::validation_field(
            "EDS clusters require eds_cluster_config",
            "eds_cluster_config",
        ));
    }

    if let Some(load_assignment) = &cluster.load_assignment {
        validate_cluster_load_assignment(load_assignment)?;
    }

    Ok(())
}

fn validate_cluster_load_assignment(load_assignment: &ClusterLoadAssignment) -> Result<()> {
    if load_assignment.cluster_name.is_empty() {
        return Err(EdgeplaneError::validation_field(
            "Cluster name cannot be empty",
            "load_assignment.cluster_name",
        ));
    }

    for (index, locality_endpoints) in load_assignment.endpoints.iter().enumerate() {
        for lb_endpoint in &locality_endpoints.lb_endpoints {
            validate_lb_endpoint(lb_endpoint)
                .map_err(|e| nested(index, "Locality endpoints", "load_assignment.endpoints", e))?;
        }
    }

    Ok(())
}

fn validate_lb_endpoint(lb_endpoint: &LbEndpoint) -> Result<()> {
    match &lb_endpoint.host_identifier {
        Some(lb_endpoint::HostIdentifier::Endpoint(endpoint)) => match &endpoint.address {
            Some(address) => validate_address(address),
            None => Err(EdgeplaneError::validation("Endpoint address is required")),
        },
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation("Endpoint host identifier is required")),
    }
}

fn validate_address(address: &Address) -> Result<()> {
    match &address.address {
        Some(AddressType::SocketAddress(socket)) => {
            if socket.address.is_empty() {
                return Err(EdgeplaneError::validation("Socket address cannot be empty"));
            }
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation("Address is required")),
    }
}
