//! Upstream cluster model.

use super::common::ProtoDuration;
use super::typed_config::TypedConfig;
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::cluster::v3::cluster::{
    ClusterDiscoveryType, DiscoveryType, DnsLookupFamily, EdsClusterConfig, LbPolicy,
};
use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::core::v3::{
    address, config_source::ConfigSourceSpecifier, socket_address, transport_socket,
    AggregatedConfigSource, ApiVersion, ConfigSource, SocketAddress, TransportSocket,
};
use envoy_types::pb::envoy::config::core::v3::Address;
use envoy_types::pb::envoy::config::endpoint::v3::{
    lb_endpoint, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Only the proxy name of a cluster payload, decoded leniently for matching.
#[derive(Debug, Deserialize)]
pub struct ClusterName {
    #[serde(default)]
    pub name: String,
}

impl ClusterName {
    pub fn from_value(value: &Value) -> Option<String> {
        serde_json::from_value::<ClusterName>(value.clone())
            .ok()
            .map(|cluster| cluster.name)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketAddressSpec {
    pub address: String,
    pub port_value: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressSpec {
    pub socket_address: SocketAddressSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSpec {
    pub address: AddressSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LbEndpointSpec {
    pub endpoint: EndpointSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalityLbEndpointsSpec {
    #[serde(default)]
    pub lb_endpoints: Vec<LbEndpointSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadAssignmentSpec {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub endpoints: Vec<LocalityLbEndpointsSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdsClusterConfigSpec {
    #[serde(default)]
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSocketSpec {
    pub name: String,
    #[serde(default)]
    pub typed_config: Option<TypedConfig>,
}

/// `envoy.config.cluster.v3.Cluster` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    pub name: String,
    #[serde(default, rename = "type")]
    pub discovery_type: Option<String>,
    #[serde(default)]
    pub connect_timeout: Option<ProtoDuration>,
    #[serde(default)]
    pub lb_policy: Option<String>,
    #[serde(default)]
    pub dns_lookup_family: Option<String>,
    #[serde(default)]
    pub load_assignment: Option<LoadAssignmentSpec>,
    #[serde(default)]
    pub eds_cluster_config: Option<EdsClusterConfigSpec>,
    #[serde(default)]
    pub transport_socket: Option<TransportSocketSpec>,
    #[serde(default)]
    pub typed_extension_protocol_options: BTreeMap<String, TypedConfig>,
}

impl ClusterSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode cluster", e))
    }

    pub fn to_proto(&self) -> Result<Cluster> {
        let discovery_type = map_discovery_type(&self.name, self.discovery_type.as_deref())?;
        let lb_policy = map_lb_policy(&self.name, self.lb_policy.as_deref())?;
        let dns_lookup_family =
            map_dns_lookup_family(&self.name, self.dns_lookup_family.as_deref())?;

        let load_assignment = self.load_assignment.as_ref().map(|assignment| {
            ClusterLoadAssignment {
                cluster_name: if assignment.cluster_name.is_empty() {
                    self.name.clone()
                } else {
                    assignment.cluster_name.clone()
                },
                endpoints: assignment
                    .endpoints
                    .iter()
                    .map(|locality| LocalityLbEndpoints {
                        lb_endpoints: locality.lb_endpoints.iter().map(lb_endpoint_proto).collect(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }
        });

        let eds_cluster_config = self.eds_cluster_config.as_ref().map(|eds| EdsClusterConfig {
            eds_config: Some(ads_config_source()),
            service_name: eds.service_name.clone(),
        });

        let transport_socket = self
            .transport_socket
            .as_ref()
            .map(|socket| -> Result<TransportSocket> {
                Ok(TransportSocket {
                    name: socket.name.clone(),
                    config_type: socket
                        .typed_config
                        .as_ref()
                        .map(|config| config.to_any().map(transport_socket::ConfigType::TypedConfig))
                        .transpose()?,
                })
            })
            .transpose()?;

        let typed_extension_protocol_options = self
            .typed_extension_protocol_options
            .iter()
            .map(|(name, config)| Ok((name.clone(), config.to_any()?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Cluster {
            name: self.name.clone(),
            cluster_discovery_type: Some(ClusterDiscoveryType::Type(discovery_type)),
            connect_timeout: self.connect_timeout.map(ProtoDuration::to_proto),
            lb_policy,
            dns_lookup_family,
            load_assignment,
            eds_cluster_config,
            transport_socket,
            typed_extension_protocol_options: typed_extension_protocol_options
                .into_iter()
                .collect(),
            ..Default::default()
        })
    }
}

fn lb_endpoint_proto(spec: &LbEndpointSpec) -> LbEndpoint {
    let socket = &spec.endpoint.address.socket_address;
    LbEndpoint {
        host_identifier: Some(lb_endpoint::HostIdentifier::Endpoint(Endpoint {
            address: Some(Address {
                address: Some(address::Address::SocketAddress(SocketAddress {
                    address: socket.address.clone(),
                    port_specifier: Some(socket_address::PortSpecifier::PortValue(
                        socket.port_value,
                    )),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        })),
        ..Default::default()
    }
}

pub(crate) fn ads_config_source() -> ConfigSource {
    ConfigSource {
        config_source_specifier: Some(ConfigSourceSpecifier::Ads(AggregatedConfigSource::default())),
        resource_api_version: ApiVersion::V3 as i32,
        ..Default::default()
    }
}

fn unknown_enum(cluster: &str, field: &str, value: &str) -> EdgeplaneError {
    EdgeplaneError::validation_field(
        format!("cluster '{}' has unknown {} '{}'", cluster, field, value),
        field,
    )
}

fn map_discovery_type(cluster: &str, value: Option<&str>) -> Result<i32> {
    let discovery_type = match value.map(|s| s.trim().to_uppercase()).as_deref() {
        None | Some("") | Some("STATIC") => DiscoveryType::Static,
        Some("STRICT_DNS") => DiscoveryType::StrictDns,
        Some("LOGICAL_DNS") => DiscoveryType::LogicalDns,
        Some("EDS") => DiscoveryType::Eds,
        Some("ORIGINAL_DST") => DiscoveryType::OriginalDst,
        Some(other) => return Err(unknown_enum(cluster, "type", other)),
    };
    Ok(discovery_type as i32)
}

fn map_lb_policy(cluster: &str, value: Option<&str>) -> Result<i32> {
    let policy = match value.map(|s| s.trim().to_uppercase()).as_deref() {
        None | Some("") | Some("ROUND_ROBIN") => LbPolicy::RoundRobin,
        Some("LEAST_REQUEST") => LbPolicy::LeastRequest,
        Some("RING_HASH") => LbPolicy::RingHash,
        Some("MAGLEV") => LbPolicy::Maglev,
        Some("RANDOM") => LbPolicy::Random,
        Some("CLUSTER_PROVIDED") => LbPolicy::ClusterProvided,
        Some(other) => return Err(unknown_enum(cluster, "lb_policy", other)),
    };
    Ok(policy as i32)
}

fn map_dns_lookup_family(cluster: &str, value: Option<&str>) -> Result<i32> {
    let family = match value.map(|s| s.trim().to_uppercase()).as_deref() {
        None | Some("") | Some("AUTO") => DnsLookupFamily::Auto,
        Some("V4_ONLY") => DnsLookupFamily::V4Only,
        Some("V6_ONLY") => DnsLookupFamily::V6Only,
        Some("V4_PREFERRED") => DnsLookupFamily::V4Preferred,
        Some("ALL") => DnsLookupFamily::All,
        Some(other) => return Err(unknown_enum(cluster, "dns_lookup_family", other)),
    };
    Ok(family as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_static_cluster() {
        let spec = ClusterSpec::from_value(&json!({
            "name": "backend",
            "type": "STRICT_DNS",
            "connect_timeout": "5s",
            "lb_policy": "LEAST_REQUEST",
            "load_assignment": {
                "endpoints": [{
                    "lb_endpoints": [{
                        "endpoint": { "address": { "socket_address": { "address": "api.internal", "port_value": 8080 } } }
                    }]
                }]
            }
        }))
        .unwrap();

        let cluster = spec.to_proto().unwrap();
        assert_eq!(cluster.name, "backend");
        assert_eq!(
            cluster.cluster_discovery_type,
            Some(ClusterDiscoveryType::Type(DiscoveryType::StrictDns as i32))
        );
        assert_eq!(cluster.lb_policy, LbPolicy::LeastRequest as i32);
        assert_eq!(cluster.connect_timeout.unwrap().seconds, 5);

        let assignment = cluster.load_assignment.unwrap();
        assert_eq!(assignment.cluster_name, "backend");
        assert_eq!(assignment.endpoints[0].lb_endpoints.len(), 1);
    }

    #[test]
    fn eds_cluster_uses_ads() {
        let cluster = ClusterSpec::from_value(&json!({
            "name": "backend",
            "type": "EDS",
            "eds_cluster_config": { "service_name": "backend" }
        }))
        .unwrap()
        .to_proto()
        .unwrap();

        let eds = cluster.eds_cluster_config.unwrap();
        assert!(matches!(
            eds.eds_config.unwrap().config_source_specifier,
            Some(ConfigSourceSpecifier::Ads(_))
        ));
    }

    fn rejected_field(payload: Value) -> Option<String> {
        let err = ClusterSpec::from_value(&payload).unwrap().to_proto().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
        match err {
            EdgeplaneError::Validation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_discovery_type_is_rejected() {
        let field = rejected_field(json!({ "name": "backend", "type": "STRICT_DSN" }));
        assert_eq!(field.as_deref(), Some("type"));
    }

    #[test]
    fn unknown_lb_policy_is_rejected() {
        let field = rejected_field(json!({ "name": "backend", "lb_policy": "LEAST_REQUESTS" }));
        assert_eq!(field.as_deref(), Some("lb_policy"));
    }

    #[test]
    fn unknown_dns_lookup_family_is_rejected() {
        let field = rejected_field(json!({ "name": "backend", "dns_lookup_family": "V5_ONLY" }));
        assert_eq!(field.as_deref(), Some("dns_lookup_family"));
    }

    #[test]
    fn enum_values_ignore_case() {
        let cluster = ClusterSpec::from_value(&json!({
            "name": "backend",
            "type": "logical_dns",
            "dns_lookup_family": "v4_only"
        }))
        .unwrap()
        .to_proto()
        .unwrap();
        assert_eq!(
            cluster.cluster_discovery_type,
            Some(ClusterDiscoveryType::Type(DiscoveryType::LogicalDns as i32))
        );
        assert_eq!(cluster.dns_lookup_family, DnsLookupFamily::V4Only as i32);
        assert_eq!(cluster.lb_policy, LbPolicy::RoundRobin as i32);
    }

    #[test]
    fn name_peek_ignores_other_fields() {
        let payload = json!({ "name": "backend", "circuit_breakers": { "thresholds": [] } });
        assert_eq!(ClusterName::from_value(&payload).as_deref(), Some("backend"));
        assert_eq!(ClusterName::from_value(&json!({ "type": "EDS" })), None);
        assert!(ClusterSpec::from_value(&payload).is_err());
    }
}
