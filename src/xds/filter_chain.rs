//! Listener filter chain construction
//!
//! Every chain carries one HTTP connection manager that fetches its route
//! table over RDS. TLS chains add a downstream TLS context whose certificate
//! is delivered over SDS, and restrict the chain to the group's server names.

use crate::domain::ResourceRef;
use crate::errors::Result;
use crate::validation::validate_filter_chain;
use crate::xds::model::cluster::ads_config_source;
use crate::xds::model::any_from_message;
use envoy_types::pb::envoy::config::accesslog::v3::AccessLog;
use envoy_types::pb::envoy::config::core::v3::{
    transport_socket::ConfigType as TransportSocketConfigType, TransportSocket,
};
use envoy_types::pb::envoy::config::listener::v3::{
    filter::ConfigType as FilterConfigType, Filter, FilterChain, FilterChainMatch,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{CodecType, RouteSpecifier, UpgradeConfig},
    HttpConnectionManager, HttpFilter, Rds,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    CommonTlsContext, DownstreamTlsContext, SdsSecretConfig,
};
use envoy_types::pb::google::protobuf::BoolValue;
use tracing::debug;

pub const HTTP_CONNECTION_MANAGER_FILTER_NAME: &str = "envoy.filters.network.http_connection_manager";
pub const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
pub const TLS_TRANSPORT_SOCKET_NAME: &str = "envoy.transport_sockets.tls";
pub const DOWNSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

/// The HTTP processing shared by every chain of one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpPipeline {
    pub http_filters: Vec<HttpFilter>,
    pub access_logs: Vec<AccessLog>,
    pub upgrade_configs: Vec<UpgradeConfig>,
    pub use_remote_address: bool,
}

/// One TLS group: the credential and the server names it covers.
#[derive(Debug, Clone, Copy)]
pub struct TlsGroup<'a> {
    pub credential: &'a ResourceRef,
    pub domains: &'a [String],
}

pub struct FilterChainBuilder<'a> {
    identity: &'a ResourceRef,
    pipeline: &'a HttpPipeline,
}

impl<'a> FilterChainBuilder<'a> {
    pub fn new(identity: &'a ResourceRef, pipeline: &'a HttpPipeline) -> Self {
        Self { identity, pipeline }
    }

    /// Chain without TLS and without a match restriction.
    pub fn plaintext(&self) -> Result<FilterChain> {
        self.build(self.identity.resource_name(), None, None)
    }

    /// Chain terminating TLS for one credential group.
    pub fn tls(&self, group: TlsGroup<'_>) -> Result<FilterChain> {
        let name = format!("{}/{}", self.identity, group.credential);
        let filter_chain_match =
            FilterChainMatch { server_names: group.domains.to_vec(), ..Default::default() };
        self.build(name, Some(filter_chain_match), Some(downstream_tls_socket(group.credential)))
    }

    fn build(
        &self,
        name: String,
        filter_chain_match: Option<FilterChainMatch>,
        transport_socket: Option<TransportSocket>,
    ) -> Result<FilterChain> {
        let chain = FilterChain {
            name,
            filter_chain_match,
            filters: vec![self.http_connection_manager()],
            transport_socket,
            ..Default::default()
        };

        validate_filter_chain(&chain)?;

        debug!(
            chain = %chain.name,
            tls = chain.transport_socket.is_some(),
            http_filters = self.pipeline.http_filters.len(),
            "Built filter chain"
        );

        Ok(chain)
    }

    fn http_connection_manager(&self) -> Filter {
        let hcm = HttpConnectionManager {
            route_specifier: Some(RouteSpecifier::Rds(Rds {
                route_config_name: self.identity.resource_name(),
                config_source: Some(ads_config_source()),
            })),
            codec_type: CodecType::Auto as i32,
            stat_prefix: stat_prefix(self.identity),
            http_filters: self.pipeline.http_filters.clone(),
            access_log: self.pipeline.access_logs.clone(),
            upgrade_configs: self.pipeline.upgrade_configs.clone(),
            use_remote_address: Some(BoolValue { value: self.pipeline.use_remote_address }),
            ..Default::default()
        };

        Filter {
            name: HTTP_CONNECTION_MANAGER_FILTER_NAME.to_string(),
            config_type: Some(FilterConfigType::TypedConfig(any_from_message(
                HTTP_CONNECTION_MANAGER_TYPE_URL,
                &hcm,
            ))),
        }
    }
}

/// Stats prefix for a service: its identity with dots replaced.
pub fn stat_prefix(identity: &ResourceRef) -> String {
    identity.resource_name().replace('.', "-")
}

fn downstream_tls_socket(credential: &ResourceRef) -> TransportSocket {
    let downstream = DownstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            tls_certificate_sds_secret_configs: vec![SdsSecretConfig {
                name: credential.resource_name(),
                sds_config: Some(ads_config_source()),
            }],
            ..Default::default()
        }),
        ..Default::default()
    };

    TransportSocket {
        name: TLS_TRANSPORT_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
            DOWNSTREAM_TLS_CONTEXT_TYPE_URL,
            &downstream,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::google::protobuf::Any;
    use prost::Message;

    fn decode_hcm(chain: &FilterChain) -> HttpConnectionManager {
        match &chain.filters[0].config_type {
            Some(FilterConfigType::TypedConfig(any)) => {
                HttpConnectionManager::decode(any.value.as_slice()).unwrap()
            }
            other => panic!("unexpected filter config {:?}", other),
        }
    }

    fn decode_tls(chain: &FilterChain) -> DownstreamTlsContext {
        let socket = chain.transport_socket.as_ref().unwrap();
        let Some(TransportSocketConfigType::TypedConfig(Any { type_url, value })) = &socket.config_type
        else {
            panic!("missing transport socket config");
        };
        assert_eq!(type_url, DOWNSTREAM_TLS_CONTEXT_TYPE_URL);
        DownstreamTlsContext::decode(value.as_slice()).unwrap()
    }

    #[test]
    fn plaintext_chain_uses_rds() {
        let identity = ResourceRef::new("edge", "shop.v1");
        let pipeline = HttpPipeline { use_remote_address: true, ..Default::default() };
        let chain = FilterChainBuilder::new(&identity, &pipeline).plaintext().unwrap();

        assert_eq!(chain.name, "edge/shop.v1");
        assert!(chain.transport_socket.is_none());
        assert!(chain.filter_chain_match.is_none());

        let hcm = decode_hcm(&chain);
        assert_eq!(hcm.stat_prefix, "edge/shop-v1");
        assert_eq!(hcm.use_remote_address, Some(BoolValue { value: true }));
        match hcm.route_specifier {
            Some(RouteSpecifier::Rds(rds)) => assert_eq!(rds.route_config_name, "edge/shop.v1"),
            other => panic!("expected RDS, got {:?}", other),
        }
    }

    #[test]
    fn tls_chain_names_credential_over_sds() {
        let identity = ResourceRef::new("edge", "web");
        let credential = ResourceRef::new("certs", "wildcard");
        let domains = vec!["a.example.com".to_string(), "b.example.com".to_string()];
        let pipeline = HttpPipeline::default();

        let chain = FilterChainBuilder::new(&identity, &pipeline)
            .tls(TlsGroup { credential: &credential, domains: &domains })
            .unwrap();

        assert_eq!(chain.name, "edge/web/certs/wildcard");
        assert_eq!(chain.filter_chain_match.as_ref().unwrap().server_names, domains);

        let tls = decode_tls(&chain);
        let sds = &tls.common_tls_context.unwrap().tls_certificate_sds_secret_configs;
        assert_eq!(sds.len(), 1);
        assert_eq!(sds[0].name, "certs/wildcard");
    }
}
