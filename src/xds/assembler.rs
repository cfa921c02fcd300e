//! Virtual service assembly
//!
//! Turns one [`ServiceIntent`] plus the objects it links to into the proxy
//! records an Envoy listener needs: the route table, one filter chain per TLS
//! credential and the manifest of secrets and clusters those records use.
//!
//! Construction fetches every linked object up front, so a finished
//! [`ResourceAssembler`] never touches the store again except through
//! [`ResourceAssembler::used_resources`].

use crate::assembly_span;
use crate::config::AssemblerSettings;
use crate::domain::{ResourceRef, ServiceIntent, UsedResourceManifest};
use crate::errors::{EdgeplaneError, Result, ResultExt};
use crate::store::{guarded, LinkedObjectStore};
use crate::validation::{
    validate_access_log, validate_http_filter, validate_route, validate_route_configuration,
    validate_upgrade_config, validate_virtual_host,
};
use crate::xds::filter_chain::{FilterChainBuilder, HttpPipeline, TlsGroup};
use crate::xds::model::{AccessLogSpec, HttpFilterSpec, RouteSpec, UpgradeConfigSpec, VirtualHostSpec};
use crate::xds::rbac::{build_rbac_filter, collect_policies};
use crate::xds::tls::{CertificateIndex, CertificateResolver, DomainGrouping};
use crate::xds::used_resources::{UsedResourceCollector, UsedResources};
use envoy_types::pb::envoy::config::accesslog::v3::AccessLog;
use envoy_types::pb::envoy::config::listener::v3::FilterChain;
use envoy_types::pb::envoy::config::route::v3::{Route, RouteConfiguration, VirtualHost};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::UpgradeConfig, HttpFilter,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

/// Validated proxy configuration of one virtual service.
#[derive(Debug, Clone)]
pub struct ResourceAssembler {
    identity: ResourceRef,
    // namespace searched for cluster owners
    cluster_namespace: String,
    virtual_host: VirtualHost,
    route_values: Vec<Value>,
    http_filter_values: Vec<Value>,
    route_configuration: RouteConfiguration,
    pipeline: HttpPipeline,
    grouping: DomainGrouping,
}

impl ResourceAssembler {
    /// Assemble with default settings.
    pub async fn new(
        intent: &ServiceIntent,
        index: &CertificateIndex,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        Self::with_settings(intent, index, store, cancel, &AssemblerSettings::default()).await
    }

    pub async fn with_settings(
        intent: &ServiceIntent,
        index: &CertificateIndex,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
        settings: &AssemblerSettings,
    ) -> Result<Self> {
        let identity = intent.identity();
        let span = assembly_span!("assemble", identity, tls = intent.tls.is_some());
        Self::assemble(intent, index, store, cancel, settings).instrument(span).await
    }

    async fn assemble(
        intent: &ServiceIntent,
        index: &CertificateIndex,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
        settings: &AssemblerSettings,
    ) -> Result<Self> {
        let identity = intent.identity();

        let access_logs = Self::load_access_logs(intent, store, cancel, settings)
            .await
            .context("cannot build access log")?;

        let (virtual_host, route_values) = Self::load_virtual_host(intent, store, cancel)
            .await
            .context("cannot build virtual host")?;

        let (http_filters, http_filter_values) = Self::load_http_filters(intent, store, cancel, settings)
            .await
            .context("cannot build http filters")?;

        let route_configuration = Self::route_table(&identity, &virtual_host)
            .context("cannot build route configuration")?;

        let upgrade_configs =
            Self::decode_upgrade_configs(intent).context("cannot build upgrade configs")?;

        let grouping = match &intent.tls {
            Some(tls) => CertificateResolver::new(index, &intent.namespace)
                .resolve(tls, &virtual_host.domains)
                .context("cannot resolve TLS certificates")?,
            None => DomainGrouping::new(),
        };

        let cluster_namespace = if intent.namespace.is_empty() {
            settings.default_namespace.clone()
        } else {
            intent.namespace.clone()
        };

        debug!(
            routes = virtual_host.routes.len(),
            http_filters = http_filters.len(),
            access_logs = access_logs.len(),
            tls_groups = grouping.len(),
            "Assembled virtual service"
        );

        Ok(Self {
            identity,
            cluster_namespace,
            virtual_host,
            route_values,
            http_filter_values,
            route_configuration,
            pipeline: HttpPipeline {
                http_filters,
                access_logs,
                upgrade_configs,
                use_remote_address: intent.use_remote_address.unwrap_or(false),
            },
            grouping,
        })
    }

    async fn load_access_logs(
        intent: &ServiceIntent,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
        settings: &AssemblerSettings,
    ) -> Result<Vec<AccessLog>> {
        let spec = match (&intent.access_log, &intent.access_log_config) {
            (Some(_), Some(_)) => {
                return Err(EdgeplaneError::validation_field(
                    "access_log and access_log_config are mutually exclusive",
                    "access_log",
                ))
            }
            (None, None) => return Ok(Vec::new()),
            (Some(inline), None) => AccessLogSpec::from_value(inline)?,
            (None, Some(reference)) => {
                let id = reference.resolve(&intent.namespace);
                let config =
                    guarded(cancel, "get access log config", store.get_access_log_config(&id))
                        .await?;
                let mut spec = AccessLogSpec::from_value(&config.access_log)?;

                if let Some(flag) = config.annotations.get(&settings.auto_filename_annotation) {
                    if parse_bool(flag).ok_or_else(|| {
                        EdgeplaneError::validation_field(
                            format!("annotation value '{}' is not a boolean", flag),
                            settings.auto_filename_annotation.clone(),
                        )
                    })? {
                        spec.append_file_name(&intent.identity().resource_name())?;
                    }
                }
                spec
            }
        };

        let access_log = spec.to_proto()?;
        validate_access_log(&access_log)?;
        Ok(vec![access_log])
    }

    async fn load_virtual_host(
        intent: &ServiceIntent,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<(VirtualHost, Vec<Value>)> {
        let spec = VirtualHostSpec::from_value(&intent.virtual_host)?;

        let mut route_values = spec.routes.clone();
        for reference in &intent.additional_routes {
            let id = reference.resolve(&intent.namespace);
            let set = guarded(cancel, "get route set", store.get_route_set(&id))
                .await
                .with_context(|| format!("route set {}", id))?;
            route_values.extend(set.routes);
        }

        let routes = route_values
            .iter()
            .enumerate()
            .map(|(i, value)| decode_route(value).with_context(|| format!("route {}", i)))
            .collect::<Result<Vec<_>>>()?;

        let virtual_host = spec.to_proto(routes)?;
        validate_virtual_host(&virtual_host)?;

        Ok((virtual_host, route_values))
    }

    async fn load_http_filters(
        intent: &ServiceIntent,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
        settings: &AssemblerSettings,
    ) -> Result<(Vec<HttpFilter>, Vec<Value>)> {
        let mut filters = Vec::new();
        let mut values = Vec::new();

        if let Some(rbac) = &intent.rbac {
            let mut referenced = Vec::with_capacity(rbac.additional_policies.len());
            for reference in &rbac.additional_policies {
                let id = reference.resolve(&intent.namespace);
                referenced.push(
                    guarded(cancel, "get policy", store.get_policy(&id))
                        .await
                        .with_context(|| format!("policy {}", id))?,
                );
            }
            let policies = collect_policies(rbac, &referenced)?;
            let synthesized = build_rbac_filter(&settings.rbac_filter_name, rbac.action, &policies)?;
            validate_http_filter(&synthesized.filter)?;
            filters.push(synthesized.filter);
            values.push(synthesized.json);
        }

        values.extend(intent.http_filters.iter().cloned());
        for reference in &intent.additional_http_filters {
            let id = reference.resolve(&intent.namespace);
            let set = guarded(cancel, "get http filter set", store.get_http_filter_set(&id))
                .await
                .with_context(|| format!("http filter set {}", id))?;
            values.extend(set.filters);
        }

        let decoded_from = filters.len();
        for (i, value) in values.iter().enumerate().skip(decoded_from) {
            let filter = HttpFilterSpec::from_value(value)
                .and_then(|spec| spec.to_proto())
                .with_context(|| format!("http filter {}", i))?;
            validate_http_filter(&filter).with_context(|| format!("http filter {}", i))?;
            filters.push(filter);
        }

        Ok((filters, values))
    }

    fn route_table(identity: &ResourceRef, virtual_host: &VirtualHost) -> Result<RouteConfiguration> {
        let name = identity.resource_name();
        let route_configuration = RouteConfiguration {
            name: name.clone(),
            virtual_hosts: vec![VirtualHost {
                name,
                domains: vec!["*".to_string()],
                ..virtual_host.clone()
            }],
            ..Default::default()
        };
        validate_route_configuration(&route_configuration)?;
        Ok(route_configuration)
    }

    fn decode_upgrade_configs(intent: &ServiceIntent) -> Result<Vec<UpgradeConfig>> {
        intent
            .upgrade_configs
            .iter()
            .enumerate()
            .map(|(i, value)| {
                decode_upgrade_config(value).with_context(|| format!("upgrade config {}", i))
            })
            .collect()
    }

    pub fn identity(&self) -> &ResourceRef {
        &self.identity
    }

    pub fn domain_grouping(&self) -> &DomainGrouping {
        &self.grouping
    }

    /// The virtual host with its declared domains.
    pub fn virtual_host(&self) -> &VirtualHost {
        &self.virtual_host
    }

    pub fn http_filters(&self) -> &[HttpFilter] {
        &self.pipeline.http_filters
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    /// One plaintext chain without TLS, or one chain per credential group in
    /// credential identity order.
    pub fn build_filter_chains(&self) -> Result<Vec<FilterChain>> {
        let builder = FilterChainBuilder::new(&self.identity, &self.pipeline);

        if self.grouping.is_empty() {
            return Ok(vec![builder.plaintext().context("cannot build filter chain")?]);
        }

        self.grouping
            .iter()
            .map(|(credential, domains)| {
                builder
                    .tls(TlsGroup { credential, domains })
                    .with_context(|| format!("cannot build filter chain for {}", credential))
            })
            .collect()
    }

    pub fn route_configuration(&self) -> &RouteConfiguration {
        &self.route_configuration
    }

    fn collector(&self) -> UsedResourceCollector<'_> {
        UsedResourceCollector::new(
            &self.grouping,
            &self.http_filter_values,
            &self.route_values,
            &self.cluster_namespace,
        )
    }

    /// Identities of the credentials and clusters this service uses.
    pub async fn used_resources(
        &self,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<UsedResourceManifest> {
        Ok(self.get_used_resources(store, cancel).await?.manifest)
    }

    /// The manifest together with the translated secrets and clusters.
    pub async fn get_used_resources(
        &self,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<UsedResources> {
        let span = assembly_span!("used_resources", self.identity);
        self.collector()
            .collect(store, cancel)
            .instrument(span)
            .await
            .context("cannot collect used resources")
    }
}

fn decode_route(value: &Value) -> Result<Route> {
    let route = RouteSpec::from_value(value)?.to_proto()?;
    validate_route(&route)?;
    Ok(route)
}

fn decode_upgrade_config(value: &Value) -> Result<UpgradeConfig> {
    let config = UpgradeConfigSpec::from_value(value)?.to_proto()?;
    validate_upgrade_config(&config)?;
    Ok(config)
}

/// Boolean forms accepted in annotations.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
