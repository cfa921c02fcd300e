//! Recovery of the secrets and clusters an assembled service references.
//!
//! Filters and routes are searched in their JSON form, so references buried in
//! arbitrary typed configs are found without per-filter extraction code.

use crate::domain::{ClusterIntent, ResourceRef, UsedResourceManifest};
use crate::errors::{Result, ResultExt};
use crate::store::{guarded, LinkedObjectStore};
use crate::validation::validate_cluster;
use crate::xds::model::{ClusterName, ClusterSpec};
use crate::xds::secret::SecretTranslator;
use crate::xds::tls::DomainGrouping;
use crate::xds::tree_search::TreeSearch;
use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::Secret;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Materialized dependencies of one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsedResources {
    pub manifest: UsedResourceManifest,
    pub secrets: Vec<Secret>,
    pub clusters: Vec<Cluster>,
}

pub struct UsedResourceCollector<'a> {
    pub(crate) grouping: &'a DomainGrouping,
    pub(crate) http_filters: &'a [Value],
    pub(crate) routes: &'a [Value],
    /// Namespace whose cluster objects are searched
    pub(crate) namespace: &'a str,
}

impl<'a> UsedResourceCollector<'a> {
    pub fn new(
        grouping: &'a DomainGrouping,
        http_filters: &'a [Value],
        routes: &'a [Value],
        namespace: &'a str,
    ) -> Self {
        Self { grouping, http_filters, routes, namespace }
    }

    /// Credentials in use: the TLS groups first, then SDS references found in
    /// HTTP filters. First occurrence wins.
    pub fn secret_refs(&self) -> Result<Vec<ResourceRef>> {
        let mut refs: Vec<ResourceRef> = self.grouping.keys().cloned().collect();

        let search = TreeSearch::sds_secret_names();
        for filter in self.http_filters {
            for name in search.find(filter) {
                refs.push(ResourceRef::parse_secret_name(&name)?);
            }
        }

        Ok(dedup(refs))
    }

    /// Distinct proxy cluster names referenced by routes, in first-seen order.
    pub fn cluster_names(&self) -> Vec<String> {
        let search = TreeSearch::cluster_names();
        dedup(self.routes.iter().flat_map(|route| search.find(route)).collect())
    }

    pub async fn collect(
        &self,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<UsedResources> {
        let secret_refs = self.secret_refs()?;
        let translator = SecretTranslator;
        let mut secrets = Vec::new();
        for id in &secret_refs {
            let credential = guarded(cancel, "get credential", store.get_credential(id))
                .await
                .with_context(|| format!("fetching credential {}", id))?;
            secrets.extend(translator.translate(&credential)?);
        }

        let (cluster_refs, clusters) = self.clusters(store, cancel).await?;

        debug!(
            secrets = secrets.len(),
            clusters = clusters.len(),
            "Collected used resources"
        );

        Ok(UsedResources {
            manifest: UsedResourceManifest::new(secret_refs, cluster_refs),
            secrets,
            clusters,
        })
    }

    async fn clusters(
        &self,
        store: &dyn LinkedObjectStore,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ResourceRef>, Vec<Cluster>)> {
        let names = self.cluster_names();
        if names.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let candidates = guarded(cancel, "list clusters", store.list_clusters(self.namespace))
            .await
            .with_context(|| format!("listing clusters in {}", self.namespace))?;

        let mut owners: HashMap<String, Vec<&ClusterIntent>> = HashMap::new();
        for candidate in &candidates {
            if let Some(proxy_name) = ClusterName::from_value(&candidate.cluster) {
                owners.entry(proxy_name).or_default().push(candidate);
            }
        }

        let mut refs = Vec::new();
        let mut clusters = Vec::new();
        for name in &names {
            let Some(matched) = owners.get(name) else {
                debug!(cluster = %name, "Referenced cluster has no owner in namespace");
                continue;
            };
            for owner in matched {
                let owner_ref = ResourceRef::with_default_namespace(&owner.namespace, &owner.name);
                let cluster = ClusterSpec::from_value(&owner.cluster)
                    .and_then(|spec| spec.to_proto())
                    .with_context(|| format!("cluster {}", owner_ref))?;
                validate_cluster(&cluster).with_context(|| format!("cluster {}", owner_ref))?;
                refs.push(owner_ref);
                clusters.push(cluster);
            }
        }

        Ok((refs, clusters))
    }
}

fn dedup<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CredentialObject;
    use crate::errors::ErrorKind;
    use crate::store::memory::StoredObject;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert(StoredObject::Credential(CredentialObject::keypair("certs", "web", "C", "K")));
        store.insert(StoredObject::Credential(CredentialObject::opaque(
            "edge",
            "oauth",
            [("client", b"id".to_vec()), ("token", b"t".to_vec())],
        )));
        store.insert(StoredObject::Cluster(ClusterIntent {
            namespace: "edge".to_string(),
            name: "backend-object".to_string(),
            cluster: json!({ "name": "backend", "connect_timeout": "1s" }),
        }));
        store
    }

    fn oauth_filter() -> Value {
        json!({
            "name": "envoy.filters.http.oauth2",
            "typed_config": {
                "@type": "type.googleapis.com/envoy.extensions.filters.http.oauth2.v3.OAuth2",
                "config": {
                    "credentials": {
                        "token_secret": { "name": "edge/oauth/token", "sds_config": { "ads": {} } },
                        "hmac_secret": { "name": "certs/web", "sds_config": { "ads": {} } }
                    }
                }
            }
        })
    }

    #[test]
    fn secret_refs_start_with_tls_groups() {
        let grouping: DomainGrouping =
            BTreeMap::from([(ResourceRef::new("certs", "web"), vec!["a.example.com".to_string()])]);
        let filters = vec![oauth_filter()];
        let collector = UsedResourceCollector {
            grouping: &grouping,
            http_filters: &filters,
            routes: &[],
            namespace: "edge",
        };

        assert_eq!(
            collector.secret_refs().unwrap(),
            vec![ResourceRef::new("certs", "web"), ResourceRef::new("edge", "oauth")]
        );
    }

    #[test]
    fn malformed_sds_name_is_rejected() {
        let grouping = DomainGrouping::new();
        let filters = vec![json!({ "sds_config": {}, "name": "no-namespace" })];
        let collector = UsedResourceCollector {
            grouping: &grouping,
            http_filters: &filters,
            routes: &[],
            namespace: "edge",
        };
        assert_eq!(collector.secret_refs().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn collects_secrets_and_matching_clusters() {
        let grouping = DomainGrouping::new();
        let filters = vec![oauth_filter()];
        let routes = vec![
            json!({ "match": { "prefix": "/" }, "route": { "cluster": "backend" } }),
            json!({ "match": { "prefix": "/x" }, "route": { "cluster": "elsewhere" } }),
        ];
        let collector = UsedResourceCollector {
            grouping: &grouping,
            http_filters: &filters,
            routes: &routes,
            namespace: "edge",
        };

        let used = collector.collect(&store(), &CancellationToken::new()).await.unwrap();

        // object keys are visited in sorted order: hmac_secret before token_secret
        assert_eq!(
            used.manifest.secrets(),
            &[ResourceRef::new("certs", "web"), ResourceRef::new("edge", "oauth")]
        );
        let names: Vec<_> = used.secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["certs/web", "edge/oauth/client", "edge/oauth/token"]);

        assert_eq!(used.manifest.clusters(), &[ResourceRef::new("edge", "backend-object")]);
        assert_eq!(used.clusters.len(), 1);
        assert_eq!(used.clusters[0].name, "backend");
    }

    #[tokio::test]
    async fn missing_credential_propagates_not_found() {
        let grouping: DomainGrouping =
            BTreeMap::from([(ResourceRef::new("certs", "gone"), vec!["a.example.com".to_string()])]);
        let collector = UsedResourceCollector {
            grouping: &grouping,
            http_filters: &[],
            routes: &[],
            namespace: "edge",
        };

        let err = collector.collect(&store(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
