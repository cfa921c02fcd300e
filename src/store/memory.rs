//! In-memory object store loadable from multi-document YAML.
//!
//! Each document names its object type with a `kind:` field:
//!
//! ```yaml
//! kind: VirtualService
//! namespace: edge
//! name: web
//! virtual_host: { name: web, domains: [web.example.com], routes: [] }
//! ---
//! kind: Credential
//! namespace: edge
//! name: web-cert
//! type: kubernetes.io/tls
//! data: { tls.crt: LS0t..., tls.key: LS0t... }
//! ```

use super::LinkedObjectStore;
use crate::domain::{
    AccessLogConfigIntent, ClusterIntent, CredentialObject, HttpFilterSetIntent, PolicyIntent,
    ResourceRef, RouteSetIntent, ServiceIntent, DEFAULT_NAMESPACE,
};
use crate::errors::{EdgeplaneError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// One YAML document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum StoredObject {
    VirtualService(ServiceIntent),
    RouteSet(RouteSetIntent),
    HttpFilterSet(HttpFilterSetIntent),
    AccessLogConfig(AccessLogConfigIntent),
    Cluster(ClusterIntent),
    Policy(PolicyIntent),
    Credential(CredentialObject),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    services: HashMap<ResourceRef, ServiceIntent>,
    route_sets: HashMap<ResourceRef, RouteSetIntent>,
    http_filter_sets: HashMap<ResourceRef, HttpFilterSetIntent>,
    access_log_configs: HashMap<ResourceRef, AccessLogConfigIntent>,
    policies: HashMap<ResourceRef, PolicyIntent>,
    credentials: BTreeMap<ResourceRef, CredentialObject>,
    // keyed by namespace, empty namespaces filed under the default one
    clusters: HashMap<String, BTreeMap<String, ClusterIntent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every document of a multi-document YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut store = Self::new();
        store.load_yaml_str(yaml)?;
        Ok(store)
    }

    /// Load objects from YAML files, later objects replacing earlier ones.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut store = Self::new();
        for path in paths {
            let path = path.as_ref();
            let contents = std::fs::read_to_string(path)
                .map_err(|e| EdgeplaneError::io(format!("reading {}", path.display()), e))?;
            store.load_yaml_str(&contents).map_err(|e| {
                e.with_context(format!("loading objects from {}", path.display()))
            })?;
        }
        Ok(store)
    }

    pub fn load_yaml_str(&mut self, yaml: &str) -> Result<usize> {
        let mut loaded = 0;
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let object: StoredObject = serde_yaml::from_value(value)?;
            self.insert(object);
            loaded += 1;
        }
        debug!(objects = loaded, "Loaded objects from YAML");
        Ok(loaded)
    }

    pub fn insert(&mut self, object: StoredObject) {
        match object {
            StoredObject::VirtualService(o) => {
                self.services.insert(o.identity(), o);
            }
            StoredObject::RouteSet(o) => {
                self.route_sets.insert(o.identity(), o);
            }
            StoredObject::HttpFilterSet(o) => {
                self.http_filter_sets.insert(o.identity(), o);
            }
            StoredObject::AccessLogConfig(o) => {
                self.access_log_configs.insert(o.identity(), o);
            }
            StoredObject::Policy(o) => {
                self.policies.insert(o.identity(), o);
            }
            StoredObject::Credential(o) => {
                self.credentials.insert(o.identity(), o);
            }
            StoredObject::Cluster(o) => {
                let namespace = if o.namespace.is_empty() {
                    DEFAULT_NAMESPACE.to_string()
                } else {
                    o.namespace.clone()
                };
                self.clusters.entry(namespace).or_default().insert(o.name.clone(), o);
            }
        }
    }

    /// Top-level intent lookup. Absence is not an error for the caller.
    pub fn service(&self, id: &ResourceRef) -> Option<&ServiceIntent> {
        self.services.get(id)
    }

    /// Every credential, in identity order.
    pub fn credentials(&self) -> impl Iterator<Item = &CredentialObject> {
        self.credentials.values()
    }
}

fn lookup<T: Clone>(map: &HashMap<ResourceRef, T>, kind: &str, id: &ResourceRef) -> Result<T> {
    map.get(id).cloned().ok_or_else(|| EdgeplaneError::not_found(kind, id.to_string()))
}

#[async_trait]
impl LinkedObjectStore for InMemoryStore {
    async fn get_route_set(&self, id: &ResourceRef) -> Result<RouteSetIntent> {
        lookup(&self.route_sets, "RouteSet", id)
    }

    async fn get_http_filter_set(&self, id: &ResourceRef) -> Result<HttpFilterSetIntent> {
        lookup(&self.http_filter_sets, "HttpFilterSet", id)
    }

    async fn get_access_log_config(&self, id: &ResourceRef) -> Result<AccessLogConfigIntent> {
        lookup(&self.access_log_configs, "AccessLogConfig", id)
    }

    async fn get_policy(&self, id: &ResourceRef) -> Result<PolicyIntent> {
        lookup(&self.policies, "Policy", id)
    }

    async fn get_credential(&self, id: &ResourceRef) -> Result<CredentialObject> {
        self.credentials
            .get(id)
            .cloned()
            .ok_or_else(|| EdgeplaneError::not_found("Credential", id.to_string()))
    }

    async fn list_clusters(&self, namespace: &str) -> Result<Vec<ClusterIntent>> {
        Ok(self
            .clusters
            .get(namespace)
            .map(|clusters| clusters.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    const OBJECTS: &str = r#"
kind: RouteSet
namespace: edge
name: extra
routes:
  - match: { prefix: /extra }
    route: { cluster: extra }
---
kind: Cluster
name: orphan
cluster: { name: orphan-proxy }
---
kind: Cluster
namespace: edge
name: b
cluster: { name: b-proxy }
---
kind: Cluster
namespace: edge
name: a
cluster: { name: a-proxy }
---
kind: Credential
namespace: edge
name: token
type: Opaque
data:
  value: czNjcjN0
"#;

    #[tokio::test]
    async fn loads_multi_document_yaml() {
        let store = InMemoryStore::from_yaml_str(OBJECTS).unwrap();

        let routes = store.get_route_set(&ResourceRef::new("edge", "extra")).await.unwrap();
        assert_eq!(routes.routes.len(), 1);

        let credential = store.get_credential(&ResourceRef::new("edge", "token")).await.unwrap();
        assert_eq!(credential.blob("value"), Some(&b"s3cr3t"[..]));
    }

    #[tokio::test]
    async fn clusters_are_listed_per_namespace_in_name_order() {
        let store = InMemoryStore::from_yaml_str(OBJECTS).unwrap();

        let names: Vec<_> =
            store.list_clusters("edge").await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let defaulted = store.list_clusters(DEFAULT_NAMESPACE).await.unwrap();
        assert_eq!(defaulted.len(), 1);
        assert_eq!(defaulted[0].namespace, "");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_policy(&ResourceRef::new("edge", "nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(InMemoryStore::from_yaml_str("kind: Gateway\nname: x\n").is_err());
    }
}
