//! Used-resource manifest
//!
//! Records which credential and cluster objects an assembled service depends
//! on, so changes to those objects can trigger reassembly.

use super::id::{ResourceRef, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dependency manifest keyed by resource type.
///
/// Both the `secret` and `cluster` entries are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsedResourceManifest(BTreeMap<ResourceType, Vec<ResourceRef>>);

impl Default for UsedResourceManifest {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(ResourceType::Secret, Vec::new());
        entries.insert(ResourceType::Cluster, Vec::new());
        Self(entries)
    }
}

impl UsedResourceManifest {
    pub fn new(secrets: Vec<ResourceRef>, clusters: Vec<ResourceRef>) -> Self {
        let mut manifest = Self::default();
        manifest.0.insert(ResourceType::Secret, secrets);
        manifest.0.insert(ResourceType::Cluster, clusters);
        manifest
    }

    pub fn get(&self, resource_type: ResourceType) -> &[ResourceRef] {
        self.0.get(&resource_type).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn secrets(&self) -> &[ResourceRef] {
        self.get(ResourceType::Secret)
    }

    pub fn clusters(&self) -> &[ResourceRef] {
        self.get(ResourceType::Cluster)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceType, &Vec<ResourceRef>)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_serializes_both_keys() {
        let json = serde_json::to_value(UsedResourceManifest::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "secret": [], "cluster": [] }));
    }

    #[test]
    fn manifest_exposes_entries_by_type() {
        let manifest = UsedResourceManifest::new(
            vec![ResourceRef::new("edge", "cert")],
            vec![ResourceRef::new("default", "backend")],
        );
        assert_eq!(manifest.secrets(), &[ResourceRef::new("edge", "cert")]);
        assert_eq!(manifest.clusters()[0].name, "backend");
    }
}
