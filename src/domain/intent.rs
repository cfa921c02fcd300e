//! Intent objects
//!
//! Declarative inputs of the assembly pipeline. Proxy configuration fragments
//! (virtual host, routes, filters, access logs, upgrade configs, clusters and
//! RBAC policies) are carried as raw JSON values and only decoded by the
//! assembler, so a malformed fragment surfaces as a decode error at assembly
//! time rather than when the object is loaded.

use super::id::{ObjectReference, ResourceRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

macro_rules! impl_identity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                pub fn identity(&self) -> ResourceRef {
                    ResourceRef::new(self.namespace.clone(), self.name.clone())
                }
            }
        )+
    };
}

/// TLS mode of a virtual service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsIntent {
    /// Serve every domain with one named credential
    SecretRef(ObjectReference),
    /// Look each domain up in the certificate index
    AutoDiscovery,
}

/// RBAC action applied when a policy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RbacAction {
    #[default]
    Allow,
    Deny,
    Log,
}

impl RbacAction {
    pub(crate) fn to_proto_value(self) -> i32 {
        match self {
            Self::Allow => 0,
            Self::Deny => 1,
            Self::Log => 2,
        }
    }
}

/// Authorization settings of a virtual service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RbacIntent {
    #[serde(default)]
    pub action: RbacAction,
    /// Inline policies keyed by policy name
    #[serde(default)]
    pub policies: BTreeMap<String, Value>,
    /// Policy objects merged after the inline ones
    #[serde(default)]
    pub additional_policies: Vec<ObjectReference>,
}

/// Declarative description of one HTTP edge service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceIntent {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsIntent>,
    pub virtual_host: Value,
    #[serde(default)]
    pub additional_routes: Vec<ObjectReference>,
    #[serde(default)]
    pub http_filters: Vec<Value>,
    #[serde(default)]
    pub additional_http_filters: Vec<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_log: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_log_config: Option<ObjectReference>,
    #[serde(default)]
    pub upgrade_configs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_remote_address: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<RbacIntent>,
}

impl ServiceIntent {
    /// Minimal intent with only a virtual host.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, virtual_host: Value) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            tls: None,
            virtual_host,
            additional_routes: Vec::new(),
            http_filters: Vec::new(),
            additional_http_filters: Vec::new(),
            access_log: None,
            access_log_config: None,
            upgrade_configs: Vec::new(),
            use_remote_address: None,
            rbac: None,
        }
    }
}

/// Named set of routes appended to a virtual host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSetIntent {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub routes: Vec<Value>,
}

/// Named set of HTTP filters appended to a filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpFilterSetIntent {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Value>,
}

/// Shared access log definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogConfigIntent {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub access_log: Value,
}

/// Upstream cluster definition. The embedded proxy cluster name is
/// independent of the object's own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterIntent {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    pub cluster: Value,
}

/// Named RBAC policy shared between services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyIntent {
    pub namespace: String,
    pub name: String,
    pub policy: Value,
}

impl_identity!(
    ServiceIntent,
    RouteSetIntent,
    HttpFilterSetIntent,
    AccessLogConfigIntent,
    ClusterIntent,
    PolicyIntent,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tls_intent_accepts_exactly_one_variant() {
        let explicit: TlsIntent =
            serde_json::from_value(json!({ "secret_ref": { "name": "cert" } })).unwrap();
        assert_eq!(explicit, TlsIntent::SecretRef(ObjectReference::new("cert")));

        let auto: TlsIntent = serde_json::from_value(json!("auto_discovery")).unwrap();
        assert_eq!(auto, TlsIntent::AutoDiscovery);

        let both = serde_json::from_value::<TlsIntent>(json!({
            "secret_ref": { "name": "cert" },
            "auto_discovery": null
        }));
        assert!(both.is_err());
    }

    #[test]
    fn service_intent_defaults_optional_sections() {
        let intent: ServiceIntent = serde_yaml::from_str(
            r#"
namespace: edge
name: web
virtual_host:
  domains: ["example.com"]
"#,
        )
        .unwrap();

        assert_eq!(intent.identity(), ResourceRef::new("edge", "web"));
        assert!(intent.tls.is_none());
        assert!(intent.http_filters.is_empty());
        assert!(intent.use_remote_address.is_none());
    }
}
