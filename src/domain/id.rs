//! Resource identity types
//!
//! Every stored object is addressed by a namespace/name pair. [`ResourceRef`]
//! is the resolved identity; [`ObjectReference`] is the form written on intent
//! objects, where the namespace may be left out and defaults to the referrer's.

use crate::errors::{EdgeplaneError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace used when an object or reference carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolved identity of a stored object.
///
/// Ordered by `(namespace, name)`, which fixes the iteration order of every
/// map keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    /// Identity with an empty namespace replaced by [`DEFAULT_NAMESPACE`].
    pub fn with_default_namespace(namespace: &str, name: impl Into<String>) -> Self {
        let namespace = if namespace.is_empty() { DEFAULT_NAMESPACE } else { namespace };
        Self::new(namespace, name)
    }

    /// Canonical `namespace/name` form used for proxy resource names.
    pub fn resource_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Parse a canonical `namespace/name` string.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split('/').collect::<Vec<_>>().as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*namespace, *name))
            }
            _ => Err(EdgeplaneError::validation(format!(
                "'{}' is not a namespace/name resource name",
                value
            ))),
        }
    }

    /// Parse an SDS secret name back to the credential that produced it.
    ///
    /// Keypair records are named `namespace/name`, opaque records
    /// `namespace/name/key`; both map to the credential `namespace/name`.
    pub fn parse_secret_name(value: &str) -> Result<Self> {
        match value.split('/').collect::<Vec<_>>().as_slice() {
            [namespace, name] | [namespace, name, _]
                if !namespace.is_empty() && !name.is_empty() =>
            {
                Ok(Self::new(*namespace, *name))
            }
            _ => Err(EdgeplaneError::validation_field(
                format!("cannot split secret name '{}' into namespace/name", value),
                "sds_config.name",
            )),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceRef {
    type Err = EdgeplaneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Reference to another object as written on an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { namespace: None, name: name.into() }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: Some(namespace.into()), name: name.into() }
    }

    /// Resolve against the namespace of the referring object.
    pub fn resolve(&self, referrer_namespace: &str) -> ResourceRef {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ResourceRef::new(ns, self.name.clone()),
            _ => ResourceRef::new(referrer_namespace, self.name.clone()),
        }
    }
}

/// Kinds of dependency recorded in the used-resource manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Secret,
    Cluster,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Secret => write!(f, "secret"),
            ResourceType::Cluster => write!(f, "cluster"),
        }
    }
}
