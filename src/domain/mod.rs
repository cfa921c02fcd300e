//! Domain layer
//!
//! Intent objects, credential objects, identities and the used-resource
//! manifest. These types carry no proxy wire format; conversion to Envoy
//! messages lives in [`crate::xds`].

pub mod credential;
pub mod id;
pub mod intent;
pub mod manifest;

pub use credential::{
    Base64Bytes, CredentialObject, CredentialType, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
};
pub use id::{ObjectReference, ResourceRef, ResourceType, DEFAULT_NAMESPACE};
pub use intent::{
    AccessLogConfigIntent, ClusterIntent, HttpFilterSetIntent, PolicyIntent, RbacAction,
    RbacIntent, RouteSetIntent, ServiceIntent, TlsIntent,
};
pub use manifest::UsedResourceManifest;
