//! Proxy configuration model
//!
//! Intent objects store Envoy configuration fragments in protobuf JSON form.
//! The types here decode those fragments with serde and convert them into the
//! generated `envoy-types` messages. Decoding failures carry
//! [`ErrorKind::Decode`](crate::errors::ErrorKind::Decode); structural problems
//! found while converting carry `Validation`.

pub mod access_log;
pub mod cluster;
pub mod common;
pub mod filter;
pub mod rbac;
pub mod route;
pub mod typed_config;

pub use access_log::{AccessLogSpec, FileAccessLogSpec};
pub use cluster::{ClusterName, ClusterSpec};
pub use filter::{HttpFilterSpec, UpgradeConfigSpec};
pub use rbac::RbacPolicySpec;
pub use route::{RouteSpec, VirtualHostSpec};
pub use typed_config::{
    any_from_message, json_to_struct, TypedConfig, TypedStruct, FILE_ACCESS_LOG_TYPE_URL,
    ROUTER_TYPE_URL, TYPED_STRUCT_TYPE_URL,
};
