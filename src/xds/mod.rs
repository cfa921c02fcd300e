//! Envoy xDS resource assembly
//!
//! Converts virtual service intents into the Envoy records served over the
//! discovery protocols:
//! - route configurations (RDS)
//! - listener filter chains with per-credential TLS contexts (LDS)
//! - secrets for the certificates and generic secrets in use (SDS)
//! - the clusters routes point at (CDS)

pub mod assembler;
pub mod filter_chain;
pub mod model;
pub mod rbac;
pub mod secret;
pub mod tls;
pub mod tree_search;
pub mod used_resources;

pub use assembler::ResourceAssembler;
pub use filter_chain::{FilterChainBuilder, HttpPipeline, TlsGroup};
pub use secret::SecretTranslator;
pub use tls::{CertificateIndex, CertificateResolver, DomainGrouping};
pub use tree_search::{Companion, TreeSearch};
pub use used_resources::{UsedResourceCollector, UsedResources};
