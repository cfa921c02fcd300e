//! # Edgeplane
//!
//! Edgeplane assembles Envoy xDS resources from declarative `VirtualService`
//! intents. One intent, together with the route sets, filter sets, access log
//! configs, policies, credentials and clusters it links to, becomes:
//!
//! - a route configuration served over RDS,
//! - one listener filter chain per TLS credential (or a single plaintext chain),
//! - the secrets and clusters those records depend on, plus a manifest naming them.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use edgeplane::domain::ResourceRef;
//! use edgeplane::store::InMemoryStore;
//! use edgeplane::xds::{CertificateIndex, ResourceAssembler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> edgeplane::Result<()> {
//! let store = InMemoryStore::from_files(&["objects.yaml"])?;
//! let id = ResourceRef::new("edge", "web");
//! if let Some(intent) = store.service(&id) {
//!     let index = CertificateIndex::new();
//!     let cancel = CancellationToken::new();
//!     let assembler = ResourceAssembler::new(intent, &index, &store, &cancel).await?;
//!     let chains = assembler.build_filter_chains()?;
//!     let manifest = assembler.used_resources(&store, &cancel).await?;
//!     println!("{} chains, {:?}", chains.len(), manifest);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod store;
pub mod validation;
pub mod xds;

// Re-export commonly used types and traits
pub use config::AssemblerSettings;
pub use errors::{Error, Result};
pub use observability::init_logging;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
