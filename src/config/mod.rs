//! # Configuration Management
//!
//! Settings are read with the `config` crate (optional file plus `EDGEPLANE__*`
//! environment variables) and checked with `validator` before use.

pub mod settings;

pub use settings::{AssemblerSettings, IndexSettings, LoggingSettings};
