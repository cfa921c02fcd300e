//! # Error Handling
//!
//! Error types shared by every stage of the assembly pipeline. Each failure
//! carries a stable [`ErrorKind`] so the reconciliation layer can decide how to
//! react without parsing messages.

pub mod types;

pub use types::{EdgeplaneError, ErrorKind, Result, ResultExt};

/// Alias kept short for call sites inside the crate.
pub type Error = EdgeplaneError;
