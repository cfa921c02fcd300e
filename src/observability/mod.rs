//! # Observability Infrastructure
//!
//! Structured logging for the assembler and the CLI.

pub mod logging;

pub use logging::init_logging;
