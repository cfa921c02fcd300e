//! # Structured Logging
//!
//! Subscriber setup and span macros for the assembly pipeline.

use crate::config::LoggingSettings;
use crate::errors::{EdgeplaneError, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Create a tracing span for one assembly of a virtual service.
///
/// ```rust,ignore
/// let span = assembly_span!("assemble", intent.identity());
/// let span = assembly_span!("used_resources", identity, tls = true);
/// ```
#[macro_export]
macro_rules! assembly_span {
    ($operation:expr, $identity:expr) => {
        tracing::info_span!(
            "assembly",
            operation = %$operation,
            identity = %$identity,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $identity:expr, $($field:tt)*) => {
        tracing::info_span!(
            "assembly",
            operation = %$operation,
            identity = %$identity,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Installing twice is a no-op so
/// tests and embedding binaries can call this freely.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::try_new(&settings.level).map_err(|e| {
            EdgeplaneError::config(format!("Invalid log level '{}': {}", settings.level, e))
        })?,
    };

    let installed = if settings.json {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
    Ok(())
}
