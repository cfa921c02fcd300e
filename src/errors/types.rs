//! # Error Types
//!
//! Error types for the edgeplane assembly pipeline using `thiserror`.

use std::fmt;

/// Custom result type for edgeplane operations
pub type Result<T> = std::result::Result<T, EdgeplaneError>;

/// Main error type for the assembly pipeline
#[derive(thiserror::Error, Debug)]
pub enum EdgeplaneError {
    /// A linked intent object or credential does not exist in the store
    #[error("Resource not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// A decoded payload or assembled record violates proxy schema rules
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Auto-discovery found no credential for a served domain or its wildcard form
    #[error("No certificate discovered for domain '{domain}'")]
    DiscoveryNotFound { domain: String },

    /// A credential object has a type the secret translator cannot handle
    #[error("Unsupported {resource_type} type '{type_name}'")]
    UnsupportedType { resource_type: String, type_name: String },

    /// A stored raw payload cannot be decoded into its expected shape
    #[error("Decode error: {context}")]
    Decode {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The assembly was cancelled while waiting on the store
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// The store backend failed for a reason other than a missing object
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// An error wrapped with the assembly step that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<EdgeplaneError>,
    },
}

/// Error category, stable across context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    DiscoveryNotFound,
    UnsupportedType,
    Decode,
    Cancelled,
    Store,
    Config,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation_failed",
            ErrorKind::DiscoveryNotFound => "discovery_not_found",
            ErrorKind::UnsupportedType => "unsupported_type",
            ErrorKind::Decode => "decode_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Store => "store",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl EdgeplaneError {
    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    pub fn discovery_not_found<S: Into<String>>(domain: S) -> Self {
        Self::DiscoveryNotFound { domain: domain.into() }
    }

    pub fn unsupported_type<R: Into<String>, T: Into<String>>(resource_type: R, type_name: T) -> Self {
        Self::UnsupportedType { resource_type: resource_type.into(), type_name: type_name.into() }
    }

    /// Create a decode error from any underlying parser error
    pub fn decode<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode { context: context.into(), source: Box::new(source) }
    }

    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled { operation: operation.into() }
    }

    /// Create a store backend error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store { message: message.into(), source: None }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Wrap this error with the step that produced it.
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context { context: context.into(), source: Box::new(self) }
    }

    /// Category of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EdgeplaneError::NotFound { .. } => ErrorKind::NotFound,
            EdgeplaneError::Validation { .. } => ErrorKind::Validation,
            EdgeplaneError::DiscoveryNotFound { .. } => ErrorKind::DiscoveryNotFound,
            EdgeplaneError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            EdgeplaneError::Decode { .. } => ErrorKind::Decode,
            EdgeplaneError::Cancelled { .. } => ErrorKind::Cancelled,
            EdgeplaneError::Store { .. } => ErrorKind::Store,
            EdgeplaneError::Config { .. } => ErrorKind::Config,
            EdgeplaneError::Io { .. } => ErrorKind::Io,
            EdgeplaneError::Internal { .. } => ErrorKind::Internal,
            EdgeplaneError::Context { source, .. } => source.kind(),
        }
    }

    /// Innermost error, with all context layers removed.
    pub fn root(&self) -> &EdgeplaneError {
        match self {
            EdgeplaneError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the reconciliation loop should retry after this error.
    ///
    /// A missing linked object usually means the store has not caught up yet.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Cancelled | ErrorKind::Store)
    }
}

/// Extension for wrapping results with assembly step context.
pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T>;

    fn with_context<S, F>(self, f: F) -> Result<T>
    where
        S: Into<String>,
        F: FnOnce() -> S;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<S, F>(self, f: F) -> Result<T>
    where
        S: Into<String>,
        F: FnOnce() -> S,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl From<std::io::Error> for EdgeplaneError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for EdgeplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode("JSON decoding failed", error)
    }
}

impl From<serde_yaml::Error> for EdgeplaneError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::decode("YAML decoding failed", error)
    }
}

impl From<config::ConfigError> for EdgeplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for EdgeplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = EdgeplaneError::validation_field("name cannot be empty", "name");
        assert_eq!(error.kind(), ErrorKind::Validation);
        if let EdgeplaneError::Validation { field, .. } = error {
            assert_eq!(field, Some("name".to_string()));
        }
    }

    #[test]
    fn test_context_preserves_kind() {
        let error = EdgeplaneError::discovery_not_found("api.example.com")
            .with_context("cannot resolve certificates")
            .with_context("cannot assemble ns/web");

        assert_eq!(error.kind(), ErrorKind::DiscoveryNotFound);
        assert!(matches!(error.root(), EdgeplaneError::DiscoveryNotFound { domain } if domain == "api.example.com"));
        assert_eq!(
            error.to_string(),
            "cannot assemble ns/web: cannot resolve certificates: No certificate discovered for domain 'api.example.com'"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(EdgeplaneError::cancelled("get_route_set").is_retryable());
        assert!(EdgeplaneError::not_found("route_set", "ns/a").is_retryable());
        assert!(EdgeplaneError::store("backend unavailable").is_retryable());
        assert!(EdgeplaneError::not_found("route_set", "ns/a").with_context("x").is_retryable());
        assert!(!EdgeplaneError::validation("test").is_retryable());
        assert!(!EdgeplaneError::unsupported_type("credential", "bootstrap").is_retryable());
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(EdgeplaneError::validation("bad"));
        let err = result.context("cannot decode route").unwrap_err();
        assert_eq!(err.to_string(), "cannot decode route: Validation error: bad");
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: EdgeplaneError = io_error.into();
        assert_eq!(error.kind(), ErrorKind::Io);

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: EdgeplaneError = json_error.into();
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::DiscoveryNotFound.to_string(), "discovery_not_found");
        assert_eq!(ErrorKind::Validation.to_string(), "validation_failed");
    }
}
