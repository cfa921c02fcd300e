use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::core::v3::{data_source::Specifier, DataSource};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{secret, Secret};

use super::helpers::encode_check;

pub fn validate_secret(secret: &Secret) -> Result<()> {
    encode_check(secret, "Invalid secret")?;

    if secret.name.is_empty() {
        return Err(EdgeplaneError::validation_field("Secret name cannot be empty", "name"));
    }

    match &secret.r#type {
        Some(secret::Type::TlsCertificate(certificate)) => {
            require_data(certificate.certificate_chain.as_ref(), "tls_certificate.certificate_chain")?;
            require_data(certificate.private_key.as_ref(), "tls_certificate.private_key")
        }
        Some(secret::Type::GenericSecret(generic)) => {
            require_data(generic.secret.as_ref(), "generic_secret.secret")
        }
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation_field("Secret type is required", "type")),
    }
}

fn require_data(source: Option<&DataSource>, field: &str) -> Result<()> {
    match source.and_then(|source| source.specifier.as_ref()) {
        Some(Specifier::InlineBytes(bytes)) if bytes.is_empty() => {
            Err(EdgeplaneError::validation_field("Inline secret data cannot be empty", field))
        }
        Some(_) => Ok(()),
        None => Err(EdgeplaneError::validation_field("Secret data source is required", field)),
    }
}
