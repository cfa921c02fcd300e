//! Secret resource builder for SDS (Secret Discovery Service)
//!
//! Converts stored credential objects to Envoy Secret protobuf resources for
//! delivery alongside the filter chains that reference them.

use crate::domain::{CredentialObject, CredentialType, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY};
use crate::validation::validate_secret;
use crate::{Error, Result};
use envoy_types::pb::envoy::config::core::v3::{data_source::Specifier, DataSource};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    secret, GenericSecret, Secret, TlsCertificate,
};
use tracing::debug;

/// Translates credential objects into SDS secret records.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretTranslator;

impl SecretTranslator {
    /// A keypair yields one TLS certificate named `ns/name`; an opaque
    /// credential yields one generic secret per data key, named `ns/name/key`,
    /// in key order.
    pub fn translate(&self, credential: &CredentialObject) -> Result<Vec<Secret>> {
        let secrets = match &credential.credential_type {
            CredentialType::Keypair => vec![build_tls_certificate(credential)?],
            CredentialType::Opaque => build_generic_secrets(credential),
            CredentialType::Other(tag) => {
                return Err(Error::unsupported_type("credential", tag.clone()));
            }
        };

        for secret in &secrets {
            validate_secret(secret)?;
        }

        debug!(
            credential = %credential.identity(),
            credential_type = credential.credential_type.as_str(),
            secret_count = secrets.len(),
            "Translated credential into secret records"
        );

        Ok(secrets)
    }
}

fn inline_bytes(bytes: &[u8]) -> Option<DataSource> {
    Some(DataSource { specifier: Some(Specifier::InlineBytes(bytes.to_vec())), ..Default::default() })
}

fn build_tls_certificate(credential: &CredentialObject) -> Result<Secret> {
    let identity = credential.identity();
    let certificate_chain = credential.blob(TLS_CERT_KEY).ok_or_else(|| {
        Error::validation_field(
            format!("credential '{}' has no certificate data", identity),
            TLS_CERT_KEY,
        )
    })?;
    let private_key = credential.blob(TLS_PRIVATE_KEY_KEY).ok_or_else(|| {
        Error::validation_field(
            format!("credential '{}' has no private key data", identity),
            TLS_PRIVATE_KEY_KEY,
        )
    })?;

    Ok(Secret {
        name: identity.resource_name(),
        r#type: Some(secret::Type::TlsCertificate(TlsCertificate {
            certificate_chain: inline_bytes(certificate_chain),
            private_key: inline_bytes(private_key),
            ..Default::default()
        })),
    })
}

fn build_generic_secrets(credential: &CredentialObject) -> Vec<Secret> {
    let identity = credential.identity();
    credential
        .data
        .iter()
        .map(|(key, value)| Secret {
            name: format!("{}/{}", identity, key),
            r#type: Some(secret::Type::GenericSecret(GenericSecret {
                secret: inline_bytes(value.as_bytes()),
                ..Default::default()
            })),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_build_tls_certificate() {
        let credential = CredentialObject::keypair("edge", "web-cert", "CERT", "KEY");
        let secrets = SecretTranslator.translate(&credential).unwrap();

        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].name, "edge/web-cert");
        match &secrets[0].r#type {
            Some(secret::Type::TlsCertificate(tls)) => {
                assert_eq!(
                    tls.certificate_chain.as_ref().unwrap().specifier,
                    Some(Specifier::InlineBytes(b"CERT".to_vec()))
                );
                assert_eq!(
                    tls.private_key.as_ref().unwrap().specifier,
                    Some(Specifier::InlineBytes(b"KEY".to_vec()))
                );
            }
            other => panic!("Expected TlsCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_keypair_missing_key_is_rejected() {
        let mut credential = CredentialObject::keypair("edge", "web-cert", "CERT", "");
        let err = SecretTranslator.translate(&credential).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        credential.data.remove(TLS_CERT_KEY);
        assert!(SecretTranslator.translate(&credential).is_err());
    }

    #[test]
    fn test_build_generic_secrets_in_key_order() {
        let credential = CredentialObject::opaque(
            "edge",
            "oauth",
            [("token", b"t".to_vec()), ("hmac", b"h".to_vec())],
        );
        let secrets = SecretTranslator.translate(&credential).unwrap();

        let names: Vec<_> = secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["edge/oauth/hmac", "edge/oauth/token"]);
        assert!(secrets.iter().all(|s| matches!(s.r#type, Some(secret::Type::GenericSecret(_)))));
    }

    #[test]
    fn test_unsupported_credential_type() {
        let mut credential = CredentialObject::opaque("edge", "docker", [("cfg", b"{}".to_vec())]);
        credential.credential_type = CredentialType::Other("kubernetes.io/dockerconfigjson".into());

        let err = SecretTranslator.translate(&credential).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }
}
