//! Domain to credential index built from the SANs of stored TLS certificates.

use crate::domain::{CredentialObject, CredentialType, TLS_CERT_KEY};
use crate::errors::{EdgeplaneError, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

/// Domain (exact or `*.`-prefixed) to the credential serving it.
///
/// Domains are case-insensitive; keys are stored and looked up lowercased.
/// Read-only for the lifetime of one assembly.
#[derive(Debug, Clone, Default)]
pub struct CertificateIndex {
    entries: BTreeMap<String, CredentialObject>,
}

impl CertificateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential for a domain, replacing any previous entry.
    pub fn insert(&mut self, domain: impl Into<String>, credential: CredentialObject) {
        self.entries.insert(domain.into().to_ascii_lowercase(), credential);
    }

    pub fn get(&self, domain: &str) -> Option<&CredentialObject> {
        self.entries.get(&domain.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CredentialObject)> {
        self.entries.iter()
    }

    /// Index every keypair credential carrying `label_key: label_value` under
    /// the DNS names of its leaf certificate.
    ///
    /// Credentials are visited in identity order and the first claim on a
    /// domain wins.
    pub fn from_credentials<'a, I>(credentials: I, label_key: &str, label_value: &str) -> Self
    where
        I: IntoIterator<Item = &'a CredentialObject>,
    {
        let mut candidates: Vec<&CredentialObject> = credentials
            .into_iter()
            .filter(|c| c.credential_type == CredentialType::Keypair)
            .filter(|c| c.labels.get(label_key).map(String::as_str) == Some(label_value))
            .collect();
        candidates.sort_by_key(|c| c.identity());

        let mut index = Self::new();
        for credential in candidates {
            let identity = credential.identity();
            let Some(pem) = credential.blob(TLS_CERT_KEY) else {
                warn!(credential = %identity, "Indexed credential has no certificate data, skipping");
                continue;
            };

            let names = match dns_names(pem) {
                Ok(names) => names,
                Err(e) => {
                    warn!(credential = %identity, error = %e, "Failed to parse certificate, skipping");
                    continue;
                }
            };

            for name in names {
                if let Some(existing) = index.get(&name) {
                    warn!(
                        domain = %name,
                        kept = %existing.identity(),
                        ignored = %identity,
                        "Domain claimed by more than one credential"
                    );
                    continue;
                }
                index.insert(name, credential.clone());
            }
        }

        debug!(domains = index.len(), "Built certificate index");
        index
    }
}

/// DNS subject alternative names of the first certificate in a PEM chain.
pub fn dns_names(pem: &[u8]) -> Result<Vec<String>> {
    let (_, pem) = parse_x509_pem(pem)
        .map_err(|e| EdgeplaneError::validation(format!("invalid PEM certificate: {}", e)))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| EdgeplaneError::validation(format!("invalid X.509 certificate: {}", e)))?;

    let san = cert
        .subject_alternative_name()
        .map_err(|e| EdgeplaneError::validation(format!("invalid SAN extension: {}", e)))?;

    Ok(san
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_ascii_lowercase()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default())
}
