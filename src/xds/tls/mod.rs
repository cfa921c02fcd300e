//! TLS certificate resolution for downstream filter chains.

pub mod index;

pub use index::CertificateIndex;

use crate::domain::{ResourceRef, TlsIntent};
use crate::errors::{EdgeplaneError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Credential identity to the served domains it must cover, in identity order.
pub type DomainGrouping = BTreeMap<ResourceRef, Vec<String>>;

/// Wildcard form of a domain: the leftmost label replaced by `*`.
pub fn wildcard_domain(domain: &str) -> String {
    match domain.split_once('.') {
        Some((_, rest)) => format!("*.{}", rest),
        None => "*".to_string(),
    }
}

/// Groups served domains by the credential that serves them.
#[derive(Debug, Clone, Copy)]
pub struct CertificateResolver<'a> {
    index: &'a CertificateIndex,
    namespace: &'a str,
}

impl<'a> CertificateResolver<'a> {
    pub fn new(index: &'a CertificateIndex, namespace: &'a str) -> Self {
        Self { index, namespace }
    }

    pub fn resolve(&self, tls: &TlsIntent, domains: &[String]) -> Result<DomainGrouping> {
        match tls {
            TlsIntent::SecretRef(reference) => {
                if reference.name.is_empty() {
                    return Err(EdgeplaneError::validation_field(
                        "TLS secret reference has no name",
                        "tls.secret_ref.name",
                    ));
                }
                let identity = reference.resolve(self.namespace);
                debug!(credential = %identity, domains = domains.len(), "Using explicit TLS credential");
                Ok(BTreeMap::from([(identity, domains.to_vec())]))
            }
            TlsIntent::AutoDiscovery => self.discover(domains),
        }
    }

    fn discover(&self, domains: &[String]) -> Result<DomainGrouping> {
        let mut grouping = DomainGrouping::new();
        for domain in domains {
            let credential = self
                .index
                .get(domain)
                .or_else(|| self.index.get(&wildcard_domain(domain)))
                .ok_or_else(|| EdgeplaneError::discovery_not_found(domain.clone()))?;

            debug!(domain = %domain, credential = %credential.identity(), "Discovered TLS credential");
            grouping.entry(credential.identity()).or_default().push(domain.clone());
        }
        Ok(grouping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CredentialObject, ObjectReference};
    use crate::errors::ErrorKind;

    fn domains(values: &[&str]) -> Vec<String> {
        values.iter().map(|d| d.to_string()).collect()
    }

    fn index() -> CertificateIndex {
        let mut index = CertificateIndex::new();
        index.insert("a.example.com", CredentialObject::keypair("certs", "cred-a", "C", "K"));
        index.insert("*.example.com", CredentialObject::keypair("certs", "cred-b", "C", "K"));
        index
    }

    #[test]
    fn wildcard_forms() {
        assert_eq!(wildcard_domain("a.example.com"), "*.example.com");
        assert_eq!(wildcard_domain("localhost"), "*");
    }

    #[test]
    fn explicit_reference_covers_every_domain() {
        let index = CertificateIndex::new();
        let resolver = CertificateResolver::new(&index, "edge");
        let grouping = resolver
            .resolve(
                &TlsIntent::SecretRef(ObjectReference::new("web-cert")),
                &domains(&["a.example.com", "b.example.com"]),
            )
            .unwrap();

        assert_eq!(grouping.len(), 1);
        assert_eq!(
            grouping[&ResourceRef::new("edge", "web-cert")],
            domains(&["a.example.com", "b.example.com"])
        );
    }

    #[test]
    fn explicit_reference_without_name_fails() {
        let index = CertificateIndex::new();
        let resolver = CertificateResolver::new(&index, "edge");
        let err = resolver
            .resolve(&TlsIntent::SecretRef(ObjectReference::new("")), &domains(&["a.example.com"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn discovery_falls_back_to_wildcard() {
        let index = index();
        let resolver = CertificateResolver::new(&index, "edge");
        let grouping = resolver
            .resolve(&TlsIntent::AutoDiscovery, &domains(&["a.example.com", "b.example.com"]))
            .unwrap();

        assert_eq!(grouping.len(), 2);
        assert_eq!(grouping[&ResourceRef::new("certs", "cred-a")], domains(&["a.example.com"]));
        assert_eq!(grouping[&ResourceRef::new("certs", "cred-b")], domains(&["b.example.com"]));
    }

    #[test]
    fn discovery_ignores_domain_case() {
        let index = index();
        let resolver = CertificateResolver::new(&index, "edge");
        let grouping = resolver
            .resolve(&TlsIntent::AutoDiscovery, &domains(&["A.Example.com", "Web.EXAMPLE.com"]))
            .unwrap();

        assert_eq!(grouping[&ResourceRef::new("certs", "cred-a")], domains(&["A.Example.com"]));
        assert_eq!(grouping[&ResourceRef::new("certs", "cred-b")], domains(&["Web.EXAMPLE.com"]));
    }

    #[test]
    fn discovery_groups_by_credential() {
        let index = index();
        let resolver = CertificateResolver::new(&index, "edge");
        let grouping = resolver
            .resolve(&TlsIntent::AutoDiscovery, &domains(&["b.example.com", "c.example.com"]))
            .unwrap();

        assert_eq!(grouping.len(), 1);
        assert_eq!(
            grouping[&ResourceRef::new("certs", "cred-b")],
            domains(&["b.example.com", "c.example.com"])
        );
    }

    #[test]
    fn discovery_miss_names_the_domain() {
        let index = index();
        let resolver = CertificateResolver::new(&index, "edge");
        let err = resolver
            .resolve(&TlsIntent::AutoDiscovery, &domains(&["a.example.com", "x.other.net"]))
            .unwrap_err();

        assert!(matches!(err, EdgeplaneError::DiscoveryNotFound { ref domain } if domain == "x.other.net"));
    }
}
