//! Credential objects
//!
//! Stored TLS keypairs and opaque multi-value secrets. Blob values are kept as
//! raw bytes and serialized as base64.

use super::id::ResourceRef;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data key holding the PEM certificate chain of a keypair credential.
pub const TLS_CERT_KEY: &str = "tls.crt";
/// Data key holding the PEM private key of a keypair credential.
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Binary blob serialized as base64.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Base64Bytes {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Base64Bytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&BASE64_ENGINE.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = BASE64_ENGINE
            .decode(encoded.trim().as_bytes())
            .map_err(|err| serde::de::Error::custom(err.to_string()))?;
        Ok(Base64Bytes(decoded))
    }
}

/// Credential type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialType {
    /// Certificate chain plus private key
    Keypair,
    /// Arbitrary named blobs
    Opaque,
    /// Any other tag; rejected by the secret translator
    Other(String),
}

impl CredentialType {
    pub const KEYPAIR_TAG: &'static str = "kubernetes.io/tls";
    pub const OPAQUE_TAG: &'static str = "Opaque";

    pub fn as_str(&self) -> &str {
        match self {
            CredentialType::Keypair => Self::KEYPAIR_TAG,
            CredentialType::Opaque => Self::OPAQUE_TAG,
            CredentialType::Other(tag) => tag,
        }
    }
}

impl From<String> for CredentialType {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::KEYPAIR_TAG => CredentialType::Keypair,
            Self::OPAQUE_TAG => CredentialType::Opaque,
            _ => CredentialType::Other(value),
        }
    }
}

impl From<CredentialType> for String {
    fn from(value: CredentialType) -> Self {
        value.as_str().to_string()
    }
}

/// A stored credential object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialObject {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(default)]
    pub data: BTreeMap<String, Base64Bytes>,
}

impl CredentialObject {
    /// Build a keypair credential from PEM text.
    pub fn keypair(
        namespace: impl Into<String>,
        name: impl Into<String>,
        cert_pem: &str,
        key_pem: &str,
    ) -> Self {
        let mut data = BTreeMap::new();
        data.insert(TLS_CERT_KEY.to_string(), Base64Bytes::from(cert_pem));
        data.insert(TLS_PRIVATE_KEY_KEY.to_string(), Base64Bytes::from(key_pem));
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            credential_type: CredentialType::Keypair,
            data,
        }
    }

    pub fn opaque<I, K, V>(namespace: impl Into<String>, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            credential_type: CredentialType::Opaque,
            data: entries.into_iter().map(|(k, v)| (k.into(), Base64Bytes(v.into()))).collect(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn identity(&self) -> ResourceRef {
        ResourceRef::new(self.namespace.clone(), self.name.clone())
    }

    /// Data blob by key, treating an empty blob as missing.
    pub fn blob(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).filter(|b| !b.is_empty()).map(Base64Bytes::as_bytes)
    }
}
