// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trust anchors and the stores that provide them.
//!
//! The verifier only depends on [`TrustStore`]. Where anchors come from (a
//! vector built in code, a JSON trust list on disk, a network fetch wrapped by
//! the caller) is decided by whoever constructs the store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::TrustStoreError;

/// A signing key an issuing authority has published.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    certificate_type: String,
    country: String,
    kid: Vec<u8>,
    key_material: Vec<u8>,
    signature: Option<String>,
    thumbprint: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TrustAnchor {
    /// Build an anchor from its published representation.
    ///
    /// `kid` is base64. `raw_data` is either a PEM block or bare base64 of the
    /// DER certificate (or SubjectPublicKeyInfo).
    pub fn new(
        certificate_type: impl Into<String>,
        country: impl Into<String>,
        kid: &str,
        raw_data: &str,
        signature: Option<String>,
        thumbprint: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TrustStoreError> {
        let country = country.into();

        let kid_bytes = STANDARD
            .decode(kid.trim())
            .map_err(|e| TrustStoreError::InvalidKeyId {
                country: country.clone(),
                kid: kid.to_string(),
                reason: e.to_string(),
            })?;
        if kid_bytes.is_empty() {
            return Err(TrustStoreError::InvalidKeyId {
                country,
                kid: kid.to_string(),
                reason: "empty".to_string(),
            });
        }

        let key_material = decode_key_material(raw_data).map_err(|reason| TrustStoreError::InvalidKeyMaterial {
            country: country.clone(),
            kid: kid.to_string(),
            reason,
        })?;

        Ok(Self {
            certificate_type: certificate_type.into(),
            country,
            kid: kid_bytes,
            key_material,
            signature,
            thumbprint,
            timestamp,
        })
    }

    pub fn certificate_type(&self) -> &str {
        &self.certificate_type
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn kid(&self) -> &[u8] {
        &self.kid
    }

    /// The kid as it appears in trust lists.
    pub fn kid_base64(&self) -> String {
        STANDARD.encode(&self.kid)
    }

    /// DER certificate or SubjectPublicKeyInfo.
    pub fn key_material(&self) -> &[u8] {
        &self.key_material
    }

    /// Signature the trust-list publisher placed over this entry, if any.
    /// Carried for callers that authenticate the list itself; not checked here.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn thumbprint(&self) -> Option<&str> {
        self.thumbprint.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the anchor's certificate validity window covers `at`.
    ///
    /// Bare public keys carry no window and are always current.
    pub fn is_current_at(&self, at: DateTime<Utc>) -> bool {
        match x509_parser::parse_x509_certificate(&self.key_material) {
            Ok((_, cert)) => {
                let validity = cert.validity();
                let t = at.timestamp();
                validity.not_before.timestamp() <= t && t <= validity.not_after.timestamp()
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("certificate_type", &self.certificate_type)
            .field("country", &self.country)
            .field("kid", &self.kid_base64())
            .field("key_material_len", &self.key_material.len())
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

fn decode_key_material(raw_data: &str) -> Result<Vec<u8>, String> {
    let trimmed = raw_data.trim();
    if trimmed.starts_with("-----BEGIN") {
        let (_, pem) = x509_parser::pem::parse_x509_pem(trimmed.as_bytes()).map_err(|e| format!("bad PEM: {e}"))?;
        return Ok(pem.contents);
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let der = STANDARD.decode(compact).map_err(|e| format!("bad base64: {e}"))?;
    if der.is_empty() {
        return Err("empty".to_string());
    }
    Ok(der)
}

/// One entry of a published DSC trust list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAnchorRecord {
    pub certificate_type: String,
    pub country: String,
    pub kid: String,
    pub raw_data: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub thumbprint: Option<String>,
    /// RFC 3339 issuance instant.
    pub timestamp: String,
}

impl TryFrom<TrustAnchorRecord> for TrustAnchor {
    type Error = TrustStoreError;

    fn try_from(record: TrustAnchorRecord) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&record.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| TrustStoreError::InvalidTimestamp {
                country: record.country.clone(),
                kid: record.kid.clone(),
                reason: e.to_string(),
            })?;

        TrustAnchor::new(
            record.certificate_type,
            record.country,
            &record.kid,
            &record.raw_data,
            record.signature.filter(|s| !s.is_empty()),
            record.thumbprint.filter(|s| !s.is_empty()),
            timestamp,
        )
    }
}

#[derive(Debug, Deserialize)]
struct TrustList {
    certificates: Vec<TrustAnchorRecord>,
}

/// Parse a `{"certificates": [...]}` trust list. Any bad entry fails the whole list.
pub fn parse_trust_list(json: &str) -> Result<Vec<TrustAnchor>, TrustStoreError> {
    let list: TrustList = serde_json::from_str(json)?;
    list.certificates.into_iter().map(TrustAnchor::try_from).collect()
}

/// Source of trust anchors.
///
/// Each call returns a complete snapshot. Implementations must tolerate
/// concurrent calls.
pub trait TrustStore: Send + Sync {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError>;
}

impl<T: TrustStore + ?Sized> TrustStore for &T {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError> {
        (**self).fetch_trust_anchors()
    }
}

impl<T: TrustStore + ?Sized> TrustStore for Arc<T> {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError> {
        (**self).fetch_trust_anchors()
    }
}

impl<T: TrustStore + ?Sized> TrustStore for Box<T> {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError> {
        (**self).fetch_trust_anchors()
    }
}

/// Anchors held in memory.
#[derive(Debug, Clone, Default)]
pub struct ArrayTrustStore {
    anchors: Vec<TrustAnchor>,
}

impl ArrayTrustStore {
    pub fn new(anchors: Vec<TrustAnchor>) -> Self {
        Self { anchors }
    }

    pub fn from_records(records: impl IntoIterator<Item = TrustAnchorRecord>) -> Result<Self, TrustStoreError> {
        let anchors = records
            .into_iter()
            .map(TrustAnchor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(anchors))
    }

    pub fn from_json(json: &str) -> Result<Self, TrustStoreError> {
        Ok(Self::new(parse_trust_list(json)?))
    }

    pub fn anchors(&self) -> &[TrustAnchor] {
        &self.anchors
    }
}

impl TrustStore for ArrayTrustStore {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError> {
        Ok(self.anchors.clone())
    }
}

/// Trust list read from a JSON file on every fetch, so replacing the file
/// takes effect on the next verification.
#[derive(Debug, Clone)]
pub struct JsonTrustStore {
    path: PathBuf,
}

impl JsonTrustStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrustStore for JsonTrustStore {
    fn fetch_trust_anchors(&self) -> Result<Vec<TrustAnchor>, TrustStoreError> {
        let json = std::fs::read_to_string(&self.path)?;
        let anchors = parse_trust_list(&json)?;
        tracing::debug!(path = %self.path.display(), anchors = anchors.len(), "loaded trust list");
        Ok(anchors)
    }
}
