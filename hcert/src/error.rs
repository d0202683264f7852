// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error taxonomy for the verification pipeline.
//!
//! Each stage owns one error enum and [`VerifyError`] tags which stage failed,
//! so callers can tell "cannot read" from "cannot trust" from "cannot parse
//! trusted content" with a plain `match`.

use hcert_validation::SignatureError;
use thiserror::Error;

pub use hcert_common::MalformedEnvelopeError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportDecodeError {
    #[error("token does not start with {0:?}")]
    MissingPrefix(String),

    #[error("invalid base45: {0}")]
    InvalidBase45(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("decoded envelope exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("failed to read trust list: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse trust list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("anchor {country}/{kid}: invalid kid: {reason}")]
    InvalidKeyId { country: String, kid: String, reason: String },

    #[error("anchor {country}/{kid}: invalid key material: {reason}")]
    InvalidKeyMaterial { country: String, kid: String, reason: String },

    #[error("anchor {country}/{kid}: invalid timestamp: {reason}")]
    InvalidTimestamp { country: String, kid: String, reason: String },

    /// Failure reported by a caller-provided store.
    #[error("{0}")]
    Source(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSignatureError {
    #[error("no key id in COSE headers")]
    MissingKeyId,

    #[error("no trust anchor for key id {kid}")]
    UnknownKeyId { kid: String },

    #[error("missing alg header")]
    MissingAlgorithm,

    #[error("unsupported alg: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("failed to encode Sig_structure: {0}")]
    SigStructure(String),

    #[error("signature did not verify against any of {attempts} trust anchor(s) for key id {kid}")]
    NoValidSignature { kid: String, attempts: usize },
}

impl InvalidSignatureError {
    /// Map an algorithm-resolution failure. Per-key failures are not converted;
    /// they only count towards [`InvalidSignatureError::NoValidSignature`].
    pub(crate) fn from_alg_error(e: SignatureError) -> Self {
        match e {
            SignatureError::MissingAlgorithm => InvalidSignatureError::MissingAlgorithm,
            SignatureError::UnsupportedAlgorithm(id) => InvalidSignatureError::UnsupportedAlgorithm(id),
            other => InvalidSignatureError::SigStructure(other.to_string()),
        }
    }
}

/// The verified payload does not match the certificate schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct MalformedPayloadError {
    /// Location of the offending element, e.g. `hcert.v[0].dn`.
    pub path: String,
    pub reason: String,
}

impl MalformedPayloadError {
    pub(crate) fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline stage that produced a [`VerifyError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VerificationStage {
    Transport,
    Envelope,
    TrustStore,
    Signature,
    Payload,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("transport decoding failed: {0}")]
    Transport(#[from] TransportDecodeError),

    #[error("malformed COSE envelope: {0}")]
    Envelope(#[from] MalformedEnvelopeError),

    #[error("trust store unavailable: {0}")]
    TrustStore(#[from] TrustStoreError),

    #[error("invalid signature: {0}")]
    Signature(#[from] InvalidSignatureError),

    #[error("malformed certificate payload: {0}")]
    Payload(#[from] MalformedPayloadError),
}

impl VerifyError {
    pub fn stage(&self) -> VerificationStage {
        match self {
            VerifyError::Transport(_) => VerificationStage::Transport,
            VerifyError::Envelope(_) => VerificationStage::Envelope,
            VerifyError::TrustStore(_) => VerificationStage::TrustStore,
            VerifyError::Signature(_) => VerificationStage::Signature,
            VerifyError::Payload(_) => VerificationStage::Payload,
        }
    }
}
