// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Token verification pipeline.
//!
//! token -> transport decode -> COSE_Sign1 parse -> kid/alg resolution ->
//! trust anchor lookup -> signature check -> certificate model.
//!
//! The payload only leaves this module wrapped in a [`VerifiedPayload`], which
//! nothing outside the crate can construct. The certificate builder accepts
//! nothing else.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hcert_common::{encode_signature1_sig_structure, parse_cose_sign1, ParsedCoseSign1};
use hcert_validation::{cose_alg, verify_sig_structure, CoseAlgorithm};

use crate::certificate::HealthCertificate;
use crate::error::{InvalidSignatureError, VerifyError};
use crate::settings::VerificationSettings;
use crate::transport::decode_token;
use crate::trust::{TrustAnchor, TrustStore};

/// The trust anchor whose key validated a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSigner {
    pub certificate_type: String,
    pub country: String,
    pub kid: Vec<u8>,
    pub algorithm: CoseAlgorithm,
}

/// Payload bytes whose signature has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedPayload {
    bytes: Vec<u8>,
    signer: TrustedSigner,
}

impl VerifiedPayload {
    pub(crate) fn new(bytes: Vec<u8>, signer: TrustedSigner) -> Self {
        Self { bytes, signer }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn signer(&self) -> &TrustedSigner {
        &self.signer
    }
}

pub struct CertificateVerifier<S> {
    store: S,
    settings: VerificationSettings,
}

impl<S: TrustStore> CertificateVerifier<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, VerificationSettings::default())
    }

    pub fn with_settings(store: S, settings: VerificationSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &VerificationSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode, verify and parse a token.
    pub fn verify_and_decode(&self, token: &str) -> Result<HealthCertificate, VerifyError> {
        let envelope = decode_token(token, &self.settings.prefix, self.settings.max_envelope_len)?;
        tracing::debug!(envelope_len = envelope.len(), "decoded token transport");
        self.verify_and_decode_envelope(&envelope)
    }

    /// Same as [`Self::verify_and_decode`] for COSE_Sign1 bytes that were
    /// already transport-decoded.
    pub fn verify_and_decode_envelope(&self, envelope: &[u8]) -> Result<HealthCertificate, VerifyError> {
        let parsed = parse_cose_sign1(envelope)?;
        let verified = self.verify_envelope(&parsed)?;
        Ok(HealthCertificate::from_verified(&verified)?)
    }

    /// Check the envelope signature against the trust store.
    pub fn verify_envelope(&self, parsed: &ParsedCoseSign1) -> Result<VerifiedPayload, VerifyError> {
        let kid = parsed.key_id().ok_or(InvalidSignatureError::MissingKeyId)?;
        let kid_b64 = STANDARD.encode(kid);

        let alg = cose_alg(parsed).map_err(InvalidSignatureError::from_alg_error)?;
        let sig_structure = encode_signature1_sig_structure(parsed).map_err(InvalidSignatureError::SigStructure)?;

        let anchors = self.store.fetch_trust_anchors()?;
        let candidates = self.candidates(&anchors, kid);
        tracing::debug!(kid = %kid_b64, ?alg, candidates = candidates.len(), "resolved trust anchors");

        if candidates.is_empty() {
            tracing::warn!(kid = %kid_b64, "no trust anchor for key id");
            return Err(InvalidSignatureError::UnknownKeyId { kid: kid_b64 }.into());
        }

        for anchor in &candidates {
            match verify_sig_structure(alg, anchor.key_material(), &sig_structure, &parsed.signature) {
                Ok(()) => {
                    tracing::info!(
                        kid = %kid_b64,
                        country = anchor.country(),
                        certificate_type = anchor.certificate_type(),
                        "signature verified"
                    );
                    let signer = TrustedSigner {
                        certificate_type: anchor.certificate_type().to_string(),
                        country: anchor.country().to_string(),
                        kid: kid.to_vec(),
                        algorithm: alg,
                    };
                    return Ok(VerifiedPayload::new(parsed.payload.clone(), signer));
                }
                Err(e) => {
                    tracing::warn!(
                        kid = %kid_b64,
                        country = anchor.country(),
                        code = e.code(),
                        error = %e,
                        "trust anchor rejected signature"
                    );
                }
            }
        }

        Err(InvalidSignatureError::NoValidSignature {
            kid: kid_b64,
            attempts: candidates.len(),
        }
        .into())
    }

    /// Anchors matching `kid` that the settings admit, in store order.
    fn candidates<'a>(&self, anchors: &'a [TrustAnchor], kid: &[u8]) -> Vec<&'a TrustAnchor> {
        let at = self.settings.check_anchor_validity.then(|| self.settings.verification_time());
        anchors
            .iter()
            .filter(|a| a.kid() == kid)
            .filter(|a| self.settings.admits(a.certificate_type(), a.country()))
            .filter(|a| match at {
                Some(at) if !a.is_current_at(at) => {
                    tracing::debug!(country = a.country(), "skipping trust anchor outside its validity window");
                    false
                }
                _ => true,
            })
            .collect()
    }
}

/// Verify `token` against `store` with default settings.
pub fn verify_and_decode<S: TrustStore>(token: &str, store: S) -> Result<HealthCertificate, VerifyError> {
    CertificateVerifier::new(store).verify_and_decode(token)
}
