// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 signature verification.
//!
//! Verification runs over the canonical Sig_structure built from the protected
//! header bytes and the embedded payload. Public key inputs may be:
//! - DER X.509 certificate (the SubjectPublicKeyInfo is extracted)
//! - DER SubjectPublicKeyInfo (SPKI)
//!
//! Notes:
//! - The algorithm is read from the protected header only.
//! - ECDSA signatures are the raw `r || s` concatenation COSE prescribes.

use std::borrow::Cow;

use hcert_common::{encode_signature1_sig_structure, ParsedCoseSign1};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::pss;
use rsa::RsaPublicKey;
use sha2::Sha256;
use signature::Verifier;

use crate::CoseAlgorithm;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing alg header")]
    MissingAlgorithm,

    #[error("unsupported alg: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("failed to encode Sig_structure: {0}")]
    SigStructure(String),

    #[error("{0}")]
    InvalidPublicKey(String),

    #[error("{0}")]
    BadSignature(String),
}

impl SignatureError {
    /// Machine-readable code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            SignatureError::MissingAlgorithm | SignatureError::UnsupportedAlgorithm(_) => "MISSING_OR_INVALID_ALG",
            SignatureError::SigStructure(_) => "SIGSTRUCT_ERROR",
            SignatureError::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
            SignatureError::BadSignature(_) => "BAD_SIGNATURE",
        }
    }
}

/// Resolve the COSE `alg` (label 1) from the protected header.
pub fn cose_alg(parsed: &ParsedCoseSign1) -> Result<CoseAlgorithm, SignatureError> {
    let id = parsed.algorithm().ok_or(SignatureError::MissingAlgorithm)?;
    CoseAlgorithm::from_id(id).ok_or(SignatureError::UnsupportedAlgorithm(id))
}

/// Verify a parsed COSE_Sign1 against one candidate public key.
///
/// Returns the algorithm that was used on success.
pub fn verify_parsed_cose_sign1(
    parsed: &ParsedCoseSign1,
    public_key_bytes: &[u8],
) -> Result<CoseAlgorithm, SignatureError> {
    let alg = cose_alg(parsed)?;
    let sig_structure = encode_signature1_sig_structure(parsed).map_err(SignatureError::SigStructure)?;
    verify_sig_structure(alg, public_key_bytes, &sig_structure, &parsed.signature)?;
    Ok(alg)
}

/// Verify a COSE signature for a given COSE algorithm id.
///
/// `sig_structure` is the exact byte array that must be verified per RFC 8152.
/// `cose_signature` is the signature byte string from the COSE_Sign1 structure.
pub fn verify_sig_structure(
    alg: CoseAlgorithm,
    public_key_bytes: &[u8],
    sig_structure: &[u8],
    cose_signature: &[u8],
) -> Result<(), SignatureError> {
    match alg {
        CoseAlgorithm::ES256 => verify_es256(public_key_bytes, sig_structure, cose_signature),
        CoseAlgorithm::ES384 => verify_es384(public_key_bytes, sig_structure, cose_signature),
        CoseAlgorithm::ES512 => verify_es512(public_key_bytes, sig_structure, cose_signature),
        CoseAlgorithm::RS256 => verify_rsa::<_, pkcs1v15::Signature, _>(
            "RS256",
            public_key_bytes,
            sig_structure,
            cose_signature,
            pkcs1v15::VerifyingKey::<Sha256>::new,
        ),
        CoseAlgorithm::PS256 => verify_rsa::<_, pss::Signature, _>(
            "PS256",
            public_key_bytes,
            sig_structure,
            cose_signature,
            pss::VerifyingKey::<Sha256>::new,
        ),
    }
}

/// DER SubjectPublicKeyInfo of a certificate, or the input itself when it
/// does not parse as one.
fn subject_public_key_info(der: &[u8]) -> Cow<'_, [u8]> {
    match x509_parser::parse_x509_certificate(der) {
        Ok((_, cert)) => Cow::Owned(cert.tbs_certificate.subject_pki.raw.to_vec()),
        Err(_) => Cow::Borrowed(der),
    }
}

fn bad_signature() -> SignatureError {
    SignatureError::BadSignature("signature verification failed".to_string())
}

/// ECDSA over one NIST curve, with the curve crate's own key and signature types.
macro_rules! ecdsa_verifier {
    ($name:ident, $curve:ident, $curve_name:literal, $alg_name:literal) => {
        fn $name(pub_bytes: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), SignatureError> {
            let invalid_key =
                |e: String| SignatureError::InvalidPublicKey(format!("bad {} public key: {e}", $curve_name));

            let pk = $curve::PublicKey::from_public_key_der(&subject_public_key_info(pub_bytes))
                .map_err(|e| invalid_key(e.to_string()))?;
            let vk = $curve::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_encoded_point(false).as_bytes())
                .map_err(|e| invalid_key(e.to_string()))?;
            let signature = $curve::ecdsa::Signature::from_slice(sig)
                .map_err(|e| SignatureError::BadSignature(format!("bad {} signature: {e}", $alg_name)))?;
            vk.verify(msg, &signature).map_err(|_| bad_signature())
        }
    };
}

ecdsa_verifier!(verify_es256, p256, "P-256", "ES256");
ecdsa_verifier!(verify_es384, p384, "P-384", "ES384");
ecdsa_verifier!(verify_es512, p521, "P-521", "ES512");

/// RSA with SHA-256 under the padding scheme `verifier` wraps the key in.
fn verify_rsa<V, S, F>(
    alg_name: &str,
    pub_bytes: &[u8],
    msg: &[u8],
    sig: &[u8],
    verifier: F,
) -> Result<(), SignatureError>
where
    F: FnOnce(RsaPublicKey) -> V,
    V: Verifier<S>,
    S: for<'a> TryFrom<&'a [u8], Error = signature::Error>,
{
    let key = RsaPublicKey::from_public_key_der(&subject_public_key_info(pub_bytes))
        .map_err(|e| SignatureError::InvalidPublicKey(format!("bad RSA public key: {e}")))?;
    let signature = S::try_from(sig)
        .map_err(|e| SignatureError::BadSignature(format!("bad {alg_name} signature bytes: {e}")))?;
    verifier(key).verify(msg, &signature).map_err(|_| bad_signature())
}
