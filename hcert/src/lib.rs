// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Verification of EU Digital COVID Certificates.
//!
//! A token (`HC1:` + base45 + zlib) is decoded into a COSE_Sign1 envelope,
//! its signature is checked against a [`TrustStore`], and only then is the
//! payload turned into a [`HealthCertificate`] that coverage rules run on.
//!
//! ```no_run
//! use hcert::{verify_and_decode, JsonTrustStore, ProofTypes, Target};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonTrustStore::new("trust-list.json");
//! let cert = verify_and_decode("HC1:...", &store)?;
//! let covered = cert.is_covered(&Target::Covid19, ProofTypes::VACCINATION | ProofTypes::RECOVERY);
//! # let _ = covered;
//! # Ok(())
//! # }
//! ```

// lib.rs is a publisher; the modules hold the implementation.
mod certificate;
mod error;
mod rules;
mod settings;
mod transport;
mod trust;
mod verifier;

pub use certificate::{
    HealthCertificate, Person, Recovery, Target, TestResult, TestType, Vaccination, CWT_TAG, TEST_RESULT_DETECTED,
    TEST_RESULT_NOT_DETECTED,
};
pub use error::{
    InvalidSignatureError, MalformedEnvelopeError, MalformedPayloadError, TransportDecodeError, TrustStoreError,
    VerificationStage, VerifyError,
};
pub use rules::{is_covered, EvaluationOptions, ProofTypes};
pub use settings::{VerificationSettings, DSC_CERTIFICATE_TYPE};
pub use transport::{
    base45_decode, base45_encode, decode_token, decompress, encode_token, DEFAULT_MAX_ENVELOPE_LEN, HC1_PREFIX,
};
pub use trust::{parse_trust_list, ArrayTrustStore, JsonTrustStore, TrustAnchor, TrustAnchorRecord, TrustStore};
pub use verifier::{verify_and_decode, CertificateVerifier, TrustedSigner, VerifiedPayload};

pub use hcert_validation::CoseAlgorithm;
