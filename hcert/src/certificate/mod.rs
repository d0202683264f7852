// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed health certificate model.
//!
//! The payload is a CWT claims map. The certificate itself sits at claim
//! `-260` (hcert), key `1` (EU DCC v1), and uses text keys from the DCC
//! JSON schema (`nam`, `dob`, `v`, `t`, `r`, ...).

mod entries;
mod fields;
mod target;

use chrono::{DateTime, Utc};
use hcert_common::{decode_value, CborKey, CborValue};

use crate::error::MalformedPayloadError;
use crate::verifier::{TrustedSigner, VerifiedPayload};
use fields::Fields;

pub use entries::{Recovery, TestResult, TestType, Vaccination, TEST_RESULT_DETECTED, TEST_RESULT_NOT_DETECTED};
pub use target::Target;

/// CBOR tag some issuers wrap CWTs in.
pub const CWT_TAG: u64 = 61;

const CLAIM_ISSUER: i64 = 1;
const CLAIM_EXPIRATION: i64 = 4;
const CLAIM_ISSUED_AT: i64 = 6;
const CLAIM_HCERT: i64 = -260;
const HCERT_EU_DCC_V1: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// ICAO 9303 transliteration of the given name.
    pub given_name_std: Option<String>,
    /// ICAO 9303 transliteration of the family name.
    pub family_name_std: String,
    /// `YYYY-MM-DD`, `YYYY-MM`, `YYYY` or empty, as issued.
    pub date_of_birth: String,
}

impl Person {
    /// Given name, falling back to the transliterated form.
    pub fn first_name(&self) -> Option<&str> {
        self.given_name.as_deref().or(self.given_name_std.as_deref())
    }

    /// Family name, falling back to the transliterated form.
    pub fn last_name(&self) -> &str {
        self.family_name.as_deref().unwrap_or(&self.family_name_std)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCertificate {
    pub schema_version: String,
    pub subject: Person,
    pub vaccinations: Vec<Vaccination>,
    pub tests: Vec<TestResult>,
    pub recoveries: Vec<Recovery>,
    /// Issuing country from the CWT `iss` claim.
    pub issuer: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub signer: TrustedSigner,
}

impl HealthCertificate {
    /// Build the model from a payload whose signature has been verified.
    pub fn from_verified(payload: &VerifiedPayload) -> Result<Self, MalformedPayloadError> {
        let claims = decode_value(payload.bytes())
            .map_err(|e| MalformedPayloadError::new("cwt", format!("undecodable CBOR: {e}")))?;

        let claims = match claims {
            CborValue::Tagged(CWT_TAG, inner) => *inner,
            other => other,
        };
        let claims = match claims {
            CborValue::Map(map) => map,
            other => {
                return Err(MalformedPayloadError::new(
                    "cwt",
                    format!("expected map, found {}", other.type_name()),
                ))
            }
        };

        let issuer = match claims.get(&CborKey::Int(CLAIM_ISSUER)) {
            None => None,
            Some(CborValue::Text(s)) => Some(s.clone()),
            Some(other) => {
                return Err(MalformedPayloadError::new(
                    "cwt.iss",
                    format!("expected text, found {}", other.type_name()),
                ))
            }
        };
        let expires_at = claim_time(&claims, CLAIM_EXPIRATION, "cwt.exp")?;
        let issued_at = claim_time(&claims, CLAIM_ISSUED_AT, "cwt.iat")?;

        let hcert = claims
            .get(&CborKey::Int(CLAIM_HCERT))
            .ok_or_else(|| MalformedPayloadError::new("cwt.hcert", "missing required claim"))?;
        let dcc = hcert
            .as_map()
            .ok_or_else(|| {
                MalformedPayloadError::new("cwt.hcert", format!("expected map, found {}", hcert.type_name()))
            })?
            .get(&CborKey::Int(HCERT_EU_DCC_V1))
            .ok_or_else(|| MalformedPayloadError::new("cwt.hcert.1", "missing EU DCC v1 entry"))?;
        let dcc = Fields::of(dcc, "hcert")?;

        let nam = dcc.required_map("nam")?;
        let subject = Person {
            given_name: nam.optional_text("gn")?.map(str::to_string),
            family_name: nam.optional_text("fn")?.map(str::to_string),
            given_name_std: nam.optional_text("gnt")?.map(str::to_string),
            family_name_std: nam.required_text("fnt")?.to_string(),
            date_of_birth: dcc.required_text("dob")?.to_string(),
        };

        Ok(Self {
            schema_version: dcc.required_text("ver")?.to_string(),
            subject,
            vaccinations: parse_entries(&dcc, "v", Vaccination::from_fields)?,
            tests: parse_entries(&dcc, "t", TestResult::from_fields)?,
            recoveries: parse_entries(&dcc, "r", Recovery::from_fields)?,
            issuer,
            issued_at,
            expires_at,
            signer: payload.signer().clone(),
        })
    }

    pub fn subject(&self) -> &Person {
        &self.subject
    }

    pub fn is_empty(&self) -> bool {
        self.vaccinations.is_empty() && self.tests.is_empty() && self.recoveries.is_empty()
    }

    /// Whether the CWT `exp` claim lies before `at`. Certificates without one never expire.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp < at)
    }
}

fn parse_entries<T>(
    dcc: &Fields<'_>,
    key: &str,
    build: impl Fn(&Fields<'_>) -> Result<T, MalformedPayloadError>,
) -> Result<Vec<T>, MalformedPayloadError> {
    dcc.optional_array(key)?
        .iter()
        .enumerate()
        .map(|(i, item)| build(&Fields::of(item, format!("{}.{key}[{i}]", dcc.path()))?))
        .collect()
}

fn claim_time(
    claims: &std::collections::BTreeMap<CborKey, CborValue>,
    claim: i64,
    path: &str,
) -> Result<Option<DateTime<Utc>>, MalformedPayloadError> {
    let secs = match claims.get(&CborKey::Int(claim)) {
        None => return Ok(None),
        Some(CborValue::Int(secs)) => *secs,
        Some(CborValue::Float(secs)) if secs.is_finite() => secs.trunc() as i64,
        Some(other) => {
            return Err(MalformedPayloadError::new(
                path,
                format!("expected numeric date, found {}", other.type_name()),
            ))
        }
    };
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or_else(|| MalformedPayloadError::new(path, format!("timestamp {secs} is out of range")))
}
