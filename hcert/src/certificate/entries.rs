// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use chrono::{DateTime, NaiveDate, Utc};

use super::fields::Fields;
use super::Target;
use crate::error::MalformedPayloadError;

/// SNOMED CT code for "not detected".
pub const TEST_RESULT_NOT_DETECTED: &str = "260415000";
/// SNOMED CT code for "detected".
pub const TEST_RESULT_DETECTED: &str = "260373001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vaccination {
    pub target: Target,
    /// Vaccine or prophylaxis (`vp`).
    pub vaccine: String,
    /// Medicinal product (`mp`).
    pub product: String,
    /// Marketing authorization holder or manufacturer (`ma`).
    pub manufacturer: String,
    pub dose_number: u32,
    pub total_doses: u32,
    pub date: NaiveDate,
    pub country: String,
    pub issuer: String,
    pub certificate_id: String,
}

impl Vaccination {
    pub(crate) fn from_fields(f: &Fields<'_>) -> Result<Self, MalformedPayloadError> {
        Ok(Self {
            target: Target::from_code(f.required_text("tg")?),
            vaccine: f.required_text("vp")?.to_string(),
            product: f.required_text("mp")?.to_string(),
            manufacturer: f.required_text("ma")?.to_string(),
            dose_number: f.required_u32("dn")?,
            total_doses: f.required_u32("sd")?,
            date: f.required_date("dt")?,
            country: f.required_text("co")?.to_string(),
            issuer: f.required_text("is")?.to_string(),
            certificate_id: f.required_text("ci")?.to_string(),
        })
    }

    /// The series is complete once the dose number reaches the total.
    pub fn is_series_complete(&self) -> bool {
        self.total_doses > 0 && self.dose_number >= self.total_doses
    }

    /// A dose beyond the primary series.
    pub fn is_booster(&self) -> bool {
        self.total_doses > 0 && self.dose_number > self.total_doses
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestType {
    /// Nucleic acid amplification (PCR), LOINC `LP6464-4`.
    Naat,
    /// Rapid antigen test, LOINC `LP217198-3`.
    RapidAntigen,
    Other(String),
}

impl TestType {
    pub const NAAT_CODE: &'static str = "LP6464-4";
    pub const RAPID_ANTIGEN_CODE: &'static str = "LP217198-3";

    pub fn from_code(code: &str) -> Self {
        match code {
            Self::NAAT_CODE => TestType::Naat,
            Self::RAPID_ANTIGEN_CODE => TestType::RapidAntigen,
            other => TestType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            TestType::Naat => Self::NAAT_CODE,
            TestType::RapidAntigen => Self::RAPID_ANTIGEN_CODE,
            TestType::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub target: Target,
    pub test_type: TestType,
    /// NAAT test name (`nm`).
    pub name: Option<String>,
    /// RAT device identifier (`ma`).
    pub device: Option<String>,
    pub sample_collected: DateTime<Utc>,
    /// SNOMED CT result code (`tr`).
    pub result: String,
    pub facility: Option<String>,
    pub country: String,
    pub issuer: String,
    pub certificate_id: String,
}

impl TestResult {
    pub(crate) fn from_fields(f: &Fields<'_>) -> Result<Self, MalformedPayloadError> {
        Ok(Self {
            target: Target::from_code(f.required_text("tg")?),
            test_type: TestType::from_code(f.required_text("tt")?),
            name: f.optional_text("nm")?.map(str::to_string),
            device: f.optional_text("ma")?.map(str::to_string),
            sample_collected: f.required_datetime("sc")?,
            result: f.required_text("tr")?.to_string(),
            facility: f.optional_text("tc")?.map(str::to_string),
            country: f.required_text("co")?.to_string(),
            issuer: f.required_text("is")?.to_string(),
            certificate_id: f.required_text("ci")?.to_string(),
        })
    }

    pub fn is_negative(&self) -> bool {
        self.result == TEST_RESULT_NOT_DETECTED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub target: Target,
    pub first_positive: NaiveDate,
    pub country: String,
    pub issuer: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub certificate_id: String,
}

impl Recovery {
    pub(crate) fn from_fields(f: &Fields<'_>) -> Result<Self, MalformedPayloadError> {
        let recovery = Self {
            target: Target::from_code(f.required_text("tg")?),
            first_positive: f.required_date("fr")?,
            country: f.required_text("co")?.to_string(),
            issuer: f.required_text("is")?.to_string(),
            valid_from: f.required_date("df")?,
            valid_until: f.required_date("du")?,
            certificate_id: f.required_text("ci")?.to_string(),
        };

        if recovery.valid_until < recovery.valid_from {
            return Err(MalformedPayloadError::new(
                format!("{}.du", f.path()),
                "validity ends before it starts",
            ));
        }
        Ok(recovery)
    }
}
