// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coverage rules over a verified [`HealthCertificate`].

use bitflags::bitflags;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::certificate::{HealthCertificate, Recovery, Target, TestResult, TestType, Vaccination};

bitflags! {
    /// Kinds of proof a caller accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProofTypes: u8 {
        const VACCINATION = 0b001;
        const RECOVERY = 0b010;
        const TEST = 0b100;
    }
}

/// Time windows applied by the coverage rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Time after the last dose of a completed primary series before it counts.
    pub vaccination_waiting_period: Duration,
    /// When set, vaccinations older than this no longer count.
    pub vaccination_max_age: Option<Duration>,
    pub pcr_test_max_age: Duration,
    pub rapid_test_max_age: Duration,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            vaccination_waiting_period: Duration::days(14),
            vaccination_max_age: None,
            pcr_test_max_age: Duration::hours(72),
            rapid_test_max_age: Duration::hours(48),
        }
    }
}

impl EvaluationOptions {
    pub fn with_vaccination_waiting_period(mut self, period: Duration) -> Self {
        self.vaccination_waiting_period = period;
        self
    }

    pub fn with_vaccination_max_age(mut self, max_age: Duration) -> Self {
        self.vaccination_max_age = Some(max_age);
        self
    }

    pub fn with_pcr_test_max_age(mut self, max_age: Duration) -> Self {
        self.pcr_test_max_age = max_age;
        self
    }

    pub fn with_rapid_test_max_age(mut self, max_age: Duration) -> Self {
        self.rapid_test_max_age = max_age;
        self
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl Vaccination {
    pub fn is_valid_at(&self, at: DateTime<Utc>, options: &EvaluationOptions) -> bool {
        if !self.is_series_complete() {
            return false;
        }
        let administered = start_of(self.date);
        if at < administered {
            return false;
        }
        if !self.is_booster() {
            match administered.checked_add_signed(options.vaccination_waiting_period) {
                Some(effective) if at >= effective => {}
                _ => return false,
            }
        }
        match options.vaccination_max_age {
            None => true,
            Some(max_age) => administered
                .checked_add_signed(max_age)
                .is_some_and(|expires| at <= expires),
        }
    }
}

impl TestResult {
    /// Negative, already collected, and younger than the limit for its test type.
    /// Unrecognized test types never count.
    pub fn is_valid_at(&self, at: DateTime<Utc>, options: &EvaluationOptions) -> bool {
        let max_age = match self.test_type {
            TestType::Naat => options.pcr_test_max_age,
            TestType::RapidAntigen => options.rapid_test_max_age,
            TestType::Other(_) => return false,
        };
        self.is_negative() && self.sample_collected <= at && at - self.sample_collected <= max_age
    }
}

impl Recovery {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.valid_from <= day && day <= self.valid_until
    }
}

impl HealthCertificate {
    /// Whether the holder is covered for `target` right now, by any of `proofs`,
    /// under [`EvaluationOptions::default`].
    pub fn is_covered(&self, target: &Target, proofs: ProofTypes) -> bool {
        self.is_covered_at(target, proofs, Utc::now(), &EvaluationOptions::default())
    }

    pub fn is_covered_at(
        &self,
        target: &Target,
        proofs: ProofTypes,
        at: DateTime<Utc>,
        options: &EvaluationOptions,
    ) -> bool {
        !self.valid_proofs_at(target, at, options).intersection(proofs).is_empty()
    }

    /// Every proof type that currently covers `target`.
    pub fn valid_proofs_at(&self, target: &Target, at: DateTime<Utc>, options: &EvaluationOptions) -> ProofTypes {
        let mut found = ProofTypes::empty();
        if self
            .vaccinations
            .iter()
            .any(|v| &v.target == target && v.is_valid_at(at, options))
        {
            found |= ProofTypes::VACCINATION;
        }
        if self
            .recoveries
            .iter()
            .any(|r| &r.target == target && r.is_valid_at(at))
        {
            found |= ProofTypes::RECOVERY;
        }
        if self
            .tests
            .iter()
            .any(|t| &t.target == target && t.is_valid_at(at, options))
        {
            found |= ProofTypes::TEST;
        }
        found
    }
}

/// Free-function form of [`HealthCertificate::is_covered`].
pub fn is_covered(certificate: &HealthCertificate, target: &Target, proofs: ProofTypes) -> bool {
    certificate.is_covered(target, proofs)
}
