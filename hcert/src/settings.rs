// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use chrono::{DateTime, Utc};

use crate::transport::{DEFAULT_MAX_ENVELOPE_LEN, HC1_PREFIX};

/// Certificate type of document signer certificates in published trust lists.
pub const DSC_CERTIFICATE_TYPE: &str = "DSC";

#[derive(Debug, Clone)]
pub struct VerificationSettings {
    pub(crate) prefix: String,

    /// Only anchors of this type are candidates. `None` accepts any type.
    pub(crate) certificate_type: Option<String>,

    /// Only anchors from these countries are candidates. `None` accepts all.
    pub(crate) allowed_countries: Option<Vec<String>>,

    pub(crate) max_envelope_len: usize,

    /// Skip anchors whose certificate is outside its validity window.
    pub(crate) check_anchor_validity: bool,

    /// Instant used for anchor validity checks; the current time when unset.
    pub(crate) verification_time: Option<DateTime<Utc>>,
}

impl VerificationSettings {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_certificate_type(mut self, certificate_type: impl Into<String>) -> Self {
        self.certificate_type = Some(certificate_type.into());
        self
    }

    pub fn any_certificate_type(mut self) -> Self {
        self.certificate_type = None;
        self
    }

    /// Restrict candidate anchors to the given country codes.
    pub fn with_allowed_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_countries = Some(countries.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_envelope_len(mut self, max_envelope_len: usize) -> Self {
        self.max_envelope_len = max_envelope_len;
        self
    }

    pub fn with_anchor_validity_check(mut self, enabled: bool) -> Self {
        self.check_anchor_validity = enabled;
        self
    }

    pub fn with_verification_time(mut self, at: DateTime<Utc>) -> Self {
        self.verification_time = Some(at);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_envelope_len(&self) -> usize {
        self.max_envelope_len
    }

    pub(crate) fn verification_time(&self) -> DateTime<Utc> {
        self.verification_time.unwrap_or_else(Utc::now)
    }

    pub(crate) fn admits(&self, certificate_type: &str, country: &str) -> bool {
        let type_ok = self
            .certificate_type
            .as_deref()
            .map_or(true, |expected| expected == certificate_type);
        let country_ok = self
            .allowed_countries
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|c| c == country));
        type_ok && country_ok
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            prefix: HC1_PREFIX.to_string(),
            certificate_type: Some(DSC_CERTIFICATE_TYPE.to_string()),
            allowed_countries: None,
            max_envelope_len: DEFAULT_MAX_ENVELOPE_LEN,
            check_anchor_validity: false,
            verification_time: None,
        }
    }
}
