// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Disease or agent a certificate entry is about (SNOMED CT code on the wire).
///
/// Equality, hashing and display go through [`Target::code`], so
/// `Target::Other("840539006".into())` is the same target as `Target::Covid19`.
#[derive(Debug, Clone)]
pub enum Target {
    Covid19,
    Other(String),
}

impl Target {
    pub const COVID19_CODE: &'static str = "840539006";

    pub fn from_code(code: &str) -> Self {
        match code {
            Self::COVID19_CODE => Target::Covid19,
            other => Target::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Target::Covid19 => Self::COVID19_CODE,
            Target::Other(code) => code,
        }
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Self::COVID19_CODE => f.write_str("COVID-19"),
            code => write!(f, "target {code}"),
        }
    }
}
