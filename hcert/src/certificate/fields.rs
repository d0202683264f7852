// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed accessors over a decoded CBOR map that report the failing path.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hcert_common::{CborKey, CborValue};

use crate::error::MalformedPayloadError;

pub(crate) struct Fields<'a> {
    map: &'a BTreeMap<CborKey, CborValue>,
    path: String,
}

impl<'a> Fields<'a> {
    pub(crate) fn of(value: &'a CborValue, path: impl Into<String>) -> Result<Self, MalformedPayloadError> {
        let path = path.into();
        match value {
            CborValue::Map(map) => Ok(Self { map, path }),
            other => Err(MalformedPayloadError::new(
                path,
                format!("expected map, found {}", other.type_name()),
            )),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    fn child_path(&self, key: &str) -> String {
        format!("{}.{key}", self.path)
    }

    fn get(&self, key: &str) -> Option<&'a CborValue> {
        match self.map.get(&CborKey::Text(key.to_string())) {
            None | Some(CborValue::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn missing(&self, key: &str) -> MalformedPayloadError {
        MalformedPayloadError::new(self.child_path(key), "missing required field")
    }

    fn mismatch(&self, key: &str, expected: &str, found: &CborValue) -> MalformedPayloadError {
        MalformedPayloadError::new(
            self.child_path(key),
            format!("expected {expected}, found {}", found.type_name()),
        )
    }

    pub(crate) fn optional_text(&self, key: &str) -> Result<Option<&'a str>, MalformedPayloadError> {
        match self.get(key) {
            None => Ok(None),
            Some(CborValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.mismatch(key, "text", other)),
        }
    }

    pub(crate) fn required_text(&self, key: &str) -> Result<&'a str, MalformedPayloadError> {
        self.optional_text(key)?.ok_or_else(|| self.missing(key))
    }

    pub(crate) fn required_u32(&self, key: &str) -> Result<u32, MalformedPayloadError> {
        match self.get(key) {
            None => Err(self.missing(key)),
            Some(CborValue::Int(i)) => u32::try_from(*i)
                .map_err(|_| MalformedPayloadError::new(self.child_path(key), format!("{i} is out of range"))),
            Some(other) => Err(self.mismatch(key, "unsigned integer", other)),
        }
    }

    pub(crate) fn required_date(&self, key: &str) -> Result<NaiveDate, MalformedPayloadError> {
        let s = self.required_text(key)?;
        parse_date(s).ok_or_else(|| MalformedPayloadError::new(self.child_path(key), format!("invalid date {s:?}")))
    }

    pub(crate) fn required_datetime(&self, key: &str) -> Result<DateTime<Utc>, MalformedPayloadError> {
        let s = self.required_text(key)?;
        parse_datetime(s)
            .ok_or_else(|| MalformedPayloadError::new(self.child_path(key), format!("invalid date-time {s:?}")))
    }

    pub(crate) fn required_map(&self, key: &str) -> Result<Fields<'a>, MalformedPayloadError> {
        let value = self.get(key).ok_or_else(|| self.missing(key))?;
        Fields::of(value, self.child_path(key))
    }

    /// Entries of an optional array field; absent means no entries.
    pub(crate) fn optional_array(&self, key: &str) -> Result<&'a [CborValue], MalformedPayloadError> {
        match self.get(key) {
            None => Ok(&[]),
            Some(CborValue::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(self.mismatch(key, "array", other)),
        }
    }
}

/// `YYYY-MM-DD`, or the date part of an RFC 3339 date-time.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

/// RFC 3339, or a date-time without offset taken as UTC.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}
