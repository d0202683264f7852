// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use crate::value::{CborKey, CborValue};

/// COSE header label for the signature algorithm.
pub const HEADER_ALG: i64 = 1;
/// COSE header label for the key identifier.
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoseHeaderMap {
    encoded_map_cbor: Vec<u8>,
    map: BTreeMap<CborKey, CborValue>,
}

impl CoseHeaderMap {
    pub(crate) fn new(encoded_map_cbor: Vec<u8>, map: BTreeMap<CborKey, CborValue>) -> Self {
        Self { encoded_map_cbor, map }
    }

    /// The exact bytes the header map was carried in.
    ///
    /// Only meaningful for protected headers; these bytes go into the
    /// Sig_structure unchanged. Empty for unprotected headers.
    pub fn encoded_map_cbor(&self) -> &[u8] {
        &self.encoded_map_cbor
    }

    pub fn get(&self, label: i64) -> Option<&CborValue> {
        self.map.get(&CborKey::Int(label))
    }

    pub fn get_i64(&self, label: i64) -> Option<i64> {
        self.get(label).and_then(CborValue::as_i64)
    }

    pub fn get_bytes(&self, label: i64) -> Option<&[u8]> {
        self.get(label).and_then(CborValue::as_bytes)
    }

    pub fn get_array(&self, label: i64) -> Option<&[CborValue]> {
        self.get(label).and_then(CborValue::as_array)
    }

    pub fn map(&self) -> &BTreeMap<CborKey, CborValue> {
        &self.map
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
