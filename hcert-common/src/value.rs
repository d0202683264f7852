// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generic CBOR value tree.
//!
//! Everything above this module works on [`CborValue`] rather than on the raw
//! minicbor decoder, so the envelope parser and the certificate model only give
//! meaning to an already-decoded tree.

use std::collections::BTreeMap;

use minicbor::data::Type;
use minicbor::Decoder;

/// Nested structures deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CborKey {
    Int(i64),
    Text(String),
}

impl From<i64> for CborKey {
    fn from(value: i64) -> Self {
        CborKey::Int(value)
    }
}

impl From<&str> for CborKey {
    fn from(value: &str) -> Self {
        CborKey::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(BTreeMap<CborKey, CborValue>),
    Bool(bool),
    Float(f64),
    Null,
    Undefined,
    Tagged(u64, Box<CborValue>),
}

impl CborValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CborValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<CborKey, CborValue>> {
        match self {
            CborValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up `key` when this value is a map.
    pub fn get(&self, key: impl Into<CborKey>) -> Option<&CborValue> {
        let key: CborKey = key.into();
        self.as_map().and_then(|m| m.get(&key))
    }

    /// Short name of the CBOR major type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            CborValue::Int(_) => "int",
            CborValue::Bytes(_) => "bstr",
            CborValue::Text(_) => "tstr",
            CborValue::Array(_) => "array",
            CborValue::Map(_) => "map",
            CborValue::Bool(_) => "bool",
            CborValue::Float(_) => "float",
            CborValue::Null => "null",
            CborValue::Undefined => "undefined",
            CborValue::Tagged(..) => "tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueDecodeError {
    #[error("empty input")]
    Empty,

    #[error("CBOR decode failed: {0}")]
    Cbor(String),

    #[error("indefinite-length items are not supported")]
    IndefiniteLength,

    #[error("unsupported CBOR item: {0}")]
    Unsupported(String),

    #[error("duplicate map key {0:?}")]
    DuplicateKey(CborKey),

    #[error("nesting deeper than {MAX_NESTING_DEPTH} levels")]
    TooDeep,

    #[error("trailing bytes after CBOR item")]
    TrailingBytes,
}

impl ValueDecodeError {
    fn cbor<E: std::fmt::Display>(e: E) -> Self {
        Self::Cbor(e.to_string())
    }
}

/// Turns bytes into a [`CborValue`] tree.
///
/// The envelope parser takes one of these so callers can swap the decoding
/// primitive; [`CborDecoder`] is the default.
pub trait ValueDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<CborValue, ValueDecodeError>;
}

/// minicbor-backed [`ValueDecoder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CborDecoder;

impl ValueDecoder for CborDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<CborValue, ValueDecodeError> {
        decode_value(bytes)
    }
}

/// Decode exactly one CBOR data item spanning all of `bytes`.
pub fn decode_value(bytes: &[u8]) -> Result<CborValue, ValueDecodeError> {
    if bytes.is_empty() {
        return Err(ValueDecodeError::Empty);
    }

    let mut dec = Decoder::new(bytes);
    let value = decode_item(&mut dec, 0)?;

    if dec.position() != bytes.len() {
        return Err(ValueDecodeError::TrailingBytes);
    }

    Ok(value)
}

fn decode_key(dec: &mut Decoder<'_>) -> Result<CborKey, ValueDecodeError> {
    match dec.datatype().map_err(ValueDecodeError::cbor)? {
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => Ok(CborKey::Int(dec.i64().map_err(ValueDecodeError::cbor)?)),
        Type::String => Ok(CborKey::Text(
            dec.str().map_err(ValueDecodeError::cbor)?.to_string(),
        )),
        other => Err(ValueDecodeError::Unsupported(format!("map key of type {other:?}"))),
    }
}

fn decode_item(dec: &mut Decoder<'_>, depth: usize) -> Result<CborValue, ValueDecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ValueDecodeError::TooDeep);
    }

    match dec.datatype().map_err(ValueDecodeError::cbor)? {
        Type::Null => {
            dec.null().map_err(ValueDecodeError::cbor)?;
            Ok(CborValue::Null)
        }
        Type::Undefined => {
            dec.undefined().map_err(ValueDecodeError::cbor)?;
            Ok(CborValue::Undefined)
        }
        Type::Bool => Ok(CborValue::Bool(dec.bool().map_err(ValueDecodeError::cbor)?)),
        Type::Bytes => Ok(CborValue::Bytes(
            dec.bytes().map_err(ValueDecodeError::cbor)?.to_vec(),
        )),
        Type::String => Ok(CborValue::Text(
            dec.str().map_err(ValueDecodeError::cbor)?.to_string(),
        )),
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => Ok(CborValue::Int(dec.i64().map_err(ValueDecodeError::cbor)?)),
        Type::F32 => Ok(CborValue::Float(f64::from(
            dec.f32().map_err(ValueDecodeError::cbor)?,
        ))),
        Type::F64 => Ok(CborValue::Float(dec.f64().map_err(ValueDecodeError::cbor)?)),
        Type::Tag => {
            let tag = dec.tag().map_err(ValueDecodeError::cbor)?;
            let inner = decode_item(dec, depth + 1)?;
            Ok(CborValue::Tagged(tag.as_u64(), Box::new(inner)))
        }
        Type::Array => {
            let len = dec
                .array()
                .map_err(ValueDecodeError::cbor)?
                .ok_or(ValueDecodeError::IndefiniteLength)?;
            // Cap the pre-allocation; the length prefix is attacker controlled.
            let mut out = Vec::with_capacity(len.min(64) as usize);
            for _ in 0..len {
                out.push(decode_item(dec, depth + 1)?);
            }
            Ok(CborValue::Array(out))
        }
        Type::Map => {
            let len = dec
                .map()
                .map_err(ValueDecodeError::cbor)?
                .ok_or(ValueDecodeError::IndefiniteLength)?;
            let mut out = BTreeMap::new();
            for _ in 0..len {
                let key = decode_key(dec)?;
                let value = decode_item(dec, depth + 1)?;
                if out.contains_key(&key) {
                    return Err(ValueDecodeError::DuplicateKey(key));
                }
                out.insert(key, value);
            }
            Ok(CborValue::Map(out))
        }
        Type::ArrayIndef | Type::MapIndef | Type::BytesIndef | Type::StringIndef => {
            Err(ValueDecodeError::IndefiniteLength)
        }
        other => Err(ValueDecodeError::Unsupported(format!("{other:?}"))),
    }
}
