// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use minicbor::Encoder;

use crate::header_map::{CoseHeaderMap, HEADER_ALG, HEADER_KID};
use crate::value::{CborDecoder, CborKey, CborValue, ValueDecodeError, ValueDecoder};

pub const COSE_SIGN1_TAG: u64 = 18;
pub const SIG_STRUCTURE_CONTEXT_SIGNATURE1: &str = "Signature1";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedEnvelopeError {
    #[error("invalid envelope CBOR: {0}")]
    Cbor(#[from] ValueDecodeError),

    #[error("missing COSE_Sign1 tag 18")]
    Untagged,

    #[error("unexpected CBOR tag {0} (expected COSE_Sign1 tag 18)")]
    UnexpectedTag(u64),

    #[error("COSE_Sign1 content is a {0}, expected an array")]
    NotArray(&'static str),

    #[error("array length was {0}, expected 4")]
    WrongLength(usize),

    #[error("protected headers are a {0}, expected a byte string")]
    ProtectedNotBytes(&'static str),

    #[error("failed to parse protected headers: {0}")]
    ProtectedHeaders(ValueDecodeError),

    #[error("protected headers decode to a {0}, expected a map")]
    ProtectedNotMap(&'static str),

    #[error("unprotected headers are a {0}, expected a map")]
    UnprotectedNotMap(&'static str),

    #[error("payload is a {0}, expected a byte string")]
    PayloadNotBytes(&'static str),

    #[error("signature is a {0}, expected a byte string")]
    SignatureNotBytes(&'static str),
}

/// A structurally valid COSE_Sign1 message.
///
/// Nothing here has been authenticated. The payload stays opaque bytes until a
/// signature over it has been checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCoseSign1 {
    pub protected_headers: CoseHeaderMap,
    pub unprotected_headers: CoseHeaderMap,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl ParsedCoseSign1 {
    /// Union of both header maps, protected first and unprotected second, so
    /// unprotected entries replace protected ones with the same label.
    pub fn merged_headers(&self) -> BTreeMap<CborKey, CborValue> {
        let mut merged = self.protected_headers.map().clone();
        merged.extend(
            self.unprotected_headers
                .map()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Key identifier (label 4) from the merged header view.
    ///
    /// The unprotected header wins when both maps carry a kid. If the winning
    /// entry is not a byte string there is no usable kid, even when the other
    /// map has one.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.unprotected_headers
            .get(HEADER_KID)
            .or_else(|| self.protected_headers.get(HEADER_KID))
            .and_then(CborValue::as_bytes)
    }

    /// Algorithm identifier (label 1). Only the protected header is consulted.
    pub fn algorithm(&self) -> Option<i64> {
        self.protected_headers.get_i64(HEADER_ALG)
    }
}

pub fn parse_cose_sign1(input: &[u8]) -> Result<ParsedCoseSign1, MalformedEnvelopeError> {
    parse_cose_sign1_with(&CborDecoder, input)
}

/// Parse with a caller-supplied value decoder.
pub fn parse_cose_sign1_with<D: ValueDecoder + ?Sized>(
    decoder: &D,
    input: &[u8],
) -> Result<ParsedCoseSign1, MalformedEnvelopeError> {
    let items = match decoder.decode(input)? {
        CborValue::Tagged(COSE_SIGN1_TAG, inner) => match *inner {
            CborValue::Array(items) => items,
            other => return Err(MalformedEnvelopeError::NotArray(other.type_name())),
        },
        CborValue::Tagged(tag, _) => return Err(MalformedEnvelopeError::UnexpectedTag(tag)),
        _ => return Err(MalformedEnvelopeError::Untagged),
    };

    let [protected, unprotected, payload, signature]: [CborValue; 4] = items
        .try_into()
        .map_err(|items: Vec<CborValue>| MalformedEnvelopeError::WrongLength(items.len()))?;

    let protected_bstr = match protected {
        CborValue::Bytes(b) => b,
        other => return Err(MalformedEnvelopeError::ProtectedNotBytes(other.type_name())),
    };

    // Empty bstr means empty map for protected headers.
    let protected_map = if protected_bstr.is_empty() {
        BTreeMap::new()
    } else {
        match decoder
            .decode(&protected_bstr)
            .map_err(MalformedEnvelopeError::ProtectedHeaders)?
        {
            CborValue::Map(m) => m,
            other => return Err(MalformedEnvelopeError::ProtectedNotMap(other.type_name())),
        }
    };

    let unprotected_map = match unprotected {
        CborValue::Map(m) => m,
        other => return Err(MalformedEnvelopeError::UnprotectedNotMap(other.type_name())),
    };

    let payload = match payload {
        CborValue::Bytes(b) => b,
        other => return Err(MalformedEnvelopeError::PayloadNotBytes(other.type_name())),
    };

    let signature = match signature {
        CborValue::Bytes(b) => b,
        other => return Err(MalformedEnvelopeError::SignatureNotBytes(other.type_name())),
    };

    Ok(ParsedCoseSign1 {
        protected_headers: CoseHeaderMap::new(protected_bstr, protected_map),
        unprotected_headers: CoseHeaderMap::new(Vec::new(), unprotected_map),
        payload,
        signature,
    })
}

/// Encode `["Signature1", protected, h'', payload]`, the bytes issuers sign.
pub fn encode_signature1_sig_structure(msg: &ParsedCoseSign1) -> Result<Vec<u8>, String> {
    let protected = msg.protected_headers.encoded_map_cbor();
    let mut out = Vec::with_capacity(128 + protected.len() + msg.payload.len());
    {
        let mut enc = Encoder::new(&mut out);
        enc.array(4).map_err(|e| e.to_string())?;
        enc.str(SIG_STRUCTURE_CONTEXT_SIGNATURE1).map_err(|e| e.to_string())?;
        enc.bytes(protected).map_err(|e| e.to_string())?;
        enc.bytes(&[]).map_err(|e| e.to_string())?; // external_aad empty bstr
        enc.bytes(&msg.payload).map_err(|e| e.to_string())?;
    }
    Ok(out)
}
