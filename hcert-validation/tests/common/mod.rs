// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code)]

use hcert_common::{encode_signature1_sig_structure, parse_cose_sign1, ParsedCoseSign1};
use minicbor::data::Tag;

/// Protected headers `{ 1: alg }`.
pub(crate) fn encode_protected_map(alg: i64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = minicbor::Encoder::new(&mut out);
    enc.map(1).unwrap();
    enc.i64(1).unwrap();
    enc.i64(alg).unwrap();
    out
}

/// Tagged COSE_Sign1 with an empty unprotected map.
pub(crate) fn encode_sign1(protected: &[u8], payload: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = minicbor::Encoder::new(&mut out);
    enc.tag(Tag::new(18)).unwrap();
    enc.array(4).unwrap();
    enc.bytes(protected).unwrap();
    enc.map(0).unwrap();
    enc.bytes(payload).unwrap();
    enc.bytes(signature).unwrap();
    out
}

/// Sig_structure bytes for `protected` + `payload`, derived through the parser.
pub(crate) fn sig_structure_for(protected: &[u8], payload: &[u8]) -> Vec<u8> {
    let unsigned = encode_sign1(protected, payload, b"");
    let parsed = parse_cose_sign1(&unsigned).unwrap();
    encode_signature1_sig_structure(&parsed).unwrap()
}

pub(crate) fn parse(msg: &[u8]) -> ParsedCoseSign1 {
    parse_cose_sign1(msg).unwrap()
}
