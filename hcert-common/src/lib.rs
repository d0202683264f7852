// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! CBOR value tree and COSE_Sign1 envelope parsing shared by the hcert crates.

pub mod cose_sign1;
pub mod header_map;
pub mod value;

pub use cose_sign1::{
    encode_signature1_sig_structure, parse_cose_sign1, parse_cose_sign1_with, MalformedEnvelopeError,
    ParsedCoseSign1, COSE_SIGN1_TAG, SIG_STRUCTURE_CONTEXT_SIGNATURE1,
};
pub use header_map::{CoseHeaderMap, HEADER_ALG, HEADER_KID};
pub use value::{decode_value, CborDecoder, CborKey, CborValue, ValueDecodeError, ValueDecoder, MAX_NESTING_DEPTH};
