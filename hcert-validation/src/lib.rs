// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod algorithms;
pub mod cose_sign1_verifier;

pub use algorithms::CoseAlgorithm;
pub use cose_sign1_verifier::{cose_alg, verify_parsed_cose_sign1, verify_sig_structure, SignatureError};
