// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Token transport encoding: `prefix + base45(zlib(COSE_Sign1))`.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::TransportDecodeError;

/// Prefix of version 1 health certificate tokens.
pub const HC1_PREFIX: &str = "HC1:";

/// Upper bound on the decompressed envelope size unless configured otherwise.
pub const DEFAULT_MAX_ENVELOPE_LEN: usize = 64 * 1024;

const BASE45_ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Output buffer growth step while inflating.
const INFLATE_CHUNK: usize = 4096;

/// Recover the raw COSE envelope bytes from a token.
pub fn decode_token(token: &str, prefix: &str, max_len: usize) -> Result<Vec<u8>, TransportDecodeError> {
    let body = token
        .strip_prefix(prefix)
        .ok_or_else(|| TransportDecodeError::MissingPrefix(prefix.to_string()))?;

    let compressed = base45_decode(body)?;
    decompress(&compressed, max_len)
}

/// Inverse of [`decode_token`], for issuing test tokens.
pub fn encode_token(envelope: &[u8], prefix: &str) -> Result<String, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(envelope)?;
    let compressed = encoder.finish()?;
    Ok(format!("{prefix}{}", base45_encode(&compressed)))
}

/// Inflate a complete zlib stream.
///
/// The header and Adler-32 checksum are checked, the stream must end exactly
/// at the end of `data`, and output beyond `max_len` is refused.
pub fn decompress(data: &[u8], max_len: usize) -> Result<Vec<u8>, TransportDecodeError> {
    if data.is_empty() {
        return Err(TransportDecodeError::Decompression("empty stream".to_string()));
    }

    let mut inflater = Decompress::new(true);
    let mut out = Vec::new();
    loop {
        if out.len() == out.capacity() {
            out.reserve(INFLATE_CHUNK.min(max_len + 1 - out.len()).max(1));
        }

        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| TransportDecodeError::Decompression(e.to_string()))?;

        if out.len() > max_len {
            return Err(TransportDecodeError::TooLarge { limit: max_len });
        }

        match status {
            Status::StreamEnd => break,
            _ if inflater.total_in() as usize == consumed && out.len() == produced => {
                return Err(TransportDecodeError::Decompression("truncated stream".to_string()));
            }
            _ => {}
        }
    }

    if (inflater.total_in() as usize) < data.len() {
        return Err(TransportDecodeError::Decompression(
            "trailing bytes after zlib stream".to_string(),
        ));
    }
    Ok(out)
}

fn base45_value(c: u8) -> Option<u32> {
    BASE45_ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

pub fn base45_decode(input: &str) -> Result<Vec<u8>, TransportDecodeError> {
    let bytes = input.as_bytes();
    if bytes.len() % 3 == 1 {
        return Err(TransportDecodeError::InvalidBase45(format!(
            "length {} leaves a dangling character",
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(bytes.len() / 3 * 2 + 1);
    for (i, chunk) in bytes.chunks(3).enumerate() {
        let mut n = 0u32;
        for (j, &c) in chunk.iter().enumerate().rev() {
            let v = base45_value(c).ok_or_else(|| {
                TransportDecodeError::InvalidBase45(format!(
                    "invalid character {:?} at offset {}",
                    c as char,
                    i * 3 + j
                ))
            })?;
            n = n * 45 + v;
        }

        if chunk.len() == 3 {
            if n > 0xFFFF {
                return Err(TransportDecodeError::InvalidBase45(format!(
                    "triplet at offset {} overflows 16 bits",
                    i * 3
                )));
            }
            out.push((n >> 8) as u8);
            out.push((n & 0xFF) as u8);
        } else {
            if n > 0xFF {
                return Err(TransportDecodeError::InvalidBase45(format!(
                    "final pair at offset {} overflows 8 bits",
                    i * 3
                )));
            }
            out.push(n as u8);
        }
    }
    Ok(out)
}

pub fn base45_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(2) * 3);
    for chunk in input.chunks(2) {
        let mut n = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        for _ in 0..=chunk.len() {
            out.push(BASE45_ALPHABET[(n % 45) as usize] as char);
            n /= 45;
        }
    }
    out
}
