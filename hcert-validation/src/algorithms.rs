// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// COSE algorithms accepted for health certificate signatures (IANA COSE Algorithms registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
    /// ECDSA w/ SHA-384 over P-384.
    ES384 = -35,
    /// ECDSA w/ SHA-512 over P-521.
    ES512 = -36,
    /// RSASSA-PSS w/ SHA-256.
    PS256 = -37,
    /// RSASSA-PKCS1v1.5 w/ SHA-256.
    RS256 = -257,
}

impl CoseAlgorithm {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(CoseAlgorithm::ES256),
            -35 => Some(CoseAlgorithm::ES384),
            -36 => Some(CoseAlgorithm::ES512),
            -37 => Some(CoseAlgorithm::PS256),
            -257 => Some(CoseAlgorithm::RS256),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }
}
