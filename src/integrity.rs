//! Content digests used to verify fetched bytes.
//!
//! The textual form is `sha256-<base64 of the 32 raw digest bytes>`, or
//! `unknown` for a digest that was never computed. An unknown digest is not
//! equal to anything, itself included.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const SHA256_PREFIX: &str = "sha256-";
const UNKNOWN: &str = "unknown";

/// Digest algorithms an [`Integrity`] can be computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    Sha256,
}

/// A content digest.
#[derive(Debug, Clone, Copy)]
pub enum Integrity {
    Unknown,
    Sha256([u8; 32]),
}

impl Integrity {
    /// Compute the digest of `data` with the given algorithm.
    pub fn from_bytes(kind: IntegrityKind, data: &[u8]) -> Self {
        match kind {
            IntegrityKind::Sha256 => Self::sha256(data),
        }
    }

    /// Compute the SHA-256 digest of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Integrity::Sha256(bytes)
    }

    /// Parse the textual form of a digest.
    pub fn from_string(value: &str) -> Result<Self> {
        let value = value.trim();
        if value == UNKNOWN {
            return Ok(Integrity::Unknown);
        }

        let encoded = value
            .strip_prefix(SHA256_PREFIX)
            .ok_or_else(|| Error::InvalidIntegrity {
                value: value.to_string(),
                message: format!("expected '{}' prefix", SHA256_PREFIX),
            })?;

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| Error::InvalidIntegrity {
                value: value.to_string(),
                message: e.to_string(),
            })?;

        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidIntegrity {
                value: value.to_string(),
                message: format!("expected 32 digest bytes, got {}", decoded.len()),
            })?;

        Ok(Integrity::Sha256(bytes))
    }

    pub fn kind(&self) -> Option<IntegrityKind> {
        match self {
            Integrity::Unknown => None,
            Integrity::Sha256(_) => Some(IntegrityKind::Sha256),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Integrity::Unknown)
    }

    /// Whether `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> bool {
        match self.kind() {
            Some(kind) => Integrity::from_bytes(kind, data) == *self,
            None => false,
        }
    }
}

impl PartialEq for Integrity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Integrity::Sha256(a), Integrity::Sha256(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integrity::Unknown => write!(f, "{}", UNKNOWN),
            Integrity::Sha256(bytes) => write!(f, "{}{}", SHA256_PREFIX, STANDARD.encode(bytes)),
        }
    }
}

impl FromStr for Integrity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Integrity::from_string(s)
    }
}
