// crates/datumplan-core/src/core/hashing.rs
// ============================================================================
// Module: Datum Canonical Hashing
// Description: RFC 8785 JSON canonicalization and content hashing utilities.
// Purpose: Provide deterministic hashes for decisions, steps, reports, and exports.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Datum hashes all canonical JSON using RFC 8785 (JCS) to guarantee stable,
//! replayable digests across hosts. Content-addressed identifiers (decision
//! ids, step ids) are fixed-length hex prefixes of SHA-256 digests; report
//! and export hashes are full digests. Both lengths are part of the external
//! contract and must not change between releases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Contract Constants
// ============================================================================

/// Hex length of content-addressed identifiers (decision ids, step ids).
///
/// # Invariants
/// - Frozen external contract; auditors validate id shape against this length.
pub const CONTENT_ID_HEX_LEN: usize = 16;

/// Hex length of full digests (report hashes, export content hashes).
pub const FULL_DIGEST_HEX_LEN: usize = 64;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for Datum artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing (FIPS-friendly default).
    Sha256,
}

/// Default hash algorithm for Datum.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }

    /// Returns the leading hex prefix used for content-addressed identifiers.
    #[must_use]
    pub fn content_id_prefix(&self) -> &str {
        &self.value[.. CONTENT_ID_HEX_LEN.min(self.value.len())]
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

/// Derives a content-addressed identifier from a serializable value.
///
/// The result is the first [`CONTENT_ID_HEX_LEN`] lowercase hex characters of
/// the SHA-256 digest over the value's RFC 8785 canonical form.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn content_id<T: Serialize + ?Sized>(value: &T) -> Result<String, HashError> {
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, value)?;
    Ok(digest.content_id_prefix().to_string())
}

/// Returns true when `id` has the canonical content-id shape.
#[must_use]
pub fn is_content_id(id: &str) -> bool {
    id.len() == CONTENT_ID_HEX_LEN
        && id.chars().all(|ch| ch.is_ascii_digit() || ('a' ..= 'f').contains(&ch))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let hi = usize::from(byte >> 4);
        let lo = usize::from(byte & 0x0f);
        out.push(char::from(HEX[hi]));
        out.push(char::from(HEX[lo]));
    }
    out
}
