// crates/reproduce-core/src/core/integrity.rs
// ============================================================================
// Module: Integrity Digests
// Description: Subresource-integrity digests for packed tarballs.
// Purpose: Compute and compare `sha512-<base64>` integrity strings.
// Dependencies: base64, sha2
// ============================================================================

//! ## Overview
//! Registry integrity strings use the Subresource Integrity format:
//! `sha512-` followed by the standard base64 encoding of the digest. Strategies
//! that produce a tarball on disk hash it here; strategies whose tooling
//! reports integrity directly skip this module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::Digest;
use sha2::Sha512;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SRI algorithm prefix.
const SRI_PREFIX: &str = "sha512-";
/// Read buffer size for streamed hashing.
const READ_CHUNK_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Computes the integrity string for a byte slice.
#[must_use]
pub fn integrity_for_bytes(bytes: &[u8]) -> String {
    let digest = Sha512::digest(bytes);
    format!("{SRI_PREFIX}{}", STANDARD.encode(digest))
}

/// Computes the integrity string for a reader, streaming its content.
///
/// # Errors
///
/// Returns [`io::Error`] when the reader fails.
pub fn integrity_for_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha512::new();
    let mut buffer = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[.. read]);
    }
    Ok(format!("{SRI_PREFIX}{}", STANDARD.encode(hasher.finalize())))
}

/// Returns true when both digests are present, non-empty, and identical.
#[must_use]
pub fn digests_match(published: Option<&str>, rebuilt: Option<&str>) -> bool {
    match (published, rebuilt) {
        (Some(published), Some(rebuilt)) => !published.is_empty() && published == rebuilt,
        _ => false,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
