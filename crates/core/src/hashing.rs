//! Shared SHA-256 hex digest utility.
//!
//! The trivia pool uses content hashes as its dedup key: two independently
//! generated questions with identical text and options collapse to one row.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Content hash for a trivia question: text and options joined with `|`.
///
/// Option order matters; reordered options are a different question for
/// dedup purposes (the generator emits them in presentation order).
pub fn question_content_hash(question: &str, options: &[String]) -> String {
    let content = format!("{}|{}", question, options.join("|"));
    sha256_hex(content.as_bytes())
}
