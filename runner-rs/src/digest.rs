//! Content digests for detecting stale cached artifacts.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::RunnerError;

/// Hex-encoded SHA-256 of the JSON encoding of `value`.
///
/// Struct fields serialize in declaration order, so equal values always
/// produce equal digests.
pub fn content_digest<T: Serialize + ?Sized>(value: &T) -> Result<String, RunnerError> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
