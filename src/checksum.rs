//! Content hashing: streaming SHA-256 for duplicate detection and copy
//! verification, plus the deterministic idempotency key for batch dedup.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::BatchMoveError;

const BUF_SIZE: usize = 1024 * 1024; // 1 MiB read buffer

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Streaming SHA-256 of a file's contents, lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String, BatchMoveError> {
    let mut f = File::open(path).map_err(|e| BatchMoveError::io("open for hashing", path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .map_err(|e| BatchMoveError::io("read for hashing", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

/// Byte-for-byte equality via size then checksum. Size is checked first so
/// the common mismatch never pays for two full hashes.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool, BatchMoveError> {
    let meta_a = std::fs::metadata(a).map_err(|e| BatchMoveError::io("stat", a, e))?;
    let meta_b = std::fs::metadata(b).map_err(|e| BatchMoveError::io("stat", b, e))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(file_sha256(a)? == file_sha256(b)?)
}

/// Deterministic identifier for one `(source, destination)` pair, used to
/// detect duplicate submissions within a batch.
pub fn idempotency_key(source: &str, destination: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(destination.as_bytes());
    let digest = hasher.finalize();
    to_hex(&digest[..16])
}
