//! Content hashing for cache keys and invalidation.
//!
//! Every digest is SHA-256 rendered as lowercase hex, so equal bytes always produce equal strings regardless of
//! platform or process.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash arbitrary bytes.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode_lower(&hasher.finalize())
}

/// Hash a file's full contents.
///
/// ## Errors
/// Returns the underlying IO error if the file cannot be read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

pub(crate) fn hex_encode_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// A file participating in a compilation unit, with the hash of its current contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyHash {
    pub path: PathBuf,
    pub hash: String,
}

impl DependencyHash {
    pub fn new(path: impl Into<PathBuf>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }

    /// Hash `path` as it is on disk now.
    ///
    /// ## Errors
    /// Returns the underlying IO error if the file cannot be read.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        Ok(Self::new(path, hash_file(path)?))
    }
}
