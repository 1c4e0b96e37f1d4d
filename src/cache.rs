//! Disk-resident cache of structural parse results.
//!
//! Entries are keyed by the tool version, the source path and the content hash of every file in its compilation
//! unit, so an entry can only be trusted when all of those still match. Each entry is two JSON files in the cache
//! directory:
//!
//! - `{key}.result.json`: the [`StaticParseResult`].
//! - `{key}.meta.json`: [`CacheMetadata`], written last so its presence marks a complete entry.
//!
//! ## Notes
//! - Every IO or decoding failure is a cache miss (or a skipped write), logged at `debug`. The cache never fails
//!   discovery.
//! - Writes go through a uniquely named temp file and an atomic rename.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hashing::{DependencyHash, hex_encode_lower};
use crate::structural::StaticParseResult;

const META_SUFFIX: &str = ".meta.json";
const RESULT_SUFFIX: &str = ".result.json";
const KEY_LEN: usize = 16;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Validation record stored next to each cached result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub tool_version: String,
    pub source_path: String,
    /// Dependency path → content hash.
    pub dependencies: BTreeMap<String, String>,
    /// UTC write time, RFC 3339 with second precision.
    pub created_at: String,
}

#[derive(Debug, thiserror::Error)]
enum CacheFault {
    #[error("cache io: {0}")]
    Io(#[from] io::Error),
    #[error("cache entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stale cache entry: {0}")]
    Stale(&'static str),
}

/// Content-hash addressed store for [`StaticParseResult`]s.
#[derive(Debug, Clone)]
pub struct ParseResultCache {
    dir: PathBuf,
    tool_version: String,
    enabled: bool,
}

impl ParseResultCache {
    pub fn new(dir: impl Into<PathBuf>, tool_version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            tool_version: tool_version.into(),
            enabled: true,
        }
    }

    /// A cache that never stores anything and always misses.
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            tool_version: String::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First 16 hex chars of the SHA-256 of the version, the path and the sorted dependency hashes.
    pub fn cache_key(&self, path: &Path, deps: &[DependencyHash]) -> String {
        let mut sorted: Vec<&DependencyHash> = deps.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut hasher = Sha256::new();
        hasher.update(self.tool_version.as_bytes());
        hasher.update(b"\n");
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\n");
        for dep in sorted {
            hasher.update(format!("{}:{}\n", dep.path.to_string_lossy(), dep.hash).as_bytes());
        }
        let mut key = hex_encode_lower(&hasher.finalize());
        key.truncate(KEY_LEN);
        key
    }

    fn entry_paths(&self, key: &str) -> (PathBuf, PathBuf) {
        (
            self.dir.join(format!("{key}{META_SUFFIX}")),
            self.dir.join(format!("{key}{RESULT_SUFFIX}")),
        )
    }

    /// Look up a result whose dependency hashes all match `deps`.
    pub fn try_get(&self, path: &Path, deps: &[DependencyHash]) -> Option<StaticParseResult> {
        if !self.enabled {
            return None;
        }
        let key = self.cache_key(path, deps);
        let (meta_path, result_path) = self.entry_paths(&key);
        if !meta_path.exists() {
            tracing::debug!(%key, path = %path.display(), "parse cache miss");
            return None;
        }

        match self.read_entry(&meta_path, &result_path, deps) {
            Ok(result) => {
                tracing::debug!(%key, path = %path.display(), "parse cache hit");
                Some(result)
            }
            Err(fault) => {
                tracing::debug!(%key, %fault, "discarding cache entry");
                let _ = std::fs::remove_file(&meta_path);
                let _ = std::fs::remove_file(&result_path);
                None
            }
        }
    }

    fn read_entry(
        &self,
        meta_path: &Path,
        result_path: &Path,
        deps: &[DependencyHash],
    ) -> Result<StaticParseResult, CacheFault> {
        let meta: CacheMetadata = serde_json::from_slice(&std::fs::read(meta_path)?)?;
        if meta.tool_version != self.tool_version {
            return Err(CacheFault::Stale("tool version changed"));
        }
        if meta.dependencies.len() != deps.len() {
            return Err(CacheFault::Stale("dependency count changed"));
        }
        for dep in deps {
            let stored = meta.dependencies.get(dep.path.to_string_lossy().as_ref());
            if stored != Some(&dep.hash) {
                return Err(CacheFault::Stale("dependency content changed"));
            }
        }
        Ok(serde_json::from_slice(&std::fs::read(result_path)?)?)
    }

    /// Store `result` for `path`. Failures are logged and otherwise ignored.
    pub fn put(&self, path: &Path, deps: &[DependencyHash], result: &StaticParseResult) {
        if !self.enabled {
            return;
        }
        let key = self.cache_key(path, deps);
        if let Err(fault) = self.write_entry(&key, path, deps, result) {
            tracing::debug!(%key, %fault, "skipping cache write");
        }
    }

    fn write_entry(
        &self,
        key: &str,
        path: &Path,
        deps: &[DependencyHash],
        result: &StaticParseResult,
    ) -> Result<(), CacheFault> {
        std::fs::create_dir_all(&self.dir)?;
        let (meta_path, result_path) = self.entry_paths(key);

        let meta = CacheMetadata {
            tool_version: self.tool_version.clone(),
            source_path: path.to_string_lossy().into_owned(),
            dependencies: deps
                .iter()
                .map(|d| (d.path.to_string_lossy().into_owned(), d.hash.clone()))
                .collect(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        };

        // Result first: a metadata file only ever points at a complete payload.
        self.write_atomic(&result_path, &serde_json::to_vec_pretty(result)?)?;
        self.write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?)?;
        Ok(())
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), CacheFault> {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".tmp-{}-{}", std::process::id(), n));
        std::fs::write(&tmp, bytes)?;
        if let Err(err) = std::fs::rename(&tmp, target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    /// Remove every entry. Returns the number of files deleted.
    ///
    /// ## Errors
    /// Returns the IO error if the cache directory exists but cannot be listed.
    pub fn clear(&self) -> io::Result<usize> {
        if !self.enabled || !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let is_cache_file = name.ends_with(META_SUFFIX) || name.ends_with(RESULT_SUFFIX) || name.starts_with(".tmp-");
            if is_cache_file && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        tracing::info!(removed, dir = %self.dir.display(), "cleared parse cache");
        Ok(removed)
    }
}
