//! Project configuration.
//!
//! Defaults cover most projects; an optional `specrun.toml` at the project root and the `SPECRUN_NO_CACHE`
//! environment variable adjust them:
//!
//! ```toml
//! extension = "spec"
//!
//! [cache]
//! enabled = true
//! dir = ".specrun/cache/parsing"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::ParseResultCache;
use crate::error::ConfigError;
use crate::source;
use crate::version::SPECRUN_VERSION;

pub const CONFIG_FILE: &str = "specrun.toml";
pub const DEFAULT_EXTENSION: &str = "spec";
/// Set to `1`, `true` or `yes` to disable the parse cache.
pub const NO_CACHE_ENV: &str = "SPECRUN_NO_CACHE";

/// Cache location relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".specrun/cache/parsing";

/// Settings for one project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Absolute project root; spec ids are relative to it.
    pub root: PathBuf,
    /// Spec file extension, without the dot.
    pub extension: String,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    /// Version string mixed into every cache key.
    pub tool_version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    extension: Option<String>,
    cache: Option<CacheSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    enabled: Option<bool>,
    dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Defaults for `root`, ignoring any project file.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = source::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            cache_dir: root.join(DEFAULT_CACHE_DIR),
            root,
            extension: DEFAULT_EXTENSION.to_string(),
            cache_enabled: true,
            tool_version: SPECRUN_VERSION.to_string(),
        }
    }

    /// Defaults, then `specrun.toml` if present, then the environment.
    ///
    /// ## Errors
    /// [`ConfigError`] when the root is not a directory or the project file cannot be read or parsed.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new(root);
        if !config.root.is_dir() {
            return Err(ConfigError::NotADirectory(config.root));
        }

        let file = config.root.join(CONFIG_FILE);
        if file.is_file() {
            let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
                path: file.clone(),
                source,
            })?;
            let parsed: ConfigFile =
                toml::from_str(&text).map_err(|source| ConfigError::Parse { path: file.clone(), source })?;
            config.apply(parsed);
            tracing::debug!(path = %file.display(), "loaded project file");
        }

        if no_cache_requested(std::env::var(NO_CACHE_ENV).ok().as_deref()) {
            config.cache_enabled = false;
        }
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(extension) = file.extension {
            self.extension = normalize_extension(&extension);
        }
        if let Some(cache) = file.cache {
            if let Some(enabled) = cache.enabled {
                self.cache_enabled = enabled;
            }
            if let Some(dir) = cache.dir {
                self.cache_dir = self.root.join(dir);
            }
        }
    }

    /// Set the spec file extension (a leading `.` is ignored).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = normalize_extension(&extension.into());
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    /// The parse cache these settings describe.
    pub fn cache(&self) -> ParseResultCache {
        if self.cache_enabled {
            ParseResultCache::new(&self.cache_dir, &self.tool_version)
        } else {
            ParseResultCache::disabled()
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}

fn no_cache_requested(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::new(dir.path());
        assert_eq!(config.extension, "spec");
        assert!(config.cache_enabled);
        assert!(config.cache_dir.ends_with(".specrun/cache/parsing"));
        assert_eq!(config.tool_version, SPECRUN_VERSION);
        assert!(config.root.is_absolute());
    }

    #[test]
    fn builder_methods() {
        let config = ProjectConfig::new("/tmp/project")
            .with_extension(".bdd")
            .with_cache_enabled(false)
            .with_tool_version("9.9.9");
        assert_eq!(config.extension, "bdd");
        assert!(!config.cache().is_enabled());
        assert_eq!(config.tool_version, "9.9.9");
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "extension = \"bdd\"\n\n[cache]\nenabled = false\ndir = \"tmp/cache\"\n",
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.extension, "bdd");
        assert!(!config.cache_enabled);
        assert!(config.cache_dir.ends_with("tmp/cache"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "extensions = \"bdd\"\n").unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory(_)));
    }

    #[test]
    fn no_cache_values() {
        assert!(no_cache_requested(Some("1")));
        assert!(no_cache_requested(Some("TRUE")));
        assert!(!no_cache_requested(Some("0")));
        assert!(!no_cache_requested(None));
    }
}
