//! Errors that escape the public discovery and run entry points.
//!
//! Everything below this level (host faults, cache faults, structural warnings) is recovered from or reported as
//! data; only these abort a workflow.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecrunError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Problems loading `specrun.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid project file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("project root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

pub type SpecrunResult<T> = Result<T, SpecrunError>;
