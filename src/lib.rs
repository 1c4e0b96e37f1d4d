#![forbid(unsafe_code)]
//! specrun: discovery, caching and execution core for behavior-driven spec scripts
//!
//! Spec files declare nested `context` blocks holding leaf `spec` blocks. This crate finds those specs (by running
//! the script, or by a static structural walk when it does not run), gives each a stable id, caches static results
//! on disk, and executes any chosen subset.
//!
//! ## Layout
//!
//! - [`source`] / [`hashing`]: directive inlining and content hashes
//! - [`host`]: compiler, interpreter and spec tree builder
//! - [`structural`] / [`cache`]: static fallback and its disk cache
//! - [`discovery`] / [`execution`] / [`orchestrator`]: the workflows
//! - [`cli`]: the `specrun` binary
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents an internal bug (logic error), use `.expect("INVARIANT: reason")`
//!   with a clear explanation.

pub mod cache;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod hashing;
pub mod host;
pub mod orchestrator;
pub mod source;
pub mod structural;
pub mod version;

pub use cache::ParseResultCache;
pub use cancel::CancellationToken;
pub use config::ProjectConfig;
pub use discovery::{DiscoveredSpec, Discoverer, DiscoveryError, DiscoveryResult};
pub use error::{ConfigError, SpecrunError, SpecrunResult};
pub use execution::{ExecutionResult, Executor, SpecResult, SpecStatus};
pub use host::{HostFault, ScriptExecutionHost};
pub use orchestrator::{CollectingSink, OutcomeSink, Orchestrator, RunSummary, SinkNode};
pub use structural::{StaticParseResult, StaticSpec, StaticSpecKind, StructuralWarning};
