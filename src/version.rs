//! specrun version information.
//!
//! This module exposes the tool version as a single constant so all subsystems
//! (CLI, parse-result cache keys, cache metadata) agree on the same value.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! - Cache entries written by a different version are treated as misses, so bumping the version invalidates every
//!   cached structural parse.

/// The specrun version string (for example, `0.1.0-alpha.1`).
pub const SPECRUN_VERSION: &str = env!("CARGO_PKG_VERSION");
