//! specrun language vocabulary registries.
//!
//! This module is the "front door" for language-level vocabulary: reserved keywords, operators,
//! punctuation, core builtin functions, the spec DSL call shapes, and source directives.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no AST types, no IO, no side effects.
//! - The lexer/parser enforce syntax; registries provide spellings and metadata for shared use (diagnostics,
//!   the static structural parser, the name resolver).
//!
//! ## Examples
//! ```rust
//! use specrun_core::lang::dsl::{self, CallShape};
//!
//! let info = dsl::lookup("describe").unwrap();
//! assert_eq!(info.shape, CallShape::BeginContext);
//! ```

pub mod builtins;
pub mod directives;
pub mod dsl;
pub mod keywords;
pub mod operators;
pub mod punctuation;
