//! Provide the canonical vocabulary shared by the specrun syntax frontend, static structural parser and interpreter.
//!
//! This crate is intentionally small and dependency-free. It contains pure registries that both:
//! - the lexer/parser use to recognize keywords, operators and punctuation, and
//! - the discovery layers use to recognize the spec DSL (`context`, `spec`, hooks, tag scopes) and source directives
//!   (`#load`, `#ref`) without duplicating string tables.
//!
//! ## Notes
//!
//! - This is a "vocabulary core" crate: **no IO**, no global state, and no AST types.
//! - Callers work with stable IDs (e.g. `KeywordId`, `DslCallId`) and look up spellings/metadata via registry tables.

pub mod lang;
