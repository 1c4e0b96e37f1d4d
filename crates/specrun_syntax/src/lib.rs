//! Shared syntax frontend for spec scripts: lexer, parser, AST, diagnostics.
//!
//! This crate is dependency-light and reused by the script execution host (which needs a full AST) and by the
//! static structural parser (which only needs a tolerant token stream).
//!
//! ## Notes
//! - This crate is intentionally "syntax-only": it does not do name resolution, directive inlining, or evaluation.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `specrun_core::lang` registries.
//!
//! ## Examples
//! ```rust,no_run
//! use specrun_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("context(\"Foo\") { spec(\"works\") {} }").unwrap();
//! let program = parser::parse(&tokens).unwrap();
//! assert_eq!(program.statements.len(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod token_helpers;
