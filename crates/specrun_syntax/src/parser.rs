//! Parser for spec scripts
//!
//! Converts a token stream into an AST [`Program`].
//!
//! ## Examples
//!
//! ```rust,no_run
//! use specrun_syntax::{lexer, parser};
//!
//! let source = "fn double(x) { return x * 2 }\ncontext(\"math\") { spec(\"doubles\") { assert_eq(double(2), 4) } }";
//! let tokens = lexer::lex(source).unwrap();
//! let ast = parser::parse(&tokens).unwrap();
//! assert_eq!(ast.statements.len(), 2);
//! ```

use std::sync::Arc;

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::lexer::{Token, TokenKind};
use specrun_core::lang::keywords::{self, KeywordId};
use specrun_core::lang::operators::{self, OperatorId};
use specrun_core::lang::punctuation::{self, PunctuationId};

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/stmts.rs");
include!("parser/expr.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
