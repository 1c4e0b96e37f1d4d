//! Diagnostics for spec scripts.
//!
//! A [`CompileError`] carries a message, a byte span into the source it was produced from, and optional notes/hints.
//! Rendering with source context goes through `miette` (see [`CompileError::to_diagnostic`]).

use miette::{LabeledSpan, MietteDiagnostic, Severity};
use thiserror::Error;

use crate::ast::Span;

/// A compile-time error with location information
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl CompileError {
    pub fn new(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            kind: ErrorKind::Error,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            ..Self::new(message, span)
        }
    }

    pub fn resolve(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Resolve,
            ..Self::new(message, span)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Convert into a `miette` diagnostic labelled at this error's span.
    ///
    /// Attach the source text with `miette::Report::new(diag).with_source_code(...)` to get a rendered snippet.
    pub fn to_diagnostic(&self) -> MietteDiagnostic {
        let len = self.span.end.saturating_sub(self.span.start).max(1);
        let mut diag = MietteDiagnostic::new(self.message.clone())
            .with_code(self.kind.code())
            .with_severity(match self.kind {
                ErrorKind::Warning => Severity::Warning,
                _ => Severity::Error,
            })
            .with_label(LabeledSpan::at(self.span.start..self.span.start + len, self.kind.to_string()));
        let mut help: Vec<String> = self.notes.iter().map(|n| format!("note: {}", n)).collect();
        help.extend(self.hints.iter().cloned());
        if !help.is_empty() {
            diag = diag.with_help(help.join("\n"));
        }
        diag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Syntax,
    Resolve,
    Warning,
}

impl ErrorKind {
    fn code(self) -> &'static str {
        match self {
            ErrorKind::Error => "specrun::error",
            ErrorKind::Syntax => "specrun::syntax",
            ErrorKind::Resolve => "specrun::resolve",
            ErrorKind::Warning => "specrun::warning",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "error"),
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Resolve => write!(f, "unresolved name"),
            ErrorKind::Warning => write!(f, "warning"),
        }
    }
}

/// Common errors with consistent wording.
pub mod errors {
    use super::*;

    pub fn unknown_symbol(name: &str, span: Span) -> CompileError {
        CompileError::resolve(format!("Unknown symbol '{}'", name), span)
            .with_hint("Define it with `let`/`fn`, or bring a library into scope with `#ref`.")
    }

    pub fn wrong_arity(name: &str, expected: &str, found: usize, span: Span) -> CompileError {
        CompileError::resolve(
            format!("'{}' expects {} argument(s), found {}", name, expected, found),
            span,
        )
    }

    pub fn duplicate_function(name: &str, span: Span) -> CompileError {
        CompileError::resolve(format!("Function '{}' is defined more than once in this scope", name), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = CompileError::syntax("Expected ')'".to_string(), Span::new(3, 4));
        assert_eq!(err.to_string(), "syntax error: Expected ')'");
    }

    #[test]
    fn test_unknown_symbol_has_hint() {
        let err = errors::unknown_symbol("frobnicate", Span::new(0, 10));
        assert_eq!(err.kind, ErrorKind::Resolve);
        assert_eq!(err.hints.len(), 1);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_to_diagnostic_never_zero_width() {
        let err = CompileError::new("boom".to_string(), Span::new(5, 5));
        let diag = err.to_diagnostic();
        let labels = diag.labels.unwrap_or_default();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].len(), 1);
    }
}
