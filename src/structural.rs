//! Static structural parser: discover spec structure without compiling.
//!
//! When a file does not compile (or throws while declaring specs), discovery falls back to a token walk over the
//! same directive-inlined source the host would compile. The walk recognizes begin-context and leaf-spec calls with
//! string-literal descriptions and reconstructs context paths from brace nesting.
//!
//! ## Notes
//! - The walk is tolerant: lexer errors and unbalanced delimiters never abort it.
//! - A description that is not a single string literal cannot be known statically; the spec is omitted and the
//!   result is marked incomplete.
//! - Member calls (`obj.spec(...)`) and declarations (`fn spec(...)`) are not DSL calls.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use specrun_core::lang::dsl::{self, CallShape, Variant};
use specrun_core::lang::keywords::KeywordId;
use specrun_core::lang::punctuation::PunctuationId;
use specrun_syntax::lexer::{self, Token, TokenKind};
use specrun_syntax::line_index::LineIndex;

use crate::source::{self, SourceUnit};

/// Focus/skip classification of a statically discovered spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticSpecKind {
    Regular,
    Focused,
    Skipped,
}

impl From<Variant> for StaticSpecKind {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Regular => StaticSpecKind::Regular,
            Variant::Focused => StaticSpecKind::Focused,
            Variant::Skipped => StaticSpecKind::Skipped,
        }
    }
}

impl From<StaticSpecKind> for Variant {
    fn from(kind: StaticSpecKind) -> Self {
        match kind {
            StaticSpecKind::Regular => Variant::Regular,
            StaticSpecKind::Focused => Variant::Focused,
            StaticSpecKind::Skipped => Variant::Skipped,
        }
    }
}

/// A spec found by the structural walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSpec {
    pub description: String,
    /// Enclosing context descriptions, outermost first.
    pub context_path: Vec<String>,
    /// 1-based line of the call in its own file.
    pub line: usize,
    pub kind: StaticSpecKind,
    pub pending: bool,
}

/// Something the walk could not analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralWarning {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticParseResult {
    pub specs: Vec<StaticSpec>,
    pub warnings: Vec<StructuralWarning>,
    /// `false` when any warning was recorded, i.e. specs may be missing.
    pub is_complete: bool,
}

/// Resolve `path` and walk it.
///
/// An unreadable root file yields an empty, incomplete result.
pub fn parse(path: &Path) -> StaticParseResult {
    match source::resolve(path) {
        Ok(unit) => parse_unit(&unit),
        Err(err) => StaticParseResult {
            specs: Vec::new(),
            warnings: vec![StructuralWarning {
                line: 0,
                message: err.to_string(),
            }],
            is_complete: false,
        },
    }
}

/// Walk an already resolved unit.
#[tracing::instrument(skip_all, fields(root = %unit.root.display()))]
pub fn parse_unit(unit: &SourceUnit) -> StaticParseResult {
    let (tokens, lex_errors) = lexer::lex_lossy(&unit.text);
    if !lex_errors.is_empty() {
        tracing::debug!(count = lex_errors.len(), "ignoring lexer errors in structural walk");
    }

    let mut walker = Walker {
        tokens: &tokens,
        unit,
        line_index: LineIndex::new(&unit.text),
        pending_contexts: HashMap::new(),
        frames: Vec::new(),
        specs: Vec::new(),
        warnings: Vec::new(),
    };
    walker.walk();

    let is_complete = walker.warnings.is_empty();
    tracing::debug!(specs = walker.specs.len(), is_complete, "structural walk finished");
    StaticParseResult {
        specs: walker.specs,
        warnings: walker.warnings,
        is_complete,
    }
}

/// A context call whose block has not been entered yet.
struct PendingContext {
    description: Option<String>,
    variant: Variant,
    line: usize,
}

enum Frame {
    Context {
        /// `None` when the description is not a literal.
        description: Option<String>,
        variant: Variant,
        line: usize,
        omitted: usize,
    },
    Plain,
}

/// Token positions of one call's argument list.
struct CallExtent {
    /// Index of the closing `)`, if balanced.
    close: Option<usize>,
    first_comma: Option<usize>,
}

struct Walker<'a> {
    tokens: &'a [Token],
    unit: &'a SourceUnit,
    line_index: LineIndex,
    /// Index of a `{` token → context call that it opens.
    pending_contexts: HashMap<usize, PendingContext>,
    frames: Vec<Frame>,
    specs: Vec<StaticSpec>,
    warnings: Vec<StructuralWarning>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self) {
        let tokens = self.tokens;
        for (i, token) in tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::Punctuation(PunctuationId::LBrace) => {
                    let frame = match self.pending_contexts.remove(&i) {
                        Some(ctx) => Frame::Context {
                            description: ctx.description,
                            variant: ctx.variant,
                            line: ctx.line,
                            omitted: 0,
                        },
                        None => Frame::Plain,
                    };
                    self.frames.push(frame);
                }
                TokenKind::Punctuation(PunctuationId::RBrace) => {
                    if let Some(frame) = self.frames.pop() {
                        self.close_frame(frame);
                    }
                }
                TokenKind::Ident(name) => {
                    if let Some(info) = dsl::lookup(name) {
                        if self.is_call_site(i) {
                            self.dsl_call(i, info.shape, info.variant);
                        }
                    }
                }
                _ => {}
            }
        }

        while let Some(frame) = self.frames.pop() {
            if let Frame::Context { line, .. } = &frame {
                self.warn(*line, "context block is never closed".to_string());
            }
            self.close_frame(frame);
        }
    }

    fn close_frame(&mut self, frame: Frame) {
        if let Frame::Context {
            description: None,
            line,
            omitted,
            ..
        } = frame
        {
            if omitted > 0 {
                self.warn(
                    line,
                    format!("{} spec(s) inside a context with a computed description were omitted", omitted),
                );
            }
        }
    }

    /// `name(` not preceded by `.` or `fn`.
    fn is_call_site(&self, i: usize) -> bool {
        let next_is_paren = self
            .tokens
            .get(i + 1)
            .is_some_and(|t| t.kind.is_punctuation(PunctuationId::LParen));
        let prev = i.checked_sub(1).map(|p| &self.tokens[p].kind);
        let prev_blocks = prev.is_some_and(|k| k.is_punctuation(PunctuationId::Dot) || k.is_keyword(KeywordId::Fn));
        next_is_paren && !prev_blocks
    }

    fn extent(&self, open: usize) -> CallExtent {
        let mut depth = 0usize;
        let mut first_comma = None;
        for j in open..self.tokens.len() {
            match self.tokens[j].punctuation_id() {
                Some(PunctuationId::LParen | PunctuationId::LBracket | PunctuationId::LBrace) => depth += 1,
                Some(PunctuationId::RParen | PunctuationId::RBracket | PunctuationId::RBrace) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return CallExtent {
                            close: Some(j),
                            first_comma,
                        };
                    }
                }
                Some(PunctuationId::Comma) if depth == 1 && first_comma.is_none() => first_comma = Some(j),
                _ => {}
            }
        }
        CallExtent {
            close: None,
            first_comma,
        }
    }

    fn dsl_call(&mut self, i: usize, shape: CallShape, variant: Variant) {
        let open = i + 1;
        let extent = self.extent(open);
        let args_end = extent.close.unwrap_or(self.tokens.len());
        let first_arg_end = extent.first_comma.unwrap_or(args_end);

        let description = match &self.tokens[open + 1..first_arg_end] {
            [Token {
                kind: TokenKind::String(s),
                ..
            }] => Some(s.clone()),
            _ => None,
        };
        let second_arg = extent
            .first_comma
            .map(|comma| comma + 1..args_end)
            .filter(|range| !range.is_empty());
        let trailing_brace = extent
            .close
            .map(|close| close + 1)
            .filter(|&j| self.tokens.get(j).is_some_and(|t| t.kind.is_punctuation(PunctuationId::LBrace)));
        let line = self.line(i);

        match shape {
            CallShape::BeginContext => {
                let body = trailing_brace.or_else(|| {
                    second_arg.and_then(|range| {
                        range
                            .into_iter()
                            .find(|&j| self.tokens[j].kind.is_punctuation(PunctuationId::LBrace))
                    })
                });
                if description.is_none() {
                    self.warn(line, "context description is not a string literal".to_string());
                }
                if let Some(brace) = body {
                    self.pending_contexts.insert(
                        brace,
                        PendingContext {
                            description,
                            variant,
                            line,
                        },
                    );
                }
            }
            CallShape::LeafSpec => {
                // A literal `nil` body is the same as no body.
                let nil_body = second_arg.as_ref().is_some_and(|range| {
                    matches!(&self.tokens[range.clone()], [t] if t.kind.is_keyword(KeywordId::Nil))
                });
                let pending = trailing_brace.is_none() && (second_arg.is_none() || nil_body);
                self.leaf(description, variant, line, pending);
            }
            CallShape::Hook(_) | CallShape::TagScope => {}
        }
    }

    fn leaf(&mut self, description: Option<String>, variant: Variant, line: usize, pending: bool) {
        let unknown_context = self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Context {
                description: None,
                omitted,
                ..
            } => Some(omitted),
            _ => None,
        });
        if let Some(omitted) = unknown_context {
            *omitted += 1;
            return;
        }

        let Some(description) = description else {
            self.warn(line, "spec description is not a string literal".to_string());
            return;
        };

        let mut context_path = Vec::new();
        let mut effective = Variant::Regular;
        for frame in &self.frames {
            if let Frame::Context {
                description: Some(desc),
                variant,
                ..
            } = frame
            {
                context_path.push(desc.clone());
                effective = dsl::inherit(effective, *variant);
            }
        }
        effective = dsl::inherit(effective, variant);

        self.specs.push(StaticSpec {
            description,
            context_path,
            line,
            kind: effective.into(),
            pending,
        });
    }

    fn line(&self, token: usize) -> usize {
        let unit_line = self.line_index.line(self.tokens[token].span.start);
        self.unit.line_map.file_line(unit_line)
    }

    fn warn(&mut self, line: usize, message: String) {
        self.warnings.push(StructuralWarning { line, message });
    }
}
