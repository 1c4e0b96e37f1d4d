//! Lexer for spec scripts
//!
//! Handles tokenization including:
//! - Keywords (let, fn, if, while, for, return, throw, ...)
//! - Identifiers and literals (int, float, string)
//! - Operators and punctuation
//! - Line (`//`) and block (`/* */`) comments
//!
//! ## Strict vs lossy
//!
//! The script execution host needs an all-or-nothing token stream ([`lex`]). The static structural parser must
//! tolerate files that do not compile, so [`lex_lossy`] always returns a token stream and reports problems on the
//! side; unrecognized characters become [`TokenKind::Unknown`].
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token)
//! - `strings` - String scanning and escapes
//! - `numbers` - Numeric literal scanning

mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::CompileError;
use specrun_core::lang::operators::OperatorId;
use specrun_core::lang::punctuation::PunctuationId;

/// Lexer for spec script source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    tokens: Vec<Token>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source code.
    ///
    /// Returns a vector of tokens on success, or a vector of errors on failure.
    /// The token stream always ends with an `Eof` token.
    pub fn tokenize(self) -> Result<Vec<Token>, Vec<CompileError>> {
        let (tokens, errors) = self.tokenize_lossy();
        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    /// Tokenize the entire source, keeping going past errors.
    ///
    /// The token stream always ends with an `Eof` token, even when errors were reported.
    pub fn tokenize_lossy(mut self) -> (Vec<Token>, Vec<CompileError>) {
        while !self.is_at_end() {
            self.scan_token();
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos),
        ));

        (self.tokens, self.errors)
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next(); // skip current
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        // Skip whitespace (newlines are insignificant in spec scripts)
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }

        let start = self.current_pos;

        let Some(c) = self.advance() else {
            return;
        };

        match c {
            // Operators and punctuation
            '+' => self.add_op(OperatorId::Plus, start),
            '-' => self.add_op(OperatorId::Minus, start),
            '*' => self.add_op(OperatorId::Star, start),
            '/' => self.scan_slash(start),
            '%' => self.add_op(OperatorId::Percent, start),
            ',' => self.add_punct(PunctuationId::Comma, start),
            ';' => self.add_punct(PunctuationId::Semicolon, start),
            ':' => self.add_punct(PunctuationId::Colon, start),
            '.' => self.add_punct(PunctuationId::Dot, start),
            '(' => self.add_punct(PunctuationId::LParen, start),
            ')' => self.add_punct(PunctuationId::RParen, start),
            '[' => self.add_punct(PunctuationId::LBracket, start),
            ']' => self.add_punct(PunctuationId::RBracket, start),
            '{' => self.add_punct(PunctuationId::LBrace, start),
            '}' => self.add_punct(PunctuationId::RBrace, start),
            '=' => self.operator(start, OperatorId::Eq, &[('=', OperatorId::EqEq)]),
            '!' => self.operator(start, OperatorId::Bang, &[('=', OperatorId::NotEq)]),
            '<' => self.operator(start, OperatorId::Lt, &[('=', OperatorId::LtEq)]),
            '>' => self.operator(start, OperatorId::Gt, &[('=', OperatorId::GtEq)]),
            '&' => self.doubled(start, '&', OperatorId::AndAnd),
            '|' => self.doubled(start, '|', OperatorId::OrOr),

            // Strings
            '"' => self.scan_string(start, '"'),
            '\'' => self.scan_string(start, '\''),

            // Numbers
            '0'..='9' => self.scan_number(start, c),

            // Identifiers and keywords
            _ if is_ident_start(c) => self.scan_identifier(start),

            '#' => self.unexpected(
                start,
                c,
                Some("Directives must appear on their own line and are processed before compilation."),
            ),
            _ => self.unexpected(start, c, None),
        }
    }

    // ========================================================================
    // Operator helpers
    // ========================================================================

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn add_op(&mut self, id: OperatorId, start: usize) {
        self.add_token(TokenKind::Operator(id), start);
    }

    fn add_punct(&mut self, id: PunctuationId, start: usize) {
        self.add_token(TokenKind::Punctuation(id), start);
    }

    /// Try to match compound operator, fallback to simple.
    fn operator(&mut self, start: usize, simple: OperatorId, compounds: &[(char, OperatorId)]) {
        for (c, id) in compounds {
            if self.match_char(*c) {
                self.add_op(*id, start);
                return;
            }
        }
        self.add_op(simple, start);
    }

    /// Operators that only exist doubled (`&&`, `||`).
    fn doubled(&mut self, start: usize, c: char, id: OperatorId) {
        if self.match_char(c) {
            self.add_op(id, start);
        } else {
            self.unexpected(start, c, Some("Did you mean the doubled operator?"));
        }
    }

    /// Scan `/`, `// comment` and `/* comment */`.
    fn scan_slash(&mut self, start: usize) {
        if self.match_char('/') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        } else if self.match_char('*') {
            loop {
                match self.advance() {
                    Some('*') if self.peek() == Some('/') => {
                        self.advance();
                        break;
                    }
                    Some(_) => {}
                    None => {
                        self.errors.push(CompileError::syntax(
                            "Unterminated block comment".to_string(),
                            Span::new(start, self.current_pos),
                        ));
                        break;
                    }
                }
            }
        } else {
            self.add_op(OperatorId::Slash, start);
        }
    }

    fn unexpected(&mut self, start: usize, c: char, hint: Option<&str>) {
        let mut err = CompileError::syntax(
            format!("Unexpected character '{}'", c),
            Span::new(start, self.current_pos),
        );
        if let Some(hint) = hint {
            err = err.with_hint(hint);
        }
        self.errors.push(err);
        self.add_token(TokenKind::Unknown(c), start);
    }

    // ========================================================================
    // Identifier scanning
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }

        let spelling = &self.source[start..self.current_pos];

        if let Some(id) = keyword_id(spelling) {
            self.add_token(TokenKind::Keyword(id), start);
        } else {
            self.add_token(TokenKind::Ident(spelling.to_string()), start);
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if a character can start an identifier (ASCII-only).
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier (ASCII-only).
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convenience function to lex a source string.
///
/// This is a shorthand for `Lexer::new(source).tokenize()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<CompileError>> {
    Lexer::new(source).tokenize()
}

/// Lex a source string, never failing.
///
/// This is a shorthand for `Lexer::new(source).tokenize_lossy()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex_lossy(source: &str) -> (Vec<Token>, Vec<CompileError>) {
    Lexer::new(source).tokenize_lossy()
}

// ============================================================================
// TESTS
// ============================================================================
