//! String scanning for the spec script lexer
//!
//! Strings are single-line, delimited by `"` or `'`, and support the usual backslash escapes.

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

/// Result of processing an escape sequence
enum EscapeResult {
    /// Successfully parsed escape character
    Char(char),
    /// Unknown escape - preserve as-is (backslash + char)
    Unknown(char),
    /// End of input during escape
    Eof,
}

impl<'a> Lexer<'a> {
    /// Process a text escape sequence.
    /// Called after consuming the backslash.
    fn scan_text_escape(&mut self, quote: char) -> EscapeResult {
        match self.advance() {
            Some('n') => EscapeResult::Char('\n'),
            Some('t') => EscapeResult::Char('\t'),
            Some('r') => EscapeResult::Char('\r'),
            Some('0') => EscapeResult::Char('\0'),
            Some('\\') => EscapeResult::Char('\\'),
            Some(q) if q == quote => EscapeResult::Char(q),
            Some(c) => EscapeResult::Unknown(c),
            None => EscapeResult::Eof,
        }
    }

    pub(super) fn scan_string(&mut self, start: usize, quote: char) {
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.errors.push(CompileError::syntax(
                        "Unterminated string".to_string(),
                        Span::new(start, self.current_pos),
                    ));
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.scan_text_escape(quote) {
                        EscapeResult::Char(c) => value.push(c),
                        EscapeResult::Unknown(c) => {
                            value.push('\\');
                            value.push(c);
                        }
                        EscapeResult::Eof => {
                            value.push('\\');
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.add_token(TokenKind::String(value), start);
    }
}
