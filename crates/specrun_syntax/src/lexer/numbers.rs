//! Number scanning for the spec script lexer
//!
//! Handles integer and floating-point literals.

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    pub(super) fn scan_number(&mut self, start: usize, first: char) {
        let mut value = String::from(first);
        let mut is_float = false;

        // Integer part
        self.scan_digits(&mut value);

        // Decimal part; `1.foo` stays an int followed by a field access
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            value.push('.');
            self.advance(); // consume .
            self.scan_digits(&mut value);
        }

        // Exponent part
        if self.peek() == Some('e') || self.peek() == Some('E') {
            is_float = true;
            value.push('e');
            self.advance();
            if let Some(sign) = self.peek() {
                if sign == '+' || sign == '-' {
                    value.push(sign);
                    self.advance();
                }
            }
            self.scan_digits(&mut value);
        }

        let kind = if is_float {
            value.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            value.parse::<i64>().ok().map(TokenKind::Int)
        };

        match kind {
            Some(kind) => self.add_token(kind, start),
            None => {
                self.errors.push(CompileError::syntax(
                    format!("Invalid numeric literal: {}", value),
                    Span::new(start, self.current_pos),
                ));
                // Keep the stream well-formed for lossy consumers.
                self.add_token(TokenKind::Int(0), start);
            }
        }
    }

    fn scan_digits(&mut self, value: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    value.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }
    }
}
