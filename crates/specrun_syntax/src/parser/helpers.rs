// ========================================================================
// Helpers
// ========================================================================

impl<'a> Parser<'a> {
    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof; clamp so a stray read never panics.
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn previous_span(&self) -> Span {
        if self.pos == 0 { self.current_span() } else { self.previous().span }
    }

    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous_span())
    }

    fn check_keyword(&self, id: KeywordId) -> bool {
        self.peek().kind.is_keyword(id)
    }

    fn check_punct(&self, id: PunctuationId) -> bool {
        self.peek().kind.is_punctuation(id)
    }

    fn check_op(&self, id: OperatorId) -> bool {
        self.peek().kind.is_operator(id)
    }

    fn match_keyword(&mut self, id: KeywordId) -> bool {
        if self.check_keyword(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_punct(&mut self, id: PunctuationId) -> bool {
        if self.check_punct(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, id: OperatorId) -> bool {
        if self.check_op(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, id: PunctuationId, context: &str) -> Result<Span, CompileError> {
        if self.check_punct(id) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("Expected '{}' {}", punctuation::as_str(id), context)))
        }
    }

    fn identifier(&mut self, context: &str) -> Result<Spanned<Ident>, CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Ok(Spanned::new(name, span))
            }
            _ => Err(self.unexpected(&format!("Expected identifier {}", context))),
        }
    }

    fn unexpected(&self, message: &str) -> CompileError {
        let token = self.peek();
        CompileError::syntax(
            format!("{}, found {}", message, describe_token(&token.kind)),
            token.span,
        )
    }

    /// Skip tokens until a likely statement boundary.
    ///
    /// Always consumes at least one token so a stray token cannot stall the parse loop, except when `in_block` is
    /// set and the current token closes the enclosing block.
    fn synchronize(&mut self, in_block: bool) {
        if in_block && self.check_punct(PunctuationId::RBrace) {
            return;
        }
        self.advance();

        let mut depth = 0usize;
        while !self.is_at_end() {
            if depth == 0 && self.previous().kind.is_punctuation(PunctuationId::Semicolon) {
                return;
            }
            match self.peek().kind.punctuation_id() {
                Some(PunctuationId::LBrace) => depth += 1,
                Some(PunctuationId::RBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            if depth == 0 {
                if let Some(
                    KeywordId::Let
                    | KeywordId::Fn
                    | KeywordId::If
                    | KeywordId::While
                    | KeywordId::For
                    | KeywordId::Return
                    | KeywordId::Throw,
                ) = self.peek().keyword_id()
                {
                    return;
                }
            }
            self.advance();
        }
    }
}

fn describe_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Keyword(id) => format!("keyword '{}'", keywords::as_str(*id)),
        TokenKind::Operator(id) => format!("'{}'", operators::as_str(*id)),
        TokenKind::Punctuation(id) => format!("'{}'", punctuation::as_str(*id)),
        TokenKind::Ident(name) => format!("identifier '{}'", name),
        TokenKind::Int(v) => format!("integer {}", v),
        TokenKind::Float(v) => format!("number {}", v),
        TokenKind::String(s) => format!("string \"{}\"", s),
        TokenKind::Unknown(c) => format!("'{}'", c),
        TokenKind::Eof => "end of input".to_string(),
    }
}
