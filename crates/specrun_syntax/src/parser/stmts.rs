// ========================================================================
// Statements
// ========================================================================

impl<'a> Parser<'a> {
    fn statement(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.current_span();

        let stmt = match self.peek().keyword_id() {
            Some(KeywordId::Let) => {
                self.advance();
                Stmt::Let(self.let_stmt()?)
            }
            Some(KeywordId::Fn) if matches!(self.peek_next().map(|t| &t.kind), Some(TokenKind::Ident(_))) => {
                self.advance();
                Stmt::Fn(self.function_def(start, true)?)
            }
            Some(KeywordId::If) => {
                self.advance();
                Stmt::If(self.if_stmt()?)
            }
            Some(KeywordId::While) => {
                self.advance();
                let condition = self.header_expression()?;
                let body = self.block()?;
                Stmt::While(WhileStmt { condition, body })
            }
            Some(KeywordId::For) => {
                self.advance();
                let binding = self.identifier("after 'for'")?;
                if !self.match_keyword(KeywordId::In) {
                    return Err(self.unexpected("Expected 'in' after loop variable"));
                }
                let iterable = self.header_expression()?;
                let body = self.block()?;
                Stmt::For(ForStmt { binding, iterable, body })
            }
            Some(KeywordId::Return) => {
                self.advance();
                let value = if self.at_statement_end() { None } else { Some(self.expression()?) };
                Stmt::Return(value)
            }
            Some(KeywordId::Throw) => {
                self.advance();
                Stmt::Throw(self.expression()?)
            }
            Some(KeywordId::Break) => {
                self.advance();
                Stmt::Break
            }
            Some(KeywordId::Continue) => {
                self.advance();
                Stmt::Continue
            }
            _ => {
                let expr = self.expression()?;
                if self.match_op(OperatorId::Eq) {
                    if !matches!(expr.node, Expr::Ident(_) | Expr::Index(..)) {
                        return Err(CompileError::syntax("Invalid assignment target".to_string(), expr.span)
                            .with_hint("Only variables and list elements can be assigned"));
                    }
                    let value = self.expression()?;
                    Stmt::Assign(AssignStmt { target: expr, value })
                } else {
                    Stmt::Expr(expr)
                }
            }
        };

        self.match_punct(PunctuationId::Semicolon);
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn let_stmt(&mut self) -> Result<LetStmt, CompileError> {
        let name = self.identifier("after 'let'")?;
        let value = if self.match_op(OperatorId::Eq) { Some(self.expression()?) } else { None };
        Ok(LetStmt { name, value })
    }

    fn if_stmt(&mut self) -> Result<IfStmt, CompileError> {
        let condition = self.header_expression()?;
        let then_block = self.block()?;

        let else_branch = if self.match_keyword(KeywordId::Else) {
            if self.check_keyword(KeywordId::If) {
                let start = self.current_span();
                self.advance();
                let nested = self.descend(|p| p.if_stmt())?;
                Some(ElseBranch::If(Box::new(Spanned::new(nested, self.span_from(start)))))
            } else {
                Some(ElseBranch::Block(self.block()?))
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_block,
            else_branch,
        })
    }

    /// Parse a `fn` definition after the `fn` keyword.
    ///
    /// `named` selects between a declaration (`fn name(...) {}`) and an anonymous function (`fn(...) {}`).
    fn function_def(&mut self, start: Span, named: bool) -> Result<Arc<FunctionDef>, CompileError> {
        let name = if named { Some(self.identifier("after 'fn'")?.node) } else { None };

        self.expect_punct(PunctuationId::LParen, "before parameter list")?;
        let mut params = Vec::new();
        if !self.check_punct(PunctuationId::RParen) {
            loop {
                params.push(self.identifier("in parameter list")?);
                if !self.match_punct(PunctuationId::Comma) || self.check_punct(PunctuationId::RParen) {
                    break;
                }
            }
        }
        self.expect_punct(PunctuationId::RParen, "after parameters")?;

        let body = self.block()?;
        Ok(Arc::new(FunctionDef {
            name,
            params,
            body,
            span: self.span_from(start),
        }))
    }

    /// Parse a `{ ... }` block, recovering from errors inside it.
    fn block(&mut self) -> Result<Block, CompileError> {
        self.descend(|p| p.block_body())
    }

    fn block_body(&mut self) -> Result<Block, CompileError> {
        let start = self.expect_punct(PunctuationId::LBrace, "to open block")?;
        let outer_header = std::mem::replace(&mut self.no_trailing_block, false);

        let mut statements = Vec::new();
        while !self.check_punct(PunctuationId::RBrace) && !self.is_at_end() {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize(true);
                }
            }
        }

        self.no_trailing_block = outer_header;
        self.expect_punct(PunctuationId::RBrace, "to close block")?;
        Ok(Block {
            statements,
            span: self.span_from(start),
        })
    }

    /// Parse the condition or iterable of `if`/`while`/`for`, where `{` starts the body.
    fn header_expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let outer = std::mem::replace(&mut self.no_trailing_block, true);
        let expr = self.expression();
        self.no_trailing_block = outer;
        expr
    }

    fn at_statement_end(&self) -> bool {
        self.is_at_end()
            || self.check_punct(PunctuationId::Semicolon)
            || self.check_punct(PunctuationId::RBrace)
    }
}
