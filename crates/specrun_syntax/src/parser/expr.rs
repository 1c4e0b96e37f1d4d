// ========================================================================
// Expressions
// ========================================================================

impl<'a> Parser<'a> {
    fn expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.descend(|p| p.binary(0))
    }

    /// Precedence climbing over the operator registry. All binary operators are left-associative.
    fn binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.unary()?;

        while let Some(op_id) = self.peek().operator_id() {
            let Some(prec) = operators::binary_precedence(op_id) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let Some(op) = binary_op(op_id) else {
                break;
            };
            self.advance();

            let right = self.binary(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span();
        let op = if self.match_op(OperatorId::Minus) {
            Some(UnaryOp::Neg)
        } else if self.match_op(OperatorId::Bang) {
            Some(UnaryOp::Not)
        } else {
            None
        };

        match op {
            Some(op) => {
                let operand = self.descend(|p| p.unary())?;
                let span = start.merge(operand.span);
                Ok(Spanned::new(Expr::Unary(op, Box::new(operand)), span))
            }
            None => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_punct(PunctuationId::LParen) {
                let args = self.nested(|p| p.arguments())?;
                let trailing = self.trailing_block()?;
                let span = self.span_from(expr.span);
                expr = Spanned::new(
                    Expr::Call(CallExpr {
                        callee: Box::new(expr),
                        args,
                        trailing,
                    }),
                    span,
                );
            } else if self.match_punct(PunctuationId::LBracket) {
                let index = self.nested(|p| p.expression())?;
                self.expect_punct(PunctuationId::RBracket, "after index")?;
                let span = self.span_from(expr.span);
                expr = Spanned::new(Expr::Index(Box::new(expr), Box::new(index)), span);
            } else if self.match_punct(PunctuationId::Dot) {
                let field = self.identifier("after '.'")?;
                let span = expr.span.merge(field.span);
                expr = Spanned::new(Expr::Field(Box::new(expr), field), span);
            } else if matches!(expr.node, Expr::Ident(_)) && self.trailing_block_ahead() {
                // `name { ... }` is a zero-argument call with a trailing block.
                let trailing = self.trailing_block()?;
                let span = self.span_from(expr.span);
                expr = Spanned::new(
                    Expr::Call(CallExpr {
                        callee: Box::new(expr),
                        args: Vec::new(),
                        trailing,
                    }),
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span();

        let literal = match &self.peek().kind {
            TokenKind::Int(v) => Some(Literal::Int(*v)),
            TokenKind::Float(v) => Some(Literal::Float(*v)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::Keyword(KeywordId::True) => Some(Literal::Bool(true)),
            TokenKind::Keyword(KeywordId::False) => Some(Literal::Bool(false)),
            TokenKind::Keyword(KeywordId::Nil) => Some(Literal::Nil),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Spanned::new(Expr::Literal(literal), start));
        }

        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(Spanned::new(Expr::Ident(name), start));
        }

        if self.match_punct(PunctuationId::LParen) {
            let inner = self.nested(|p| p.expression())?;
            self.expect_punct(PunctuationId::RParen, "after expression")?;
            return Ok(Spanned::new(Expr::Paren(Box::new(inner)), self.span_from(start)));
        }

        if self.match_punct(PunctuationId::LBracket) {
            let items = self.nested(|p| p.list_items())?;
            return Ok(Spanned::new(Expr::List(items), self.span_from(start)));
        }

        if self.match_keyword(KeywordId::Fn) {
            let def = self.function_def(start, false)?;
            let span = def.span;
            return Ok(Spanned::new(Expr::Lambda(def), span));
        }

        Err(self.unexpected("Expected expression"))
    }

    /// Parse call arguments after `(`, consuming the closing `)`.
    fn arguments(&mut self) -> Result<Vec<Spanned<Expr>>, CompileError> {
        let mut args = Vec::new();
        while !self.check_punct(PunctuationId::RParen) {
            args.push(self.expression()?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen, "after arguments")?;
        Ok(args)
    }

    /// Parse list items after `[`, consuming the closing `]`.
    fn list_items(&mut self) -> Result<Vec<Spanned<Expr>>, CompileError> {
        let mut items = Vec::new();
        while !self.check_punct(PunctuationId::RBracket) {
            items.push(self.expression()?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RBracket, "after list items")?;
        Ok(items)
    }

    fn trailing_block_ahead(&self) -> bool {
        !self.no_trailing_block && self.check_punct(PunctuationId::LBrace)
    }

    fn trailing_block(&mut self) -> Result<Option<Arc<FunctionDef>>, CompileError> {
        if !self.trailing_block_ahead() {
            return Ok(None);
        }
        let start = self.current_span();
        let body = self.block()?;
        Ok(Some(Arc::new(FunctionDef {
            name: None,
            params: Vec::new(),
            body,
            span: self.span_from(start),
        })))
    }

    /// Run `f` with trailing blocks re-enabled; brackets delimit the expression even inside statement headers.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        let outer = std::mem::replace(&mut self.no_trailing_block, false);
        let result = f(self);
        self.no_trailing_block = outer;
        result
    }
}

fn binary_op(id: OperatorId) -> Option<BinaryOp> {
    Some(match id {
        OperatorId::Plus => BinaryOp::Add,
        OperatorId::Minus => BinaryOp::Sub,
        OperatorId::Star => BinaryOp::Mul,
        OperatorId::Slash => BinaryOp::Div,
        OperatorId::Percent => BinaryOp::Mod,
        OperatorId::EqEq => BinaryOp::Eq,
        OperatorId::NotEq => BinaryOp::NotEq,
        OperatorId::Lt => BinaryOp::Lt,
        OperatorId::LtEq => BinaryOp::LtEq,
        OperatorId::Gt => BinaryOp::Gt,
        OperatorId::GtEq => BinaryOp::GtEq,
        OperatorId::AndAnd => BinaryOp::And,
        OperatorId::OrOr => BinaryOp::Or,
        OperatorId::Bang | OperatorId::Eq => return None,
    })
}
