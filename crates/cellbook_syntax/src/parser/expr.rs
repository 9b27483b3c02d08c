/// Expression parsing methods.
///
/// This chunk implements the expression grammar using a precedence ladder:
/// conditional → `or` → `and` → `not` → comparison → additive → multiplicative → unary → power → postfix → primary.
///
/// ## Notes
/// - Operator identities are carried by [`TokenKind::Operator`] / [`OperatorId`] rather than string spellings.
/// - Unary minus binds looser than `**` (`-2 ** 2 == -4`).
impl<'a> Parser<'a> {
    // ========================================================================
    // Expressions
    // ========================================================================

    /// A single expression, including the conditional form `a if c else b`.
    fn expression(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let then = self.or_expr()?;
        if !self.check_keyword(KeywordId::If) {
            return Ok(then);
        }
        self.advance();
        let condition = self.or_expr()?;
        self.expect_keyword(KeywordId::Else, "Expected 'else' in conditional expression")?;
        let otherwise = self.expression()?;
        let span = then.span.merge(otherwise.span);
        Ok(Spanned::new(
            Expr::Conditional(Box::new(ConditionalExpr {
                then,
                condition,
                otherwise,
            })),
            span,
        ))
    }

    /// One or more comma-separated expressions; two or more form an unparenthesized tuple.
    fn expression_list(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let first = self.expression()?;
        if !self.check_punct(PunctuationId::Comma) {
            return Ok(first);
        }

        let start = first.span.start;
        let mut elements = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if !self.is_at_expr_start() {
                break;
            }
            elements.push(self.expression()?);
        }
        Ok(Spanned::new(Expr::Tuple(elements), Span::new(start, self.prev_end())))
    }

    fn or_expr(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut left = self.and_expr()?;
        while self.match_keyword(KeywordId::Or) {
            let right = self.and_expr()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right)), span);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut left = self.not_expr()?;
        while self.match_keyword(KeywordId::And) {
            let right = self.not_expr()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right)), span);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        if self.match_keyword(KeywordId::Not) {
            let start = self.tokens[self.pos - 1].span.start;
            let expr = self.nested(Self::not_expr)?;
            let span = Span::new(start, expr.span.end);
            Ok(Spanned::new(Expr::Unary(UnaryOp::Not, Box::new(expr)), span))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut left = self.additive()?;

        loop {
            let op = if self.match_op(OperatorId::EqEq) {
                BinaryOp::Eq
            } else if self.match_op(OperatorId::NotEq) {
                BinaryOp::NotEq
            } else if self.match_op(OperatorId::LtEq) {
                BinaryOp::LtEq
            } else if self.match_op(OperatorId::GtEq) {
                BinaryOp::GtEq
            } else if self.match_op(OperatorId::Lt) {
                BinaryOp::Lt
            } else if self.match_op(OperatorId::Gt) {
                BinaryOp::Gt
            } else if self.match_keyword(KeywordId::In) {
                BinaryOp::In
            } else if self.check_keyword(KeywordId::Not) && self.peek_next().kind.is_keyword(KeywordId::In) {
                self.advance(); // not
                self.advance(); // in
                BinaryOp::NotIn
            } else if self.match_keyword(KeywordId::Is) {
                if self.match_keyword(KeywordId::Not) {
                    BinaryOp::IsNot
                } else {
                    BinaryOp::Is
                }
            } else {
                break;
            };

            let right = self.additive()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span);
        }

        Ok(left)
    }

    fn additive(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut left = self.multiplicative()?;

        loop {
            let op = if self.match_op(OperatorId::Plus) {
                BinaryOp::Add
            } else if self.match_op(OperatorId::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.multiplicative()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span);
        }

        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut left = self.unary()?;

        loop {
            let op = if self.match_op(OperatorId::Star) {
                BinaryOp::Mul
            } else if self.match_op(OperatorId::SlashSlash) {
                BinaryOp::FloorDiv
            } else if self.match_op(OperatorId::Slash) {
                BinaryOp::Div
            } else if self.match_op(OperatorId::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };

            let right = self.unary()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        if self.match_op(OperatorId::Minus) {
            let start = self.tokens[self.pos - 1].span.start;
            let expr = self.nested(Self::unary)?;
            let span = Span::new(start, expr.span.end);
            Ok(Spanned::new(Expr::Unary(UnaryOp::Neg, Box::new(expr)), span))
        } else if self.match_op(OperatorId::Plus) {
            self.nested(Self::unary)
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let left = self.postfix()?;

        // Right-associative: 2**3**2 = 2**(3**2)
        if self.match_op(OperatorId::StarStar) {
            let right = self.nested(Self::unary)?;
            let span = left.span.merge(right.span);
            return Ok(Spanned::new(
                Expr::Binary(Box::new(left), BinaryOp::Pow, Box::new(right)),
                span,
            ));
        }

        Ok(left)
    }

    fn postfix(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_punct(PunctuationId::Dot) {
                let name = self.identifier()?;
                if self.match_punct(PunctuationId::LParen) {
                    let args = self.call_args()?;
                    self.expect_punct(PunctuationId::RParen, "Expected ')' after arguments")?;
                    let span = Span::new(expr.span.start, self.prev_end());
                    expr = Spanned::new(Expr::MethodCall(Box::new(expr), name, args), span);
                } else {
                    let span = Span::new(expr.span.start, self.prev_end());
                    expr = Spanned::new(Expr::Attribute(Box::new(expr), name), span);
                }
            } else if self.match_punct(PunctuationId::LBracket) {
                let result = self.index_or_slice()?;
                self.expect_punct(PunctuationId::RBracket, "Expected ']' after index/slice")?;
                let span = Span::new(expr.span.start, self.prev_end());
                expr = match result {
                    IndexOrSlice::Index(index) => Spanned::new(Expr::Index(Box::new(expr), Box::new(index)), span),
                    IndexOrSlice::Slice(slice) => Spanned::new(Expr::Slice(Box::new(expr), slice), span),
                };
            } else if self.match_punct(PunctuationId::LParen) {
                let args = self.call_args()?;
                self.expect_punct(PunctuationId::RParen, "Expected ')' after arguments")?;
                let span = Span::new(expr.span.start, self.prev_end());
                expr = Spanned::new(Expr::Call(Box::new(expr), args), span);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse index or slice expression inside brackets
    /// Handles: [expr], [a, b], [start:end], [start:end:step], [:end], [start:], [::step]
    fn index_or_slice(&mut self) -> Result<IndexOrSlice, SyntaxError> {
        if self.check_punct(PunctuationId::Colon) {
            return self.parse_slice(None);
        }

        if self.check_punct(PunctuationId::RBracket) {
            return Err(SyntaxError::new("Empty index is not allowed", self.current_span()));
        }

        let first = self.expression_list()?;

        if self.check_punct(PunctuationId::Colon) {
            return self.parse_slice(Some(first));
        }

        Ok(IndexOrSlice::Index(first))
    }

    /// Parse slice syntax after optional start expression
    fn parse_slice(&mut self, start: Option<Spanned<Expr>>) -> Result<IndexOrSlice, SyntaxError> {
        self.expect_punct(PunctuationId::Colon, "Expected ':' in slice")?;

        let end = if !self.check_punct(PunctuationId::RBracket) && !self.check_punct(PunctuationId::Colon) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        let step = if self.match_punct(PunctuationId::Colon) && !self.check_punct(PunctuationId::RBracket) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        Ok(IndexOrSlice::Slice(SliceExpr {
            start: start.map(Box::new),
            end,
            step,
        }))
    }

    fn primary(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let start = self.current_span().start;

        // Adjacent string literals concatenate: "a" "b" == "ab"
        if let TokenKind::String(_) = &self.peek().kind {
            let mut value = String::new();
            while let TokenKind::String(s) = &self.peek().kind {
                value.push_str(s);
                self.advance();
            }
            return Ok(Spanned::new(
                Expr::Literal(Literal::String(value)),
                Span::new(start, self.prev_end()),
            ));
        }

        if let Some(lit) = self.try_literal() {
            return Ok(Spanned::new(Expr::Literal(lit), Span::new(start, self.prev_end())));
        }

        if let TokenKind::FString(parts) = &self.peek().kind {
            let parts = parts.clone();
            let fstring_span = self.peek().span;
            self.advance();
            let fparts = self.convert_fstring_parts(&parts, fstring_span)?;
            return Ok(Spanned::new(Expr::FString(fparts), Span::new(start, self.prev_end())));
        }

        if self.match_punct(PunctuationId::LBracket) {
            return self.list_or_comp(start);
        }

        if self.match_punct(PunctuationId::LBrace) {
            return self.dict_or_comp(start);
        }

        if self.match_punct(PunctuationId::LParen) {
            return self.paren_or_tuple(start);
        }

        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(Spanned::new(Expr::Ident(name), Span::new(start, self.prev_end())));
        }

        Err(self.unexpected("Expected expression"))
    }

    fn try_literal(&mut self) -> Option<Literal> {
        let lit = match &self.peek().kind {
            TokenKind::Int(n) => Literal::Int(*n),
            TokenKind::Float(f) => Literal::Float(*f),
            TokenKind::Keyword(KeywordId::True) => Literal::Bool(true),
            TokenKind::Keyword(KeywordId::False) => Literal::Bool(false),
            TokenKind::Keyword(KeywordId::None) => Literal::None,
            _ => return None,
        };
        self.advance();
        Some(lit)
    }

    fn convert_fstring_parts(
        &self,
        parts: &[LexFStringPart],
        fstring_span: Span,
    ) -> Result<Vec<FStringPart>, SyntaxError> {
        parts
            .iter()
            .map(|p| match p {
                LexFStringPart::Literal(s) => Ok(FStringPart::Literal(s.clone())),
                LexFStringPart::Expr { source, format_spec } => {
                    // Errors point at the whole f-string; inner offsets are relative to the field.
                    let expr = parse_fstring_expr(source).ok_or_else(|| {
                        SyntaxError::new(
                            format!("Invalid expression in f-string: '{}'", source.trim()),
                            fstring_span,
                        )
                    })?;
                    Ok(FStringPart::Expr {
                        expr: Spanned::new(expr, fstring_span),
                        format_spec: format_spec.clone(),
                    })
                }
            })
            .collect()
    }

    fn list_or_comp(&mut self, start: usize) -> Result<Spanned<Expr>, SyntaxError> {
        if self.match_punct(PunctuationId::RBracket) {
            return Ok(Spanned::new(Expr::List(Vec::new()), Span::new(start, self.prev_end())));
        }

        let first = self.expression()?;

        if self.check_keyword(KeywordId::For) {
            let comp = self.list_comp_tail(first)?;
            self.expect_punct(PunctuationId::RBracket, "Expected ']' after comprehension")?;
            return Ok(Spanned::new(
                Expr::ListComp(Box::new(comp)),
                Span::new(start, self.prev_end()),
            ));
        }

        let mut elements = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBracket) {
                break;
            }
            elements.push(self.expression()?);
        }
        self.expect_punct(PunctuationId::RBracket, "Expected ']' after list")?;
        Ok(Spanned::new(Expr::List(elements), Span::new(start, self.prev_end())))
    }

    /// Parse `for target in iter [if filter]` after a comprehension's element expression.
    fn list_comp_tail(&mut self, expr: Spanned<Expr>) -> Result<ListComp, SyntaxError> {
        let (target, iter, filter) = self.comprehension_clause()?;
        Ok(ListComp {
            expr,
            target,
            iter,
            filter,
        })
    }

    fn comprehension_clause(
        &mut self,
    ) -> Result<(Spanned<Target>, Spanned<Expr>, Option<Spanned<Expr>>), SyntaxError> {
        self.expect_keyword(KeywordId::For, "Expected 'for' in comprehension")?;
        let target = self.target_list()?;
        self.expect_keyword(KeywordId::In, "Expected 'in' in comprehension")?;
        let iter = self.or_expr()?;
        let filter = if self.match_keyword(KeywordId::If) {
            Some(self.or_expr()?)
        } else {
            None
        };
        if self.check_keyword(KeywordId::For) {
            return Err(SyntaxError::new(
                "Nested comprehension clauses are not supported",
                self.current_span(),
            ));
        }
        Ok((target, iter, filter))
    }

    fn dict_or_comp(&mut self, start: usize) -> Result<Spanned<Expr>, SyntaxError> {
        if self.match_punct(PunctuationId::RBrace) {
            return Ok(Spanned::new(Expr::Dict(Vec::new()), Span::new(start, self.prev_end())));
        }

        let first = self.expression()?;

        if !self.match_punct(PunctuationId::Colon) {
            // Set literal: {expr, expr, ...}
            let mut elements = vec![first];
            while self.match_punct(PunctuationId::Comma) {
                if self.check_punct(PunctuationId::RBrace) {
                    break;
                }
                elements.push(self.expression()?);
            }
            self.expect_punct(PunctuationId::RBrace, "Expected '}' after set")?;
            return Ok(Spanned::new(Expr::Set(elements), Span::new(start, self.prev_end())));
        }

        let first_value = self.expression()?;

        if self.check_keyword(KeywordId::For) {
            let (target, iter, filter) = self.comprehension_clause()?;
            self.expect_punct(PunctuationId::RBrace, "Expected '}' after comprehension")?;
            return Ok(Spanned::new(
                Expr::DictComp(Box::new(DictComp {
                    key: first,
                    value: first_value,
                    target,
                    iter,
                    filter,
                })),
                Span::new(start, self.prev_end()),
            ));
        }

        let mut entries = vec![(first, first_value)];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBrace) {
                break;
            }
            let key = self.expression()?;
            self.expect_punct(PunctuationId::Colon, "Expected ':' in dict entry")?;
            let value = self.expression()?;
            entries.push((key, value));
        }
        self.expect_punct(PunctuationId::RBrace, "Expected '}' after dict")?;
        Ok(Spanned::new(Expr::Dict(entries), Span::new(start, self.prev_end())))
    }

    fn paren_or_tuple(&mut self, start: usize) -> Result<Spanned<Expr>, SyntaxError> {
        if self.match_punct(PunctuationId::RParen) {
            return Ok(Spanned::new(Expr::Tuple(Vec::new()), Span::new(start, self.prev_end())));
        }

        let first = self.expression()?;

        // Generator expressions are evaluated eagerly, like a list comprehension.
        if self.check_keyword(KeywordId::For) {
            let comp = self.list_comp_tail(first)?;
            self.expect_punct(PunctuationId::RParen, "Expected ')' after generator expression")?;
            return Ok(Spanned::new(
                Expr::ListComp(Box::new(comp)),
                Span::new(start, self.prev_end()),
            ));
        }

        if self.match_punct(PunctuationId::Comma) {
            let mut elements = vec![first];
            while !self.check_punct(PunctuationId::RParen) {
                elements.push(self.expression()?);
                if !self.match_punct(PunctuationId::Comma) {
                    break;
                }
            }
            self.expect_punct(PunctuationId::RParen, "Expected ')' after tuple")?;
            return Ok(Spanned::new(Expr::Tuple(elements), Span::new(start, self.prev_end())));
        }

        self.expect_punct(PunctuationId::RParen, "Expected ')'")?;
        Ok(Spanned::new(Expr::Paren(Box::new(first)), Span::new(start, self.prev_end())))
    }

    fn call_args(&mut self) -> Result<Vec<CallArg>, SyntaxError> {
        let mut args = Vec::new();
        let mut seen_named = false;

        while !self.check_punct(PunctuationId::RParen) {
            if self.check_op(OperatorId::Star) || self.check_op(OperatorId::StarStar) {
                return Err(SyntaxError::new("Argument unpacking is not supported", self.current_span()));
            }

            // Named argument: ident '=' expr
            if let TokenKind::Ident(name) = &self.peek().kind {
                if self.peek_next().kind.is_operator(OperatorId::Eq) {
                    let name = name.clone();
                    if args.iter().any(|a| matches!(a, CallArg::Named(n, _) if *n == name)) {
                        return Err(SyntaxError::new(
                            format!("Keyword argument '{}' repeated", name),
                            self.current_span(),
                        ));
                    }
                    self.advance(); // name
                    self.advance(); // =
                    let value = self.expression()?;
                    args.push(CallArg::Named(name, value));
                    seen_named = true;
                    if !self.match_punct(PunctuationId::Comma) {
                        break;
                    }
                    continue;
                }
            }

            let expr = self.expression()?;
            if seen_named {
                return Err(SyntaxError::new(
                    "Positional argument follows keyword argument",
                    expr.span,
                ));
            }
            // Bare generator argument: f(x for x in xs)
            if self.check_keyword(KeywordId::For) {
                let start = expr.span.start;
                let comp = self.list_comp_tail(expr)?;
                let span = Span::new(start, self.prev_end());
                args.push(CallArg::Positional(Spanned::new(Expr::ListComp(Box::new(comp)), span)));
                break;
            }
            args.push(CallArg::Positional(expr));
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(args)
    }
}
