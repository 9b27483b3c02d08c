/// Statement parsing methods.
///
/// This chunk parses simple statements (assignment, import, return, ...) and compound
/// statements (`if`, `for`, `while`, `def`) with their indentation-based suites.
///
/// ## Notes
/// - Block parsing relies on `Indent` / `Dedent` layout tokens produced by the lexer.
/// - A suite may also be a single simple statement on the header line (`if x: y = 1`).
impl<'a> Parser<'a> {
    // ========================================================================
    // Blocks
    // ========================================================================

    fn block(&mut self) -> Result<Vec<Spanned<Statement>>, SyntaxError> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        Ok(stmts)
    }

    /// Parse the body after a compound-statement header's `:`.
    fn suite(&mut self, what: &str) -> Result<Vec<Spanned<Statement>>, SyntaxError> {
        self.expect_punct(PunctuationId::Colon, &format!("Expected ':' after {}", what))?;
        if self.match_token(&TokenKind::Newline) {
            self.skip_newlines();
            self.expect(&TokenKind::Indent, &format!("Expected indented block after {}", what))?;
            let body = self.nested(Self::block)?;
            self.expect(&TokenKind::Dedent, &format!("Expected dedent after {} body", what))?;
            Ok(body)
        } else {
            let stmt = self.simple_statement()?;
            Ok(vec![stmt])
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> Result<Spanned<Statement>, SyntaxError> {
        let start = self.current_span().start;

        let stmt = if self.check_keyword(KeywordId::If) {
            self.if_stmt()?
        } else if self.check_keyword(KeywordId::While) {
            self.while_stmt()?
        } else if self.check_keyword(KeywordId::For) {
            self.for_stmt()?
        } else if self.check_keyword(KeywordId::Def) {
            self.function_def()?
        } else {
            return self.simple_statement();
        };

        Ok(Spanned::new(stmt, Span::new(start, self.prev_end())))
    }

    /// Parse one simple statement including its line terminator.
    fn simple_statement(&mut self) -> Result<Spanned<Statement>, SyntaxError> {
        let start = self.current_span().start;

        let stmt = if self.match_keyword(KeywordId::Pass) {
            Statement::Pass
        } else if self.match_keyword(KeywordId::Break) {
            Statement::Break
        } else if self.match_keyword(KeywordId::Continue) {
            Statement::Continue
        } else if self.check_keyword(KeywordId::Return) {
            self.return_stmt()?
        } else if self.check_keyword(KeywordId::Import) {
            self.import_stmt()?
        } else if self.check_keyword(KeywordId::From) {
            self.from_import_stmt()?
        } else if self.check_keyword(KeywordId::Assert) {
            self.assert_stmt()?
        } else if self.check_keyword(KeywordId::Raise) {
            self.raise_stmt()?
        } else if self.check_keyword(KeywordId::Del) {
            self.del_stmt()?
        } else if self.check_keyword(KeywordId::Else) || self.check_keyword(KeywordId::Elif) {
            return Err(self.unexpected("'else'/'elif' without a matching 'if'"));
        } else {
            self.assignment_or_expr_stmt()?
        };

        let span = Span::new(start, self.prev_end());
        self.end_of_statement()?;
        Ok(Spanned::new(stmt, span))
    }

    fn return_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Return, "Expected 'return'")?;
        let expr = if self.is_at_expr_start() {
            Some(self.expression_list()?)
        } else {
            None
        };
        Ok(Statement::Return(expr))
    }

    fn if_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::If, "Expected 'if'")?;
        let condition = self.expression()?;
        let then_body = self.suite("if condition")?;

        let mut elif_branches = vec![];
        loop {
            self.skip_newlines();
            if !self.match_keyword(KeywordId::Elif) {
                break;
            }
            let elif_condition = self.expression()?;
            let elif_body = self.suite("elif condition")?;
            elif_branches.push((elif_condition, elif_body));
        }

        let else_body = if self.match_keyword(KeywordId::Else) {
            Some(self.suite("else")?)
        } else {
            None
        };

        Ok(Statement::If(IfStmt {
            condition,
            then_body,
            elif_branches,
            else_body,
        }))
    }

    fn while_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::While, "Expected 'while'")?;
        let condition = self.expression()?;
        let body = self.suite("while condition")?;
        Ok(Statement::While(WhileStmt { condition, body }))
    }

    fn for_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::For, "Expected 'for'")?;
        let target = self.target_list()?;
        self.expect_keyword(KeywordId::In, "Expected 'in' after for target")?;
        let iter = self.expression_list()?;
        let body = self.suite("for header")?;
        Ok(Statement::For(ForStmt { target, iter, body }))
    }

    fn function_def(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Def, "Expected 'def'")?;
        let name = self.identifier()?;
        self.expect_punct(PunctuationId::LParen, "Expected '(' after function name")?;
        let params = self.params()?;
        self.expect_punct(PunctuationId::RParen, "Expected ')' after parameters")?;

        // Return annotation is accepted and ignored.
        if self.match_punct(PunctuationId::Arrow) {
            self.expression()?;
        }

        let body = self.suite("function signature")?;
        Ok(Statement::FunctionDef(FunctionDef { name, params, body }))
    }

    fn params(&mut self) -> Result<Vec<Spanned<Param>>, SyntaxError> {
        let mut params: Vec<Spanned<Param>> = Vec::new();
        let mut keyword_only = false;
        let mut seen_default = false;

        self.skip_newlines();
        while !self.check_punct(PunctuationId::RParen) {
            let start = self.current_span().start;
            if self.match_op(OperatorId::Star) {
                if !self.check_punct(PunctuationId::Comma) {
                    return Err(SyntaxError::new("Variadic '*args' parameters are not supported", self.current_span())
                        .with_hint("use a bare '*' to mark keyword-only parameters"));
                }
                keyword_only = true;
            } else {
                let name = self.identifier()?;
                if params.iter().any(|p| p.node.name == name) {
                    return Err(SyntaxError::new(
                        format!("Duplicate parameter '{}'", name),
                        Span::new(start, self.prev_end()),
                    ));
                }
                if self.match_punct(PunctuationId::Colon) {
                    self.expression()?;
                }
                let default = if self.match_op(OperatorId::Eq) {
                    seen_default = true;
                    Some(self.expression()?)
                } else {
                    if seen_default && !keyword_only {
                        return Err(SyntaxError::new(
                            "Parameter without a default follows a parameter with a default",
                            Span::new(start, self.prev_end()),
                        ));
                    }
                    None
                };
                params.push(Spanned::new(
                    Param {
                        name,
                        default,
                        keyword_only,
                    },
                    Span::new(start, self.prev_end()),
                ));
            }

            self.skip_newlines();
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok(params)
    }

    /// `import a.b [as c], d`
    fn import_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Import, "Expected 'import'")?;
        let mut items = Vec::new();
        loop {
            let path = self.dotted_name()?;
            let alias = if self.match_keyword(KeywordId::As) {
                Some(self.identifier()?)
            } else {
                None
            };
            items.push(ImportItem { path, alias });
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(Statement::Import(items))
    }

    /// `from a.b import x [as y], ...` with optional surrounding parentheses.
    fn from_import_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::From, "Expected 'from'")?;
        let module = self.dotted_name()?;
        self.expect_keyword(KeywordId::Import, "Expected 'import' after module path")?;

        if self.check_op(OperatorId::Star) {
            return Err(SyntaxError::new("Wildcard imports are not supported", self.current_span())
                .with_hint("import the names you need explicitly"));
        }

        let parenthesized = self.match_punct(PunctuationId::LParen);
        let mut names = Vec::new();
        loop {
            if parenthesized && self.check_punct(PunctuationId::RParen) {
                break;
            }
            let name = self.identifier()?;
            let alias = if self.match_keyword(KeywordId::As) {
                Some(self.identifier()?)
            } else {
                None
            };
            names.push(ImportName { name, alias });
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        if parenthesized {
            self.expect_punct(PunctuationId::RParen, "Expected ')' after imported names")?;
        }
        if names.is_empty() {
            return Err(self.unexpected("Expected at least one imported name"));
        }

        Ok(Statement::FromImport(FromImportStmt { module, names }))
    }

    fn assert_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Assert, "Expected 'assert'")?;
        let condition = self.expression()?;
        let message = if self.match_punct(PunctuationId::Comma) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Statement::Assert(AssertStmt { condition, message }))
    }

    fn raise_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Raise, "Expected 'raise'")?;
        let exc = if self.is_at_expr_start() {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Statement::Raise(exc))
    }

    fn del_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(KeywordId::Del, "Expected 'del'")?;
        let mut targets = Vec::new();
        loop {
            let expr = self.postfix()?;
            targets.push(self.to_target(expr)?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(Statement::Del(targets))
    }

    /// Parse an expression statement, a (possibly chained or tuple) assignment, or an augmented assignment.
    fn assignment_or_expr_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let first = self.expression_list()?;

        if let Some(op) = self.augmented_op() {
            self.advance();
            let target = self.to_target(first)?;
            if matches!(target.node, Target::Tuple(_)) {
                return Err(SyntaxError::new(
                    "Augmented assignment to a tuple is not allowed",
                    target.span,
                ));
            }
            let value = self.expression_list()?;
            return Ok(Statement::AugAssign(AugAssignStmt { target, op, value }));
        }

        if !self.check_op(OperatorId::Eq) {
            return Ok(Statement::Expr(first));
        }

        // a = b = value: every expression but the last is a target.
        let mut exprs = vec![first];
        while self.match_op(OperatorId::Eq) {
            exprs.push(self.expression_list()?);
        }
        let value = exprs.pop().ok_or_else(|| self.unexpected("Expected value in assignment"))?;
        let targets = exprs
            .into_iter()
            .map(|e| self.to_target(e))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Statement::Assign(AssignStmt { targets, value }))
    }

    fn augmented_op(&self) -> Option<BinaryOp> {
        match self.peek().kind {
            TokenKind::Operator(OperatorId::PlusEq) => Some(BinaryOp::Add),
            TokenKind::Operator(OperatorId::MinusEq) => Some(BinaryOp::Sub),
            TokenKind::Operator(OperatorId::StarEq) => Some(BinaryOp::Mul),
            TokenKind::Operator(OperatorId::SlashEq) => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Parse `a`, `a, b`, `(a, b)`, `x.attr`, `x[i]` as a target list (for `for` headers and comprehensions).
    fn target_list(&mut self) -> Result<Spanned<Target>, SyntaxError> {
        let first = self.postfix()?;
        if !self.check_punct(PunctuationId::Comma) {
            return self.to_target(first);
        }

        let start = first.span.start;
        let mut targets = vec![self.to_target(first)?];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_keyword(KeywordId::In) {
                break;
            }
            let next = self.postfix()?;
            targets.push(self.to_target(next)?);
        }
        Ok(Spanned::new(Target::Tuple(targets), Span::new(start, self.prev_end())))
    }

    fn to_target(&self, expr: Spanned<Expr>) -> Result<Spanned<Target>, SyntaxError> {
        let span = expr.span;
        match expr.node.into_target() {
            Some(target) => Ok(Spanned::new(target, span)),
            None => Err(SyntaxError::new("Invalid assignment target", span)
                .with_note("only names, attributes, subscripts and tuples of those can be assigned")),
        }
    }
}
