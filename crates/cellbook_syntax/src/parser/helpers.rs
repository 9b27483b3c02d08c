/// Token-stream helpers and error recovery.
///
/// This chunk contains the low-level primitives used throughout parsing:
/// - Peeking/consuming tokens (`peek`, `advance`)
/// - Matching / expecting keywords, operators, and punctuation
/// - Layout handling (`skip_newlines`, `end_of_statement`)
/// - Error recovery (`synchronize`)
impl<'a> Parser<'a> {
    // ========================================================================
    // Helpers
    // ========================================================================

    /// Return `true` if the current token is [`TokenKind::Eof`].
    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    /// Return the current token without consuming it.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Return the token after the current token without consuming it.
    fn peek_next(&self) -> &Token {
        if self.pos + 1 < self.tokens.len() {
            &self.tokens[self.pos + 1]
        } else {
            &self.tokens[self.tokens.len() - 1]
        }
    }

    /// Advance to the next token and return the token we just consumed.
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// Return `true` if the current token “matches” `kind`.
    ///
    /// ## Notes
    /// - For ID-carrying tokens (keywords/operators/punctuation), the IDs must match.
    /// - For data-bearing tokens (identifiers/literals), only the variant is compared.
    fn check(&self, kind: &TokenKind) -> bool {
        match (kind, &self.peek().kind) {
            (TokenKind::Keyword(k1), TokenKind::Keyword(k2)) => k1 == k2,
            (TokenKind::Operator(o1), TokenKind::Operator(o2)) => o1 == o2,
            (TokenKind::Punctuation(p1), TokenKind::Punctuation(p2)) => p1 == p2,
            _ => std::mem::discriminant(kind) == std::mem::discriminant(&self.peek().kind),
        }
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

    /// Consume the current token when `hit` is set; returns `hit`.
    fn consume_if(&mut self, hit: bool) -> bool {
        if hit {
            self.advance();
        }
        hit
    }

    /// If the current token matches `kind`, consume it and return `true`.
    fn match_token(&mut self, kind: &TokenKind) -> bool {
        let hit = self.check(kind);
        self.consume_if(hit)
    }

    fn match_keyword(&mut self, id: KeywordId) -> bool {
        let hit = self.check_keyword(id);
        self.consume_if(hit)
    }

    fn match_punct(&mut self, id: PunctuationId) -> bool {
        let hit = self.check_punct(id);
        self.consume_if(hit)
    }

    fn match_op(&mut self, id: OperatorId) -> bool {
        let hit = self.check_op(id);
        self.consume_if(hit)
    }

    fn unexpected(&self, msg: &str) -> SyntaxError {
        SyntaxError::new(
            format!("{}, found {}", msg, self.peek().kind.describe()),
            self.current_span(),
        )
    }

    /// Consume the current token when `hit` is set, otherwise report `msg`.
    fn consume_or(&mut self, hit: bool, msg: &str) -> Result<&Token, SyntaxError> {
        if !hit {
            return Err(self.unexpected(msg));
        }
        Ok(self.advance())
    }

    fn expect(&mut self, kind: &TokenKind, msg: &str) -> Result<&Token, SyntaxError> {
        let hit = self.check(kind);
        self.consume_or(hit, msg)
    }

    fn expect_keyword(&mut self, id: KeywordId, msg: &str) -> Result<&Token, SyntaxError> {
        let hit = self.check_keyword(id);
        self.consume_or(hit, msg)
    }

    fn expect_punct(&mut self, id: PunctuationId, msg: &str) -> Result<&Token, SyntaxError> {
        let hit = self.check_punct(id);
        self.consume_or(hit, msg)
    }

    fn skip_newlines(&mut self) {
        while self.match_token(&TokenKind::Newline) {}
    }

    /// Consume the terminator of a simple statement.
    fn end_of_statement(&mut self) -> Result<(), SyntaxError> {
        if self.match_token(&TokenKind::Newline) || self.check(&TokenKind::Dedent) || self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected("Expected end of line after statement"))
        }
    }

    /// Skip to the start of the next logical line.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if matches!(self.peek().kind, TokenKind::Newline) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Skip an unexpected INDENT and everything up to its matching DEDENT.
    fn skip_indented_region(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Parse one nesting level deeper, rejecting input nested past [`MAX_NESTING`].
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(
                SyntaxError::new("too many nested parentheses, operators or blocks", self.current_span())
                    .with_hint(format!("cells may nest at most {MAX_NESTING} levels deep")),
            );
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || parse(self));
        self.depth -= 1;
        result
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    /// End offset of the most recently consumed token.
    fn prev_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    /// Check if the current token can start an expression
    fn is_at_expr_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::String(_) | TokenKind::FString(_)
        ) || self.check_keyword(KeywordId::True)
            || self.check_keyword(KeywordId::False)
            || self.check_keyword(KeywordId::None)
            || self.check_keyword(KeywordId::Not)
            || self.check_punct(PunctuationId::LParen)
            || self.check_punct(PunctuationId::LBracket)
            || self.check_punct(PunctuationId::LBrace)
            || self.check_op(OperatorId::Minus)
    }
}
