/// Miscellaneous parser utilities.
///
/// Identifier and dotted-path parsing, plus re-parsing of f-string replacement fields.
impl<'a> Parser<'a> {
    // ========================================================================
    // Utilities
    // ========================================================================

    fn identifier(&mut self) -> Result<Ident, SyntaxError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("Expected identifier")),
        }
    }

    /// `a.b.c` as a list of segments.
    fn dotted_name(&mut self) -> Result<Vec<Ident>, SyntaxError> {
        let mut segments = vec![self.identifier()?];
        while self.match_punct(PunctuationId::Dot) {
            segments.push(self.identifier()?);
        }
        Ok(segments)
    }
}

/// Lex and parse the source of an f-string replacement field as a single expression.
///
/// Returns `None` when the field is not exactly one well-formed expression.
fn parse_fstring_expr(source: &str) -> Option<Expr> {
    use crate::lexer;

    let tokens = lexer::lex(source.trim()).ok()?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.expression().ok()?;
    parser.skip_newlines();
    if parser.is_at_end() { Some(expr.node) } else { None }
}
