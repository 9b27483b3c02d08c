/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type and its top-level `parse()` entrypoint.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser` to keep all parser methods in a
///   single module.

/// Deepest nesting of brackets, unary operators and indented blocks a cell may use.
pub const MAX_NESTING: usize = 200;

/// Stack kept free before descending another level; below it parsing continues on a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

/// Result of parsing `[...]` postfix syntax: either a single index or a slice.
enum IndexOrSlice {
    Index(Spanned<Expr>),
    Slice(SliceExpr),
}

/// Parser state.
///
/// ## Notes
/// - The parser is single-pass and recovers from errors by synchronizing at the next
///   logical line, so one call reports every independent error in a cell.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<SyntaxError>,
    /// Current nesting level, bounded by [`MAX_NESTING`]
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream produced by `cellbook_syntax::lexer`.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Parse the entire token stream into a [`Program`].
    ///
    /// ## Errors
    /// Returns every [`SyntaxError`] found; the parser keeps going after an error.
    pub fn parse(mut self) -> Result<Program, Vec<SyntaxError>> {
        let mut statements = Vec::new();

        self.skip_newlines();
        while !self.is_at_end() {
            if self.check(&TokenKind::Indent) {
                self.errors.push(
                    SyntaxError::new("Unexpected indentation", self.current_span())
                        .with_hint("top-level statements in a cell start at column 1"),
                );
                self.skip_indented_region();
            } else if self.check(&TokenKind::Dedent) {
                // Left behind by recovery inside a block.
                self.advance();
            } else {
                match self.statement() {
                    Ok(stmt) => statements.push(stmt),
                    Err(e) => {
                        self.errors.push(e);
                        self.synchronize();
                    }
                }
            }
            self.skip_newlines();
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(self.errors)
        }
    }
}
