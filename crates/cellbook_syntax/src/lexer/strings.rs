//! String scanning for the cell-language lexer
//!
//! Handles plain, raw (`r"..."`) and formatted (`f"..."`) strings, each in single- or triple-quoted form.

use super::Lexer;
use super::tokens::{FStringPart, Token, TokenKind};
use crate::ast::Span;
use crate::diagnostics::SyntaxError;

/// Result of processing an escape sequence
enum EscapeResult {
    Char(char),
    /// Unknown escape - preserve as-is (backslash + char)
    Unknown(char),
    Eof,
}

impl<'a> Lexer<'a> {
    /// Process a text escape sequence. Called after consuming the backslash.
    fn scan_text_escape(&mut self) -> EscapeResult {
        match self.advance() {
            Some('n') => EscapeResult::Char('\n'),
            Some('t') => EscapeResult::Char('\t'),
            Some('r') => EscapeResult::Char('\r'),
            Some('0') => EscapeResult::Char('\0'),
            Some('\\') => EscapeResult::Char('\\'),
            Some('\'') => EscapeResult::Char('\''),
            Some('"') => EscapeResult::Char('"'),
            Some('\n') => EscapeResult::Unknown('\n'),
            Some(c) => EscapeResult::Unknown(c),
            None => EscapeResult::Eof,
        }
    }

    /// Consume the second and third quote of a triple-quote opener, if present.
    fn open_triple(&mut self, quote: char) -> bool {
        if self.peek() == Some(quote) && self.peek_next() == Some(quote) {
            self.advance();
            self.advance();
            true
        } else {
            false
        }
    }

    /// Having just seen `quote`, decide whether it closes the literal. Consumes the closing quotes when it does;
    /// otherwise pushes the quotes consumed so far onto `buf`.
    fn close_quote(&mut self, quote: char, triple: bool, buf: &mut String) -> bool {
        self.advance();
        if !triple {
            return true;
        }
        if self.peek() == Some(quote) {
            self.advance();
            if self.peek() == Some(quote) {
                self.advance();
                return true;
            }
            buf.push(quote);
            buf.push(quote);
        } else {
            buf.push(quote);
        }
        false
    }

    pub(super) fn scan_string(&mut self, start: usize, quote: char, raw: bool) {
        let triple = self.open_triple(quote);
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    self.errors.push(SyntaxError::new(
                        "Unterminated string",
                        Span::new(start, self.current_pos),
                    ));
                    break;
                }
                Some(c) if c == quote => {
                    if self.close_quote(quote, triple, &mut value) {
                        break;
                    }
                }
                Some('\n') if !triple => {
                    self.errors.push(
                        SyntaxError::new(
                            "Unterminated string (newline in single-quoted string)",
                            Span::new(start, self.current_pos),
                        )
                        .with_hint("use a triple-quoted string for multi-line text"),
                    );
                    break;
                }
                Some('\\') if !raw => {
                    self.advance();
                    match self.scan_text_escape() {
                        EscapeResult::Char(c) => value.push(c),
                        // Backslash-newline joins lines
                        EscapeResult::Unknown('\n') => {}
                        EscapeResult::Unknown(c) => {
                            value.push('\\');
                            value.push(c);
                        }
                        EscapeResult::Eof => {
                            self.errors.push(SyntaxError::new(
                                "Unterminated escape sequence",
                                Span::new(start, self.current_pos),
                            ));
                            break;
                        }
                    }
                }
                Some('\\') => {
                    // Raw strings keep the backslash and the escaped quote verbatim
                    self.advance();
                    value.push('\\');
                    if let Some(c) = self.advance() {
                        value.push(c);
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.tokens.push(Token::new(
            TokenKind::String(value),
            Span::new(start, self.current_pos),
        ));
    }

    pub(super) fn scan_fstring(&mut self, start: usize, quote: char) {
        let triple = self.open_triple(quote);
        let mut parts = Vec::new();
        let mut literal = String::new();

        loop {
            match self.peek() {
                None => {
                    self.errors.push(SyntaxError::new(
                        "Unterminated f-string",
                        Span::new(start, self.current_pos),
                    ));
                    break;
                }
                Some(c) if c == quote => {
                    if self.close_quote(quote, triple, &mut literal) {
                        break;
                    }
                }
                Some('{') => {
                    self.advance();
                    if self.peek() == Some('{') {
                        self.advance();
                        literal.push('{');
                    } else {
                        if !literal.is_empty() {
                            parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                        }
                        let (source, format_spec) = self.scan_fstring_expr();
                        if source.trim().is_empty() {
                            self.errors.push(SyntaxError::new(
                                "Empty expression in f-string",
                                Span::new(start, self.current_pos),
                            ));
                        }
                        parts.push(FStringPart::Expr { source, format_spec });
                    }
                }
                Some('}') => {
                    self.advance();
                    if self.peek() == Some('}') {
                        self.advance();
                        literal.push('}');
                    } else {
                        self.errors.push(
                            SyntaxError::new("Unmatched '}' in f-string", Span::new(start, self.current_pos))
                                .with_hint("write '}}' for a literal brace"),
                        );
                    }
                }
                Some('\\') => {
                    self.advance();
                    match self.scan_text_escape() {
                        EscapeResult::Char(c) => literal.push(c),
                        EscapeResult::Unknown('\n') => {}
                        EscapeResult::Unknown(c) => {
                            literal.push('\\');
                            literal.push(c);
                        }
                        EscapeResult::Eof => {
                            self.errors.push(SyntaxError::new(
                                "Unterminated escape in f-string",
                                Span::new(start, self.current_pos),
                            ));
                            break;
                        }
                    }
                }
                Some('\n') if !triple => {
                    self.errors.push(SyntaxError::new(
                        "Unterminated f-string",
                        Span::new(start, self.current_pos),
                    ));
                    break;
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }

        if !literal.is_empty() {
            parts.push(FStringPart::Literal(literal));
        }

        self.tokens.push(Token::new(
            TokenKind::FString(parts),
            Span::new(start, self.current_pos),
        ));
    }

    /// Scan the inside of a `{...}` replacement field. Returns the expression source and the text after a
    /// top-level `:` (the format spec), if any.
    fn scan_fstring_expr(&mut self) -> (String, Option<String>) {
        let mut expr = String::new();
        let mut spec: Option<String> = None;
        // Already past the opening {
        let mut depth = 1;
        let mut in_string: Option<char> = None;

        while depth > 0 {
            let Some(c) = self.peek() else {
                break;
            };
            self.advance();

            let in_spec = spec.is_some();
            let buf = spec.as_mut().unwrap_or(&mut expr);
            if let Some(q) = in_string {
                buf.push(c);
                if c == q {
                    in_string = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => {
                    in_string = Some(c);
                    buf.push(c);
                }
                '{' | '(' | '[' => {
                    depth += 1;
                    buf.push(c);
                }
                ')' | ']' => {
                    depth -= 1;
                    buf.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth > 0 {
                        buf.push(c);
                    }
                }
                ':' if depth == 1 && !in_spec => spec = Some(String::new()),
                _ => buf.push(c),
            }
        }

        (expr, spec)
    }
}
