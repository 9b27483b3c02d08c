//! Lexer for the cell language
//!
//! Handles tokenization including:
//! - Keywords and identifiers
//! - Literals (int, float, string, raw string, f-string)
//! - Operators and punctuation
//! - Indentation-based blocks (INDENT/DEDENT tokens)
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token, FStringPart)
//! - `strings` - String/f-string scanning
//! - `numbers` - Numeric literal scanning
//! - `indent` - INDENT/DEDENT handling

mod indent;
mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{FStringPart, Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::SyntaxError;
use cellbook_core::lang::operators::OperatorId;
use cellbook_core::lang::punctuation::PunctuationId;

// ============================================================================
// LEXER STATE
// ----------------------------------------------------------------------------
// [Start of line] → count spaces → [Inside code]
//                                       ↓
//                                      see '(' → [bracket_depth++]
//                                       ↓
//                                      see '\n' → skip (inside brackets)
//                                       ↓
//                                      see ')' → [bracket_depth--]
// ============================================================================

/// Lexer for cell source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    indent_stack: Vec<usize>,
    pending_dedents: usize,
    at_line_start: bool,
    /// Bracket depth for implicit line continuation (parens, brackets, braces)
    bracket_depth: usize,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source code.
    ///
    /// The token stream always ends with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<SyntaxError>> {
        while !self.is_at_end() {
            self.scan_token();
        }

        if self.bracket_depth > 0 {
            self.errors.push(
                SyntaxError::new("Unclosed bracket at end of input", Span::new(self.current_pos, self.current_pos))
                    .with_hint("every '(', '[' and '{' needs a matching closing bracket"),
            );
        }

        // Close the last logical line so the parser sees a statement terminator.
        if !matches!(self.tokens.last().map(|t| &t.kind), None | Some(TokenKind::Newline)) {
            self.tokens.push(Token::new(
                TokenKind::Newline,
                Span::new(self.current_pos, self.current_pos),
            ));
        }

        // Emit remaining dedents at EOF
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Token::new(
                TokenKind::Dedent,
                Span::new(self.current_pos, self.current_pos),
            ));
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos),
        ));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none() && self.pending_dedents == 0
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            self.tokens.push(Token::new(
                TokenKind::Dedent,
                Span::new(self.current_pos, self.current_pos),
            ));
            return;
        }

        if self.at_line_start && self.bracket_depth == 0 {
            self.handle_indentation();
            return;
        }

        // Skip whitespace (but not newlines)
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' {
                self.advance();
            } else {
                break;
            }
        }

        let start = self.current_pos;

        let Some(c) = self.advance() else {
            return;
        };

        match c {
            '#' => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            }

            '\n' => {
                if self.bracket_depth > 0 {
                    return;
                }
                if !self.at_line_start {
                    self.tokens
                        .push(Token::new(TokenKind::Newline, Span::new(start, self.current_pos)));
                }
                self.at_line_start = true;
            }

            '\r' => {}

            // Explicit line continuation.
            '\\' if matches!(self.peek(), Some('\n') | Some('\r')) => {
                if self.peek() == Some('\r') {
                    self.advance();
                }
                self.advance();
            }

            '+' => self.operator(start, OperatorId::Plus, &[('=', OperatorId::PlusEq)]),
            '-' => {
                if self.match_char('>') {
                    self.add_punct(PunctuationId::Arrow, start);
                } else if self.match_char('=') {
                    self.add_op(OperatorId::MinusEq, start);
                } else {
                    self.add_op(OperatorId::Minus, start);
                }
            }
            '*' => self.operator(
                start,
                OperatorId::Star,
                &[('*', OperatorId::StarStar), ('=', OperatorId::StarEq)],
            ),
            '/' => {
                if self.match_char('/') {
                    self.add_op(OperatorId::SlashSlash, start);
                } else if self.match_char('=') {
                    self.add_op(OperatorId::SlashEq, start);
                } else {
                    self.add_op(OperatorId::Slash, start);
                }
            }
            '%' => self.add_op(OperatorId::Percent, start),
            ',' => self.add_punct(PunctuationId::Comma, start),
            ':' => self.add_punct(PunctuationId::Colon, start),
            '(' => self.open_bracket(PunctuationId::LParen, start),
            ')' => self.close_bracket(PunctuationId::RParen, start),
            '[' => self.open_bracket(PunctuationId::LBracket, start),
            ']' => self.close_bracket(PunctuationId::RBracket, start),
            '{' => self.open_bracket(PunctuationId::LBrace, start),
            '}' => self.close_bracket(PunctuationId::RBrace, start),
            '=' => self.operator(start, OperatorId::Eq, &[('=', OperatorId::EqEq)]),
            '!' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::NotEq, start);
                } else {
                    self.errors.push(
                        SyntaxError::new("Unexpected character '!'", Span::new(start, self.current_pos))
                            .with_hint("use 'not' for boolean negation"),
                    );
                }
            }
            '<' => self.operator(start, OperatorId::Lt, &[('=', OperatorId::LtEq)]),
            '>' => self.operator(start, OperatorId::Gt, &[('=', OperatorId::GtEq)]),
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number(start, '.');
                } else {
                    self.add_punct(PunctuationId::Dot, start);
                }
            }

            '"' | '\'' => self.scan_string(start, c, false),

            // Prefixed strings: f"...", r"..."
            'f' | 'F' if matches!(self.peek(), Some('"') | Some('\'')) => {
                if let Some(quote) = self.advance() {
                    self.scan_fstring(start, quote);
                }
            }
            'r' | 'R' if matches!(self.peek(), Some('"') | Some('\'')) => {
                if let Some(quote) = self.advance() {
                    self.scan_string(start, quote, true);
                }
            }

            '0'..='9' => self.scan_number(start, c),

            _ if is_ident_start(c) => self.scan_identifier(start),

            _ => {
                self.errors.push(SyntaxError::new(
                    format!("Unexpected character '{}'", c),
                    Span::new(start, self.current_pos),
                ));
            }
        }
    }

    // ========================================================================
    // Operator helpers
    // ========================================================================

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn add_op(&mut self, id: OperatorId, start: usize) {
        self.add_token(TokenKind::Operator(id), start);
    }

    fn add_punct(&mut self, id: PunctuationId, start: usize) {
        self.add_token(TokenKind::Punctuation(id), start);
    }

    /// Try to match compound operator, fallback to simple.
    fn operator(&mut self, start: usize, simple: OperatorId, compounds: &[(char, OperatorId)]) {
        for (c, id) in compounds {
            if self.match_char(*c) {
                self.add_op(*id, start);
                return;
            }
        }
        self.add_op(simple, start);
    }

    fn open_bracket(&mut self, kind: PunctuationId, start: usize) {
        self.bracket_depth += 1;
        self.add_punct(kind, start);
    }

    fn close_bracket(&mut self, kind: PunctuationId, start: usize) {
        if self.bracket_depth == 0 {
            self.errors.push(SyntaxError::new(
                "Unmatched closing bracket",
                Span::new(start, self.current_pos),
            ));
        } else {
            self.bracket_depth -= 1;
        }
        self.add_punct(kind, start);
    }

    // ========================================================================
    // Identifier scanning
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }

        let spelling = &self.source[start..self.current_pos];

        if let Some(id) = keyword_id(spelling) {
            self.add_token(TokenKind::Keyword(id), start);
        } else {
            self.add_token(TokenKind::Ident(spelling.to_string()), start);
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if a character can start an identifier (ASCII-only).
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier (ASCII-only).
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convenience function to lex a source string.
///
/// This is a shorthand for `Lexer::new(source).tokenize()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<SyntaxError>> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cellbook_core::lang::keywords::KeywordId;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keyword_registry_parity() {
        use cellbook_core::lang::keywords;

        for k in keywords::KEYWORDS {
            let tokens = lex(k.canonical).unwrap_or_else(|errs| panic!("lex({:?}) failed: {:?}", k.canonical, errs));
            // keyword, Newline, Eof
            assert_eq!(tokens.len(), 3, "unexpected tokens for {:?}: {:?}", k.id, tokens);
            assert!(tokens[0].kind.is_keyword(k.id));
        }
    }

    #[test]
    fn test_operator_registry_parity() {
        use cellbook_core::lang::operators;

        for o in operators::OPERATORS {
            for &sp in o.spellings {
                let tokens = lex(sp).unwrap_or_else(|errs| panic!("lex({:?}) failed: {:?}", sp, errs));
                assert_eq!(tokens.len(), 3, "unexpected tokens for {:?}: {:?}", sp, tokens);
                if o.is_keyword_spelling {
                    assert!(matches!(tokens[0].kind, TokenKind::Keyword(_)));
                } else {
                    assert!(tokens[0].kind.is_operator(o.id), "{:?} lexed as {:?}", sp, tokens[0].kind);
                }
            }
        }
    }

    #[test]
    fn test_punctuation_registry_parity() {
        use cellbook_core::lang::punctuation;

        for p in punctuation::PUNCTUATION {
            let source = match p.id {
                PunctuationId::LParen | PunctuationId::RParen => "()",
                PunctuationId::LBracket | PunctuationId::RBracket => "[]",
                PunctuationId::LBrace | PunctuationId::RBrace => "{}",
                _ => p.canonical,
            };
            let tokens = lex(source).unwrap();
            assert!(
                tokens.iter().any(|t| t.kind.is_punctuation(p.id)),
                "{:?} not produced by lexing {:?}",
                p.id,
                source
            );
        }
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("from merlin import x as y");
        assert!(tokens[0].is_keyword(KeywordId::From));
        assert!(matches!(&tokens[1], TokenKind::Ident(s) if s == "merlin"));
        assert!(tokens[2].is_keyword(KeywordId::Import));
        assert!(tokens[4].is_keyword(KeywordId::As));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_numbers() {
        let tokens = kinds("42 3.14 1_000_000 1e3 .5");
        assert!(matches!(tokens[0], TokenKind::Int(42)));
        assert!(matches!(tokens[1], TokenKind::Float(f) if (f - 3.14).abs() < 1e-9));
        assert!(matches!(tokens[2], TokenKind::Int(1_000_000)));
        assert!(matches!(tokens[3], TokenKind::Float(f) if f == 1000.0));
        assert!(matches!(tokens[4], TokenKind::Float(f) if f == 0.5));
    }

    #[test]
    fn test_attribute_on_int_is_not_float() {
        let tokens = kinds("x.shape[0]");
        assert!(tokens[1].is_punctuation(PunctuationId::Dot));
        assert!(matches!(tokens[4], TokenKind::Int(0)));
    }

    #[test]
    fn test_strings() {
        let tokens = kinds(r#""hello" 'world' r"a\nb""#);
        assert!(matches!(&tokens[0], TokenKind::String(s) if s == "hello"));
        assert!(matches!(&tokens[1], TokenKind::String(s) if s == "world"));
        assert!(matches!(&tokens[2], TokenKind::String(s) if s == "a\\nb"));
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = kinds("s = \"\"\"one\ntwo\"\"\"\nt = 1\n");
        assert!(matches!(&tokens[2], TokenKind::String(s) if s == "one\ntwo"));
        assert!(matches!(tokens[3], TokenKind::Newline));
    }

    #[test]
    fn test_fstring_parts_with_format_spec() {
        let tokens = kinds(r#"f"auc={auc:.3f} n={len(xs)}""#);
        match &tokens[0] {
            TokenKind::FString(parts) => {
                assert_eq!(parts.len(), 4);
                assert!(matches!(&parts[0], FStringPart::Literal(s) if s == "auc="));
                assert!(matches!(
                    &parts[1],
                    FStringPart::Expr { source, format_spec: Some(spec) } if source == "auc" && spec == ".3f"
                ));
                assert!(matches!(&parts[3], FStringPart::Expr { source, format_spec: None } if source == "len(xs)"));
            }
            other => panic!("Expected FString token, got {:?}", other),
        }
    }

    #[test]
    fn test_indentation() {
        let tokens = kinds("def foo():\n    x = 1\n    y = 2\nx = 3");
        let indents = tokens.iter().filter(|t| matches!(t, TokenKind::Indent)).count();
        let dedents = tokens.iter().filter(|t| matches!(t, TokenKind::Dedent)).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_multiple_dedents() {
        let tokens = kinds("def foo():\n  if True:\n    x = 1\ny = 2");
        let indents = tokens.iter().filter(|t| matches!(t, TokenKind::Indent)).count();
        let dedents = tokens.iter().filter(|t| matches!(t, TokenKind::Dedent)).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_dedents_at_eof_follow_final_newline() {
        let tokens = kinds("if x:\n    y = 1");
        let tail: Vec<_> = tokens.iter().rev().take(3).collect();
        assert!(matches!(tail[0], TokenKind::Eof));
        assert!(matches!(tail[1], TokenKind::Dedent));
        assert!(matches!(tail[2], TokenKind::Newline));
    }

    #[test]
    fn test_newlines_inside_brackets() {
        let tokens = kinds("foo(\n  x,\n  y\n)");
        let newlines = tokens.iter().filter(|t| matches!(t, TokenKind::Newline)).count();
        assert_eq!(newlines, 1, "only the terminating newline is emitted");
        assert!(!tokens.iter().any(|t| matches!(t, TokenKind::Indent)));
    }

    #[test]
    fn test_backslash_continuation() {
        let tokens = kinds("x = 1 + \\\n    2\n");
        assert!(!tokens.iter().any(|t| matches!(t, TokenKind::Indent)));
        assert!(matches!(tokens[4], TokenKind::Int(2)));
    }

    #[test]
    fn test_comment_only_lines_are_skipped() {
        let tokens = kinds("# heading\nx = 1  # trailing\n    # indented comment\ny = 2\n");
        assert!(!tokens.iter().any(|t| matches!(t, TokenKind::Indent)));
        let newlines = tokens.iter().filter(|t| matches!(t, TokenKind::Newline)).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn test_unicode_identifier_rejected() {
        let errors = lex("π = 1").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unexpected character"));
    }

    #[test]
    fn test_unmatched_closing_bracket() {
        for source in [")", "]", "}"] {
            let errors = lex(source).unwrap_err();
            assert!(errors[0].message.contains("Unmatched closing bracket"));
        }
    }

    #[test]
    fn test_unclosed_bracket_reported() {
        let errors = lex("print(1,\n").unwrap_err();
        assert!(errors[0].message.contains("Unclosed bracket"));
    }

    #[test]
    fn test_inconsistent_dedent() {
        let errors = lex("if x:\n    y = 1\n  z = 2\n").unwrap_err();
        assert!(errors[0].message.contains("Inconsistent indentation"));
    }

    #[test]
    fn test_unterminated_string() {
        let errors = lex("x = 'abc\n").unwrap_err();
        assert!(errors[0].message.contains("Unterminated string"));
    }
}
