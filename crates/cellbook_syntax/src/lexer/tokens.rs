//! Token types for the cell-language lexer.
//!
//! The lexer uses **registry-backed IDs** for language vocabulary:
//! - `Keyword(KeywordId)` for reserved words
//! - `Operator(OperatorId)` for symbol operators (word operators like `and` lex as keywords)
//! - `Punctuation(PunctuationId)` for punctuation tokens
//!
//! Use `crate::token_helpers` for ergonomic token matching at call sites.

use crate::ast::Span;
use cellbook_core::lang::keywords::{self, KeywordId};
use cellbook_core::lang::operators::OperatorId;
use cellbook_core::lang::punctuation::PunctuationId;

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ========== Keyword / operator / punctuation (ID-based) ==========
    Keyword(KeywordId),
    Operator(OperatorId),
    Punctuation(PunctuationId),

    // ========== Identifiers and Literals ==========
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),
    FString(Vec<FStringPart>),

    // ========== Layout ==========
    Newline,
    Indent,
    Dedent,

    Eof,
}

/// Part of an f-string.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    /// Raw expression source (re-lexed by the parser) and an optional `:spec` suffix.
    Expr {
        source: String,
        format_spec: Option<String>,
    },
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Resolve an identifier spelling to a keyword id, if reserved.
pub fn keyword_id(name: &str) -> Option<KeywordId> {
    keywords::from_str(name)
}
