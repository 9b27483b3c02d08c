//! Small helper APIs for working with `Token` / `TokenKind`.
//!
//! These helpers reduce repetitive `matches!(...)` at call sites.

use crate::lexer::{Token, TokenKind};
use cellbook_core::lang::keywords::KeywordId;
use cellbook_core::lang::operators::OperatorId;
use cellbook_core::lang::punctuation::PunctuationId;

impl TokenKind {
    /// Return the keyword id, if this is a keyword token.
    pub fn keyword_id(&self) -> Option<KeywordId> {
        match self {
            TokenKind::Keyword(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` if this is the given keyword.
    pub fn is_keyword(&self, id: KeywordId) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == id)
    }

    /// Return the operator id, if this is an operator token.
    pub fn operator_id(&self) -> Option<OperatorId> {
        match self {
            TokenKind::Operator(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` if this is the given operator.
    pub fn is_operator(&self, id: OperatorId) -> bool {
        matches!(self, TokenKind::Operator(o) if *o == id)
    }

    /// Return `true` if this is the given punctuation.
    pub fn is_punctuation(&self, id: PunctuationId) -> bool {
        matches!(self, TokenKind::Punctuation(p) if *p == id)
    }

    /// Return `true` if this token only carries layout.
    pub fn is_layout(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
    }

    /// Short human-readable description used in "found ..." parser messages.
    pub fn describe(&self) -> String {
        use cellbook_core::lang::{keywords, operators, punctuation};

        match self {
            TokenKind::Keyword(id) => format!("keyword '{}'", keywords::as_str(*id)),
            TokenKind::Operator(id) => format!("'{}'", operators::as_str(*id)),
            TokenKind::Punctuation(id) => format!("'{}'", punctuation::as_str(*id)),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Int(n) => format!("integer {}", n),
            TokenKind::Float(f) => format!("float {}", f),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::FString(_) => "f-string".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

impl Token {
    /// Convenience wrapper for `self.kind.keyword_id()`.
    pub fn keyword_id(&self) -> Option<KeywordId> {
        self.kind.keyword_id()
    }

    /// Convenience wrapper for `self.kind.operator_id()`.
    pub fn operator_id(&self) -> Option<OperatorId> {
        self.kind.operator_id()
    }
}
