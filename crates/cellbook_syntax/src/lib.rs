//! Syntax frontend for the cellbook cell language: lexer, parser, AST, diagnostics.
//!
//! Cells and injected fragments are both parsed here before the harness runs them.
//!
//! ## Notes
//! - This crate is “syntax-only”: it does not resolve names or evaluate anything.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `cellbook_core::lang` registries.
//!
//! ## Examples
//! ```rust
//! use cellbook_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("x = 1\n").unwrap();
//! let program = parser::parse(&tokens).unwrap();
//! assert_eq!(program.statements.len(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod token_helpers;

pub use diagnostics::SyntaxError;

/// Lex and parse a source string in one step.
///
/// Lexer errors are returned as-is (the parser does not run on a broken token stream).
pub fn parse_source(source: &str) -> Result<ast::Program, Vec<SyntaxError>> {
    let tokens = lexer::lex(source)?;
    parser::parse(&tokens)
}
