//! Parser for the cell language
//!
//! Converts a token stream into a [`Program`] of statements.
//!
//! ## Examples
//!
//! ```rust
//! use cellbook_syntax::{lexer, parser};
//!
//! let source = "def double(x):\n    return x * 2\n";
//! let tokens = lexer::lex(source).unwrap();
//! let ast = parser::parse(&tokens).unwrap();
//! assert_eq!(ast.statements.len(), 1);
//! ```

use crate::ast::*;
use crate::diagnostics::SyntaxError;
use crate::lexer::{FStringPart as LexFStringPart, Token, TokenKind};
use cellbook_core::lang::keywords::KeywordId;
use cellbook_core::lang::operators::OperatorId;
use cellbook_core::lang::punctuation::PunctuationId;

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module while avoiding a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/stmts.rs");
include!("parser/expr.rs");
include!("parser/util.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
