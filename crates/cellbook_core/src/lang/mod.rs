//! Cell-language vocabulary registries.
//!
//! This module is the “front door” for language-level vocabulary: reserved keywords, operators, punctuation,
//! builtin functions and builtin error kinds.
//!
//! The design goal is to avoid stringly-typed checks scattered across the lexer, parser and interpreter.
//! Callers work with **stable IDs** (e.g. `KeywordId`, `OperatorId`) and look up spellings/metadata via the
//! registry tables.
//!
//! ## Notes
//! - Registries are **pure**: no AST types, no IO, no side effects.
//! - The lexer/parser enforce syntax; registries only provide spellings and metadata.
//!
//! ## Examples
//! ```rust
//! use cellbook_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("if"), Some(KeywordId::If));
//! assert_eq!(keywords::as_str(KeywordId::If), "if");
//! ```

pub mod builtins;
pub mod errors;
pub mod keywords;
pub mod operators;
pub mod punctuation;
pub mod registry;
