//! Provide the canonical vocabulary of the cellbook cell language and the runtime error taxonomy.
//!
//! This crate is intentionally small and dependency-free. Both the syntax frontend (`cellbook_syntax`) and the
//! interpreter in the root crate consult it, so spellings of keywords, operators, builtins and error kinds live in
//! exactly one place.
//!
//! ## Notes
//!
//! - This is a “vocabulary” crate: **no IO**, no global state, no AST types.
//! - Callers work with stable IDs (`KeywordId`, `OperatorId`, `ErrorKind`, ...) and look up spellings through the
//!   registry tables in [`lang`].

pub mod errors;
pub mod lang;

pub use errors::ErrorKind;
