//! Builtin function vocabulary.
//!
//! This module defines the builtin functions every cell can call without importing anything.
//! Callers should use the stable identifier [`BuiltinFnId`] for identity and query spellings and other metadata
//! through [`BuiltinFnInfo`] / [`BUILTIN_FUNCTIONS`].
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - Builtins live below module globals: a cell may shadow `len` by assigning to it.
//!
//! ## Examples
//! ```rust
//! use cellbook_core::lang::builtins::{self, BuiltinFnId};
//!
//! assert_eq!(builtins::from_str("print"), Some(BuiltinFnId::Print));
//! assert_eq!(builtins::as_str(BuiltinFnId::Sorted), "sorted");
//! ```

use super::registry::{LangItemInfo, Stability};

/// Stable identifier for a builtin function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFnId {
    Print,
    Len,
    Range,
    Str,
    Int,
    Float,
    Bool,
    List,
    Tuple,
    Dict,
    Set,
    Sorted,
    Min,
    Max,
    Sum,
    Abs,
    Round,
    Enumerate,
    Zip,
    Any,
    All,
    Isinstance,
}

/// Metadata for a builtin function.
pub type BuiltinFnInfo = LangItemInfo<BuiltinFnId>;

/// Registry of all builtin functions.
pub const BUILTIN_FUNCTIONS: &[BuiltinFnInfo] = &[
    info(BuiltinFnId::Print, "print", "Write values to the captured cell output."),
    info(BuiltinFnId::Len, "len", "Return the length of a collection or string."),
    info(BuiltinFnId::Range, "range", "Produce an integer sequence (`stop`, `start, stop` or `start, stop, step`)."),
    info(BuiltinFnId::Str, "str", "Convert a value to a string."),
    info(BuiltinFnId::Int, "int", "Convert a value to an integer."),
    info(BuiltinFnId::Float, "float", "Convert a value to a float."),
    info(BuiltinFnId::Bool, "bool", "Return the truthiness of a value."),
    info(BuiltinFnId::List, "list", "Collect an iterable into a new list."),
    info(BuiltinFnId::Tuple, "tuple", "Collect an iterable into a tuple."),
    info(BuiltinFnId::Dict, "dict", "Build a dict from keyword arguments or key/value pairs."),
    info(BuiltinFnId::Set, "set", "Collect an iterable into a set."),
    info(BuiltinFnId::Sorted, "sorted", "Return a new sorted list."),
    info(BuiltinFnId::Min, "min", "Return the smallest item."),
    info(BuiltinFnId::Max, "max", "Return the largest item."),
    info(BuiltinFnId::Sum, "sum", "Sum a numeric iterable."),
    info(BuiltinFnId::Abs, "abs", "Absolute value of a number."),
    info(BuiltinFnId::Round, "round", "Round a number to a given precision."),
    info(BuiltinFnId::Enumerate, "enumerate", "Pair each item with its index."),
    info(BuiltinFnId::Zip, "zip", "Pair items from several iterables."),
    info(BuiltinFnId::Any, "any", "True if any item is truthy."),
    info(BuiltinFnId::All, "all", "True if every item is truthy."),
    info(BuiltinFnId::Isinstance, "isinstance", "Check a value against a builtin type name."),
];

/// Return the canonical spelling for a builtin function.
pub fn as_str(id: BuiltinFnId) -> &'static str {
    info_for(id).canonical
}

/// Return full metadata for a builtin function.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: BuiltinFnId) -> &'static BuiltinFnInfo {
    BUILTIN_FUNCTIONS
        .iter()
        .find(|b| b.id == id)
        .expect("builtin function info missing")
}

/// Resolve a spelling (canonical or alias) to a builtin function id.
pub fn from_str(name: &str) -> Option<BuiltinFnId> {
    super::registry::lookup(BUILTIN_FUNCTIONS, name)
}

const fn info(id: BuiltinFnId, canonical: &'static str, description: &'static str) -> BuiltinFnInfo {
    LangItemInfo {
        id,
        canonical,
        aliases: &[],
        description,
        stability: Stability::Stable,
    }
}
