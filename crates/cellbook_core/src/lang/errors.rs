//! Builtin exception vocabulary.
//!
//! Cells raise and catch nothing themselves, but every runtime failure carries one of these kinds so the harness can
//! report `ValueError: ...` style messages. `Exception` is accepted as an alias when a cell writes `raise Exception(...)`.

use crate::errors::ErrorKind;

use super::registry::{LangItemInfo, Stability};

/// Metadata for a builtin exception kind.
pub type ExceptionInfo = LangItemInfo<ErrorKind>;

/// Registry of builtin exception kinds.
pub const EXCEPTIONS: &[ExceptionInfo] = &[
    info(
        ErrorKind::NameError,
        "NameError",
        &[],
        "Raised when a name is not bound in the local or global scope.",
    ),
    info(
        ErrorKind::TypeError,
        "TypeError",
        &[],
        "Raised when an operation receives a value of an inappropriate type.",
    ),
    info(
        ErrorKind::ValueError,
        "ValueError",
        &[],
        "Raised when an operation receives a value of the right type but an invalid value.",
    ),
    info(
        ErrorKind::KeyError,
        "KeyError",
        &[],
        "Raised when a dict key is missing.",
    ),
    info(
        ErrorKind::IndexError,
        "IndexError",
        &[],
        "Raised when a sequence index is out of bounds.",
    ),
    info(
        ErrorKind::AttributeError,
        "AttributeError",
        &[],
        "Raised when an attribute or module member does not exist.",
    ),
    info(
        ErrorKind::ImportError,
        "ImportError",
        &["ModuleNotFoundError"],
        "Raised when an imported module or name is not registered with the host.",
    ),
    info(
        ErrorKind::ZeroDivisionError,
        "ZeroDivisionError",
        &[],
        "Raised when dividing or taking modulo by zero.",
    ),
    info(
        ErrorKind::AssertionError,
        "AssertionError",
        &[],
        "Raised by a failing `assert` statement.",
    ),
    info(
        ErrorKind::FileExistsError,
        "FileExistsError",
        &[],
        "Raised when creating a directory that already exists without `exist_ok=True`.",
    ),
    info(
        ErrorKind::FileNotFoundError,
        "FileNotFoundError",
        &[],
        "Raised when reading a file or creating a directory under a missing parent.",
    ),
    info(
        ErrorKind::ConnectionError,
        "ConnectionError",
        &[],
        "Raised by host functions that would need network access to succeed.",
    ),
    info(
        ErrorKind::RuntimeError,
        "RuntimeError",
        &["Exception"],
        "Generic runtime failure; also raised for misuse of patchers.",
    ),
];

/// Return the canonical spelling for an exception kind (e.g. `"ValueError"`).
#[inline]
pub fn as_str(kind: ErrorKind) -> &'static str {
    info_for(kind).canonical
}

/// Return the user-facing description for an exception kind.
#[inline]
pub fn description(kind: ErrorKind) -> &'static str {
    info_for(kind).description
}

/// Resolve a spelling to an exception kind.
///
/// Matching is case-sensitive.
pub fn from_str(name: &str) -> Option<ErrorKind> {
    super::registry::lookup(EXCEPTIONS, name)
}

/// Return full metadata for an exception kind.
///
/// ## Panics
/// - If the registry is missing an entry for `kind` (programming error).
pub fn info_for(kind: ErrorKind) -> &'static ExceptionInfo {
    EXCEPTIONS
        .iter()
        .find(|e| e.id == kind)
        .expect("exception info missing")
}

const fn info(
    id: ErrorKind,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
) -> ExceptionInfo {
    LangItemInfo {
        id,
        canonical,
        aliases,
        description,
        stability: Stability::Stable,
    }
}
