//! Runtime error kinds raised by cell code.
//!
//! The interpreter reports every failure as one of these kinds plus a message, formatted the way notebook users
//! expect (`KeyError: 'movieId'`). Canonical spellings live in [`crate::lang::errors`].

use std::fmt;

use crate::lang;

/// Identify the category of a runtime failure inside an executed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NameError,
    TypeError,
    ValueError,
    KeyError,
    IndexError,
    AttributeError,
    ImportError,
    ZeroDivisionError,
    AssertionError,
    FileExistsError,
    FileNotFoundError,
    ConnectionError,
    RuntimeError,
}

impl ErrorKind {
    /// Canonical spelling (e.g. `"KeyError"`).
    pub fn as_str(self) -> &'static str {
        lang::errors::as_str(self)
    }

    /// Resolve a spelling (canonical or alias) to an error kind.
    pub fn from_name(name: &str) -> Option<Self> {
        lang::errors::from_str(name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a canonical `Kind: message` string, or just `Kind` when the message is empty.
pub fn format_error(kind: ErrorKind, message: &str) -> String {
    if message.is_empty() {
        kind.as_str().to_string()
    } else {
        format!("{}: {}", kind.as_str(), message)
    }
}
