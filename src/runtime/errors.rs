//! Runtime errors raised while cell code runs.

use std::fmt;
use std::time::Duration;

use cellbook_core::ErrorKind;
use cellbook_core::errors::format_error;
use cellbook_syntax::ast::Span;

/// An exception raised by cell code or by a host function it called.
///
/// Cells cannot catch exceptions, so every error unwinds to the unit that is executing and from there to the
/// harness.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Span of the top-level statement that raised, relative to the unit's source
    pub span: Option<Span>,
    /// Budget that expired, when raised by the deadline check rather than by the program
    deadline: Option<Duration>,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            deadline: None,
        }
    }

    /// The cooperative timeout fired.
    pub fn deadline_exceeded(limit: Duration) -> Self {
        Self {
            deadline: Some(limit),
            ..Self::new(ErrorKind::RuntimeError, format!("execution exceeded {limit:?}"))
        }
    }

    pub fn is_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn limit(&self) -> Option<Duration> {
        self.deadline
    }

    /// Attach the span of the statement that raised, keeping an existing one.
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(ErrorKind::NameError, format!("name '{name}' is not defined"))
    }

    pub fn no_attribute(type_name: &str, attr: &str) -> Self {
        Self::new(
            ErrorKind::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    pub fn index_out_of_range(type_name: &str) -> Self {
        Self::new(ErrorKind::IndexError, format!("{type_name} index out of range"))
    }

    pub fn key_error(key_repr: String) -> Self {
        Self::new(ErrorKind::KeyError, key_repr)
    }

    pub fn zero_division(what: &str) -> Self {
        Self::new(ErrorKind::ZeroDivisionError, what)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_error(self.kind, &self.message))
    }
}

impl std::error::Error for RuntimeError {}
