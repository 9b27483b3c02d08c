//! Errors surfaced to whoever drives a [`super::Testbook`].

use std::time::Duration;

use cellbook_syntax::SyntaxError;
use miette::Diagnostic;
use thiserror::Error;

use super::executor::{RunState, Unit};
use crate::document::LoadError;
use crate::host::mock::MockError;
use crate::runtime::errors::RuntimeError;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error(transparent)]
    #[diagnostic(
        code(cellbook::load),
        help("the notebook must be nbformat 4 JSON (.ipynb) or a `# %%` percent script")
    )]
    Load(#[from] LoadError),

    #[error("{unit} does not parse:\n{rendered}")]
    #[diagnostic(code(cellbook::syntax))]
    Syntax {
        unit: Unit,
        rendered: String,
        errors: Vec<SyntaxError>,
    },

    #[error("{unit} exceeded the {limit:?} execution budget")]
    #[diagnostic(
        code(cellbook::timeout),
        help("raise the budget with --timeout or CELLBOOK_TIMEOUT_SECS")
    )]
    Timeout { unit: Unit, limit: Duration },

    #[error("{unit} raised {cause}")]
    #[diagnostic(code(cellbook::cell))]
    CellExecution {
        unit: Unit,
        cause: RuntimeError,
        /// The statement that raised, as `line | text`
        source_excerpt: String,
    },

    #[error("name '{name}' is not bound in the notebook environment")]
    #[diagnostic(code(cellbook::name), help("bound names: {known:?}"))]
    NameNotFound { name: String, known: Vec<String> },

    #[error("'{name}' keys do not match the contract ({})", summarize(.missing, .extra))]
    #[diagnostic(code(cellbook::contract))]
    ContractMismatch {
        name: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("'{name}' is a {found}, expected a mapping")]
    #[diagnostic(code(cellbook::contract))]
    ContractShape { name: String, found: String },

    #[error("cannot execute cells {lo}..{hi}: the cursor is at {cursor} and the notebook has {len} cells")]
    #[diagnostic(code(cellbook::range), help("ranges must satisfy cursor <= lo <= hi <= len"))]
    InvalidRange {
        lo: usize,
        hi: usize,
        cursor: usize,
        len: usize,
    },

    #[error("cannot inject before cell {index}: the cursor is at {cursor} and the notebook has {len} cells")]
    #[diagnostic(code(cellbook::range))]
    InvalidAnchor { index: usize, cursor: usize, len: usize },

    #[error("the notebook run is {state}; nothing more can execute")]
    #[diagnostic(code(cellbook::state))]
    NotRunnable { state: RunState },

    #[error("{} patch(es) could not be restored", .failures.len())]
    #[diagnostic(code(cellbook::teardown))]
    Teardown { failures: Vec<MockError> },
}

fn summarize(missing: &[String], extra: &[String]) -> String {
    match (missing.is_empty(), extra.is_empty()) {
        (false, true) => format!("missing {}", missing.join(", ")),
        (true, false) => format!("unexpected {}", extra.join(", ")),
        _ => format!("missing {}; unexpected {}", missing.join(", "), extra.join(", ")),
    }
}

impl HarnessError {
    /// The unit that was executing, for errors raised while running one.
    pub fn unit(&self) -> Option<&Unit> {
        match self {
            HarnessError::Syntax { unit, .. }
            | HarnessError::Timeout { unit, .. }
            | HarnessError::CellExecution { unit, .. } => Some(unit),
            _ => None,
        }
    }
}
