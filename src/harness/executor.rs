//! Phased execution
//!
//! The executor walks original-cell indices with a monotonic cursor. Before cell `i` runs, every pending fragment
//! anchored at or before `i` runs; a range that reaches the end of the document also runs fragments anchored past
//! the last cell. Narrative and raw cells occupy an index but do nothing.
//!
//! ```text
//! Loaded --execute--> PartiallyExecuted --execute--> Completed
//!    \                      |                           |
//!     +------ unit fails ---+------------ Failed <------+
//! ```

use std::fmt;

use cellbook_syntax::ast::Span;
use cellbook_syntax::diagnostics::{line_info, render};

use super::errors::HarnessError;
use super::injector::{Fragment, FragmentBody, FragmentId, FragmentQueue};
use crate::document::Document;
use crate::runtime::Interpreter;
use crate::runtime::errors::RuntimeError;

/// One executable thing: a notebook cell or an injected fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Cell(usize),
    Fragment { id: FragmentId, label: String },
}

impl Unit {
    /// Name used in rendered diagnostics.
    pub fn source_name(&self) -> String {
        match self {
            Unit::Cell(i) => format!("cell[{i}]"),
            Unit::Fragment { id, .. } => format!("fragment{id}"),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Cell(i) => write!(f, "cell {i}"),
            Unit::Fragment { id, label } => write!(f, "fragment {id} ({label})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loaded,
    PartiallyExecuted,
    Completed,
    /// Terminal
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Loaded => "loaded",
            RunState::PartiallyExecuted => "partially executed",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Executor {
    cursor: usize,
    state: RunState,
    queue: FragmentQueue,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            state: RunState::Loaded,
            queue: FragmentQueue::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn queue(&self) -> &FragmentQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut FragmentQueue {
        &mut self.queue
    }

    pub(crate) fn ensure_runnable(&self) -> Result<(), HarnessError> {
        if self.state == RunState::Failed {
            return Err(HarnessError::NotRunnable { state: self.state });
        }
        Ok(())
    }

    /// Anchors must not precede the cursor: that position has already executed.
    pub(crate) fn check_anchor(&self, index: usize, len: usize) -> Result<(), HarnessError> {
        if index < self.cursor || index > len {
            return Err(HarnessError::InvalidAnchor {
                index,
                cursor: self.cursor,
                len,
            });
        }
        Ok(())
    }

    /// Run cells `lo..hi` (`hi = None` means to the end) under one deadline.
    #[tracing::instrument(skip_all, fields(lo = lo, hi = ?hi))]
    pub fn execute_range(
        &mut self,
        document: &Document,
        interp: &mut Interpreter,
        lo: usize,
        hi: Option<usize>,
    ) -> Result<(), HarnessError> {
        self.ensure_runnable()?;
        let len = document.len();
        let hi = hi.unwrap_or(len);
        if lo < self.cursor || lo > hi || hi > len {
            return Err(HarnessError::InvalidRange {
                lo,
                hi,
                cursor: self.cursor,
                len,
            });
        }
        if lo > self.cursor {
            tracing::debug!(from = self.cursor, to = lo, "skipping cells");
        }

        tracing::info!(lo, hi, pending = self.queue.len(), "executing range");
        interp.set_deadline(interp.config().timeout);
        let result = self.run_range(document, interp, lo, hi);
        interp.clear_deadline();

        match result {
            Ok(()) => {
                self.cursor = hi;
                self.state = if self.cursor == len && self.queue.is_empty() {
                    RunState::Completed
                } else {
                    RunState::PartiallyExecuted
                };
                tracing::info!(cursor = self.cursor, state = %self.state, "range finished");
                Ok(())
            }
            Err(err) => {
                self.state = RunState::Failed;
                tracing::info!(error = %err, "range failed");
                Err(err)
            }
        }
    }

    fn run_range(
        &mut self,
        document: &Document,
        interp: &mut Interpreter,
        lo: usize,
        hi: usize,
    ) -> Result<(), HarnessError> {
        for (i, cell) in document.cells().iter().enumerate().take(hi).skip(lo) {
            for fragment in self.queue.drain_through(i) {
                run_fragment(interp, fragment)?;
            }
            if !cell.is_code() {
                tracing::debug!(cell = i, kind = %cell.kind, "skipping non-code cell");
                continue;
            }
            run_source(interp, Unit::Cell(i), &cell.source)?;
        }
        if hi == document.len() {
            for fragment in self.queue.drain_through(hi) {
                run_fragment(interp, fragment)?;
            }
        }
        Ok(())
    }

    /// Run a fragment outside the queue, under its own deadline. The cursor does not move.
    pub fn run_now(&mut self, interp: &mut Interpreter, fragment: Fragment) -> Result<(), HarnessError> {
        self.ensure_runnable()?;
        interp.set_deadline(interp.config().timeout);
        let result = run_fragment(interp, fragment);
        interp.clear_deadline();
        if result.is_err() {
            self.state = RunState::Failed;
        }
        result
    }
}

fn run_fragment(interp: &mut Interpreter, fragment: Fragment) -> Result<(), HarnessError> {
    let unit = fragment.unit();
    tracing::debug!(%unit, anchor = fragment.anchor, "running fragment");
    match fragment.body {
        FragmentBody::Source { text, program } => interp
            .run_program(&program)
            .map_err(|cause| unit_failed(unit, cause, Some(&text))),
        FragmentBody::Native(body) => {
            interp.check_deadline().map_err(|cause| unit_failed(unit.clone(), cause, None))?;
            body(interp).map_err(|cause| unit_failed(unit, cause, None))
        }
    }
}

fn run_source(interp: &mut Interpreter, unit: Unit, source: &str) -> Result<(), HarnessError> {
    tracing::debug!(%unit, "running");
    let program = cellbook_syntax::parse_source(source).map_err(|errors| HarnessError::Syntax {
        rendered: errors
            .iter()
            .map(|e| render(&unit.source_name(), source, e))
            .collect::<Vec<_>>()
            .join("\n"),
        unit: unit.clone(),
        errors,
    })?;
    interp
        .run_program(&program)
        .map_err(|cause| unit_failed(unit, cause, Some(source)))
}

fn unit_failed(unit: Unit, cause: RuntimeError, source: Option<&str>) -> HarnessError {
    if cause.is_deadline() {
        let limit = cause.limit().unwrap_or_default();
        tracing::error!(%unit, ?limit, "execution budget exceeded");
        return HarnessError::Timeout { unit, limit };
    }
    tracing::error!(%unit, error = %cause, "unit failed");
    let source_excerpt = match source {
        Some(text) => excerpt(text, cause.span),
        None => String::new(),
    };
    HarnessError::CellExecution {
        unit,
        cause,
        source_excerpt,
    }
}

/// `line | text` for the statement at `span`, or the first non-blank line.
fn excerpt(source: &str, span: Option<Span>) -> String {
    match span {
        Some(span) => {
            let (line, _, text) = line_info(source, span.start);
            format!("{line} | {}", text.trim_end())
        }
        None => source
            .lines()
            .enumerate()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| format!("{} | {}", i + 1, l.trim_end()))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::document::{Cell, CellKind};

    fn document(sources: &[(CellKind, &str)]) -> Document {
        let cells = sources
            .iter()
            .enumerate()
            .map(|(i, (kind, src))| Cell::new(i, *kind, *src))
            .collect();
        Document::from_cells("test.ipynb", cells)
    }

    fn interp() -> Interpreter {
        Interpreter::new(&HarnessConfig::default())
    }

    #[test]
    fn test_narrative_cells_are_counted_but_skipped() {
        let doc = document(&[
            (CellKind::Code, "x = 1"),
            (CellKind::Narrative, "# not code = ("),
            (CellKind::Code, "x += 1"),
        ]);
        let mut exec = Executor::new();
        let mut interp = interp();
        exec.execute_range(&doc, &mut interp, 0, None).unwrap();
        assert_eq!(interp.global("x").and_then(|v| v.as_int()), Some(2));
        assert_eq!(exec.state(), RunState::Completed);
    }

    #[test]
    fn test_fragments_run_before_their_anchor() {
        let doc = document(&[(CellKind::Code, "log.append('cell0')"), (CellKind::Code, "log.append('cell1')")]);
        let mut exec = Executor::new();
        let mut interp = interp();
        interp.set_global("log", crate::runtime::value::Value::list(vec![]));
        exec.queue_mut().push_source(1, "log.append('frag@1')").unwrap();
        exec.queue_mut().push_source(2, "log.append('frag@end')").unwrap();
        exec.execute_range(&doc, &mut interp, 0, None).unwrap();
        let log = interp.global("log").unwrap().repr();
        assert_eq!(log, "['cell0', 'frag@1', 'cell1', 'frag@end']");
    }

    #[test]
    fn test_partial_range_then_rest() {
        let doc = document(&[(CellKind::Code, "a = 1"), (CellKind::Code, "b = a + 1"), (CellKind::Code, "c = b + 1")]);
        let mut exec = Executor::new();
        let mut interp = interp();
        exec.execute_range(&doc, &mut interp, 0, Some(2)).unwrap();
        assert_eq!(exec.state(), RunState::PartiallyExecuted);
        assert_eq!(exec.cursor(), 2);
        assert!(interp.global("c").is_none());
        exec.execute_range(&doc, &mut interp, 2, None).unwrap();
        assert_eq!(interp.global("c").and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn test_invalid_ranges() {
        let doc = document(&[(CellKind::Code, "a = 1"), (CellKind::Code, "b = 2")]);
        let mut exec = Executor::new();
        let mut interp = interp();
        let err = exec.execute_range(&doc, &mut interp, 0, Some(3)).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidRange { hi: 3, len: 2, .. }));
        exec.execute_range(&doc, &mut interp, 1, Some(2)).unwrap();
        let err = exec.execute_range(&doc, &mut interp, 0, Some(1)).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidRange { lo: 0, cursor: 2, .. }));
    }

    #[test]
    fn test_failure_is_terminal_and_names_the_cell() {
        let doc = document(&[(CellKind::Code, "a = 1"), (CellKind::Code, "a = 1\nb = missing"), (CellKind::Code, "c = 3")]);
        let mut exec = Executor::new();
        let mut interp = interp();
        let err = exec.execute_range(&doc, &mut interp, 0, None).unwrap_err();
        match &err {
            HarnessError::CellExecution {
                unit, source_excerpt, ..
            } => {
                assert_eq!(unit, &Unit::Cell(1));
                assert_eq!(source_excerpt, "2 | b = missing");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(exec.state(), RunState::Failed);
        assert!(interp.global("c").is_none());
        let again = exec.execute_range(&doc, &mut interp, 2, None).unwrap_err();
        assert!(matches!(again, HarnessError::NotRunnable { state: RunState::Failed }));
    }

    #[test]
    fn test_cell_syntax_error_at_execution() {
        let doc = document(&[(CellKind::Code, "x = (")]);
        let mut exec = Executor::new();
        let err = exec.execute_range(&doc, &mut interp(), 0, None).unwrap_err();
        assert!(matches!(err, HarnessError::Syntax { unit: Unit::Cell(0), .. }));
    }

    #[test]
    fn test_excerpt_without_span() {
        assert_eq!(excerpt("\n  foo()\n", None), "2 |   foo()");
    }
}
