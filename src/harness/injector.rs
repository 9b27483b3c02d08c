//! Code injection
//!
//! Fragments are queued against an anchor, the original-cell index they run before. Source fragments are dedented
//! and parsed when queued, so a typo in test setup fails at the `inject` call rather than mid-run.

use std::fmt;

use cellbook_syntax::ast::Program;
use cellbook_syntax::diagnostics::render;

use super::errors::HarnessError;
use super::executor::Unit;
use crate::runtime::Interpreter;
use crate::runtime::errors::RuntimeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub u64);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type NativeFragment = Box<dyn FnOnce(&mut Interpreter) -> RuntimeResult<()>>;

pub enum FragmentBody {
    Source { text: String, program: Program },
    Native(NativeFragment),
}

impl fmt::Debug for FragmentBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentBody::Source { text, .. } => f.debug_struct("Source").field("text", text).finish(),
            FragmentBody::Native(_) => f.write_str("Native(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Fragment {
    pub id: FragmentId,
    pub label: String,
    pub body: FragmentBody,
    /// Runs before the cell with this index; `len` means after the last cell
    pub anchor: usize,
}

impl Fragment {
    pub fn unit(&self) -> Unit {
        Unit::Fragment {
            id: self.id,
            label: self.label.clone(),
        }
    }

    /// Source text, if any, for error excerpts.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            FragmentBody::Source { text, .. } => Some(text),
            FragmentBody::Native(_) => None,
        }
    }
}

/// Pending fragments, in injection order.
#[derive(Debug, Default)]
pub struct FragmentQueue {
    next_id: u64,
    pending: Vec<Fragment>,
}

impl FragmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> FragmentId {
        self.next_id += 1;
        FragmentId(self.next_id)
    }

    /// Dedent and parse `code`, then queue it before `anchor`.
    pub fn push_source(&mut self, anchor: usize, code: &str) -> Result<FragmentId, HarnessError> {
        let id = self.next_id();
        let fragment = compile(id, anchor, code)?;
        tracing::debug!(%id, anchor, label = %fragment.label, "fragment queued");
        self.pending.push(fragment);
        Ok(id)
    }

    pub fn push_native(&mut self, anchor: usize, label: impl Into<String>, body: NativeFragment) -> FragmentId {
        let id = self.next_id();
        let label = label.into();
        tracing::debug!(%id, anchor, %label, "native fragment queued");
        self.pending.push(Fragment {
            id,
            label,
            body: FragmentBody::Native(body),
            anchor,
        });
        id
    }

    /// A one-off fragment that never enters the queue.
    pub fn compile_now(&mut self, code: &str) -> Result<Fragment, HarnessError> {
        let id = self.next_id();
        compile(id, 0, code)
    }

    /// Remove every fragment anchored at or before `limit`, lowest anchor first, injection order within an anchor.
    pub fn drain_through(&mut self, limit: usize) -> Vec<Fragment> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|f| f.anchor <= limit);
        self.pending = rest;
        due.sort_by_key(|f| (f.anchor, f.id));
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn anchors(&self) -> impl Iterator<Item = (FragmentId, usize)> + '_ {
        self.pending.iter().map(|f| (f.id, f.anchor))
    }
}

fn compile(id: FragmentId, anchor: usize, code: &str) -> Result<Fragment, HarnessError> {
    let text = dedent(code);
    let label = label_for(&text);
    let unit = Unit::Fragment { id, label: label.clone() };
    let program = cellbook_syntax::parse_source(&text).map_err(|errors| HarnessError::Syntax {
        rendered: errors
            .iter()
            .map(|e| render(&unit.source_name(), &text, e))
            .collect::<Vec<_>>()
            .join("\n"),
        unit: unit.clone(),
        errors,
    })?;
    Ok(Fragment {
        id,
        label,
        body: FragmentBody::Source { text, program },
        anchor,
    })
}

fn label_for(text: &str) -> String {
    const MAX: usize = 48;
    let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("<empty>");
    if first.chars().count() > MAX {
        let cut: String = first.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

/// Strip the whitespace prefix shared by every non-blank line.
pub fn dedent(code: &str) -> String {
    let prefix = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start().len()])
        .reduce(|a, b| {
            let shared = a
                .char_indices()
                .zip(b.chars())
                .take_while(|((_, x), y)| x == y)
                .last()
                .map_or(0, |((i, c), _)| i + c.len_utf8());
            &a[..shared]
        })
        .unwrap_or("");

    let mut out = String::with_capacity(code.len());
    for line in code.lines() {
        out.push_str(line.strip_prefix(prefix).unwrap_or(line.trim_start()));
        out.push('\n');
    }
    out
}
