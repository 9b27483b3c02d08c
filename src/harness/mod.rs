//! Notebook test harness
//!
//! [`Testbook`] is the handle a test driver holds for one notebook: it loads the document, queues injected
//! fragments, runs cells in phases against a single shared environment, and reads results back out.
//!
//! ```no_run
//! use cellbook::{Contract, OpenOptions, Testbook};
//!
//! # fn main() -> Result<(), cellbook::HarnessError> {
//! let mut tb = Testbook::open("demos/02-advanced-workflow.ipynb", OpenOptions::new())?;
//! tb.inject("import os\nos.makedirs('/tmp/fixtures', exist_ok=True)")?;
//! tb.execute_range(0, Some(5))?;
//! tb.execute_range(6, None)?;
//! tb.expect(&Contract::new("metrics", &["history"], ["loss", "val_loss"]))?;
//! tb.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `injector` - fragment dedent, parse and queue
//! - `executor` - cursor, run state and the per-call deadline
//! - `validate` - extraction and key-set contracts
//! - `errors` - [`HarnessError`]

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod executor;
pub mod injector;
pub mod validate;

use std::path::Path;

use crate::config::{HarnessConfig, OpenOptions};
use crate::document::{Cell, Document};
use crate::runtime::Interpreter;
use crate::runtime::errors::RuntimeResult;
use crate::runtime::value::Value;

pub use errors::HarnessError;
pub use executor::{RunState, Unit};
pub use injector::FragmentId;
pub use validate::Contract;

use executor::Executor;

pub struct Testbook {
    document: Document,
    interp: Interpreter,
    executor: Executor,
}

impl Testbook {
    /// Load a notebook with configuration from the environment. Nothing executes unless `options.execute` is set.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self, HarnessError> {
        Self::open_with_config(path, options, HarnessConfig::from_env())
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with_config(
        path: impl AsRef<Path>,
        options: OpenOptions,
        mut config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        if let Some(timeout) = options.timeout {
            config.timeout = timeout;
        }
        let document = Document::load_with_limit(path, config.max_document_size)?;
        tracing::info!(cells = document.len(), timeout = ?config.timeout, "notebook opened");
        let mut tb = Self::from_document(document, config);
        if options.execute {
            tb.execute()?;
        }
        Ok(tb)
    }

    pub fn from_document(document: Document, config: HarnessConfig) -> Self {
        Self {
            interp: Interpreter::new(&config),
            document,
            executor: Executor::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn cells(&self) -> &[Cell] {
        self.document.cells()
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn state(&self) -> RunState {
        self.executor.state()
    }

    pub fn cursor(&self) -> usize {
        self.executor.cursor()
    }

    pub fn pending_fragments(&self) -> usize {
        self.executor.queue().len()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Lines printed by cell code so far.
    pub fn output(&self) -> &[String] {
        self.interp.output()
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.interp.take_output()
    }

    // ========================================================================
    // Injection
    // ========================================================================

    /// Queue `code` to run before the cell at the cursor.
    pub fn inject(&mut self, code: &str) -> Result<FragmentId, HarnessError> {
        let cursor = self.cursor();
        self.inject_at(cursor, code)
    }

    /// Queue `code` to run before cell `index`; `index == len()` runs it after the last cell.
    pub fn inject_at(&mut self, index: usize, code: &str) -> Result<FragmentId, HarnessError> {
        self.executor.ensure_runnable()?;
        self.executor.check_anchor(index, self.document.len())?;
        self.executor.queue_mut().push_source(index, code)
    }

    /// Queue a Rust closure at the cursor. It runs with the session interpreter, like any fragment.
    pub fn inject_native<F>(&mut self, label: impl Into<String>, body: F) -> Result<FragmentId, HarnessError>
    where
        F: FnOnce(&mut Interpreter) -> RuntimeResult<()> + 'static,
    {
        self.executor.ensure_runnable()?;
        let cursor = self.cursor();
        Ok(self.executor.queue_mut().push_native(cursor, label, Box::new(body)))
    }

    /// Run `code` immediately in the shared environment without moving the cursor.
    pub fn run_fragment(&mut self, code: &str) -> Result<(), HarnessError> {
        self.executor.ensure_runnable()?;
        let fragment = self.executor.queue_mut().compile_now(code)?;
        self.executor.run_now(&mut self.interp, fragment)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run cells `lo..hi`, or `lo..` to the end when `hi` is `None`.
    pub fn execute_range(&mut self, lo: usize, hi: Option<usize>) -> Result<(), HarnessError> {
        self.executor.execute_range(&self.document, &mut self.interp, lo, hi)
    }

    pub fn execute_cell(&mut self, index: usize) -> Result<(), HarnessError> {
        let Some(hi) = index.checked_add(1) else {
            return Err(HarnessError::InvalidRange {
                lo: index,
                hi: index,
                cursor: self.cursor(),
                len: self.len(),
            });
        };
        self.execute_range(index, Some(hi))
    }

    /// Run everything from the cursor to the end.
    pub fn execute(&mut self) -> Result<(), HarnessError> {
        let cursor = self.cursor();
        self.execute_range(cursor, None)
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Read a global binding from the shared environment.
    pub fn r#ref(&self, name: &str) -> Result<Value, HarnessError> {
        validate::extract(&self.interp, name)
    }

    pub fn extract(&self, name: &str) -> Result<Value, HarnessError> {
        self.r#ref(name)
    }

    /// Extract the contract's binding and check its key set.
    pub fn expect(&self, contract: &Contract) -> Result<(), HarnessError> {
        let value = self.r#ref(&contract.name)?;
        validate::validate(&self.interp, &value, contract)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Stop every patch still active, newest first. The session stays usable afterwards.
    pub fn close(&mut self) -> Result<(), HarnessError> {
        let active = self.interp.active_patches();
        if !active.is_empty() {
            let targets: Vec<&str> = active.iter().map(|(_, t)| t.as_str()).collect();
            tracing::warn!(?targets, "restoring patches left active");
        }
        let failures = self.interp.teardown_patches();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Teardown { failures })
        }
    }
}

impl Drop for Testbook {
    fn drop(&mut self) {
        if let Err(HarnessError::Teardown { failures }) = self.close() {
            for failure in failures {
                tracing::error!(error = %failure, "patch left in place at drop");
            }
        }
    }
}
