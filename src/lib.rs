#![forbid(unsafe_code)]
//! cellbook: notebooks as repeatable test oracles
//!
//! Load a literate notebook, inject setup code and mocks at chosen positions, execute its cells in phases against
//! one shared environment, then check what the notebook produced.
//!
//! ## Layers
//!
//! - [`document`] - `.ipynb` / percent-script loading; never executes
//! - [`harness`] - [`Testbook`]: injector, phased executor, extraction and contracts
//! - [`runtime`] - the cell-language interpreter
//! - [`host`] - modules cell code can import, including the `mock` substitution layer
//! - [`config`] - [`HarnessConfig`] and [`OpenOptions`]
//! - [`cli`] - the `cellbook` binary
//!
//! Lexing and parsing live in the `cellbook_syntax` crate; error kinds and vocabulary in `cellbook_core`.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Cell code**: errors raised by a notebook are values ([`runtime::errors::RuntimeError`]) and never panic the
//!   harness.

pub mod cli;
pub mod config;
pub mod document;
pub mod harness;
pub mod host;
pub mod runtime;

pub use config::{HarnessConfig, OpenOptions};
pub use document::{Cell, CellKind, Document, LoadError};
pub use harness::{Contract, FragmentId, HarnessError, RunState, Testbook, Unit};
pub use runtime::Interpreter;
pub use runtime::value::Value;
