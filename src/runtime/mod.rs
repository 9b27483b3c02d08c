//! Cell-language interpreter
//!
//! [`Interpreter`] owns everything a notebook session mutates: the [`env::Environment`], the host
//! [`ModuleRegistry`] with its active patches, the seeded RNG and the captured `print` output. The harness feeds it
//! parsed cells and fragments one at a time; nothing here knows about documents or cursors.
//!
//! ## Modules
//!
//! - `value` / `object` - runtime values and the [`object::HostObject`] seam
//! - `env` - globals plus call and comprehension frames
//! - `eval_stmt` / `eval_expr` - tree-walking evaluation
//! - `builtins` / `methods` - builtin functions and methods of builtin types
//! - `format` - f-string format specs

pub mod builtins;
pub mod env;
pub mod errors;
mod eval_expr;
mod eval_stmt;
pub mod format;
mod methods;
pub mod object;
pub mod value;

use std::rc::Rc;
use std::time::{Duration, Instant};

use cellbook_core::ErrorKind;
use cellbook_syntax::ast::Program;
use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::HarnessConfig;
use crate::host;
use crate::host::mock::{MockError, PatchId, PatchLedger};
use crate::host::registry::ModuleRegistry;

use env::{Environment, FrameKind};
use errors::{RuntimeError, RuntimeResult};
use eval_stmt::Flow;
use object::Args;
use value::{Function, Value};

/// Nested user-function calls deeper than this raise `RuntimeError`.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Stack kept free before descending; below it evaluation continues on a fresh heap-allocated segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f` with at least [`STACK_RED_ZONE`] bytes of stack, whatever thread the harness runs on.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

pub struct Interpreter {
    env: Environment,
    modules: ModuleRegistry,
    patches: PatchLedger,
    builtins: IndexMap<&'static str, Value>,
    rng: StdRng,
    config: HarnessConfig,
    output: Vec<String>,
    deadline: Option<Deadline>,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(config: &HarnessConfig) -> Self {
        let mut modules = ModuleRegistry::new();
        host::install(&mut modules);
        Self {
            env: Environment::new(),
            modules,
            patches: PatchLedger::new(),
            builtins: builtins::table(),
            rng: StdRng::seed_from_u64(config.seed),
            config: config.clone(),
            output: Vec::new(),
            deadline: None,
            call_depth: 0,
        }
    }

    /// Execute a parsed unit in the shared environment.
    ///
    /// Errors carry the span of the top-level statement that raised.
    pub fn run_program(&mut self, program: &Program) -> RuntimeResult<()> {
        for stmt in &program.statements {
            let flow = self.exec_stmt(stmt).map_err(|e| e.at(stmt.span))?;
            let stray = match flow {
                Flow::Normal => continue,
                Flow::Return(_) => "'return' outside function",
                Flow::Break => "'break' outside loop",
                Flow::Continue => "'continue' not properly in loop",
            };
            return Err(RuntimeError::new(ErrorKind::RuntimeError, stray).at(stmt.span));
        }
        Ok(())
    }

    // ========================================================================
    // Environment
    // ========================================================================

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.env.global(name).cloned()
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.env.set_global(name, value);
    }

    pub fn global_names(&self) -> Vec<String> {
        self.env.global_names()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Replace the RNG state, as `random.seed(n)` does.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub(crate) fn builtin(&self, name: &str) -> Option<Value> {
        self.builtins.get(name).cloned()
    }

    // ========================================================================
    // Output capture
    // ========================================================================

    pub(crate) fn print_line(&mut self, line: String) {
        tracing::trace!(target: "cellbook::print", "{line}");
        self.output.push(line);
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    // ========================================================================
    // Deadline
    // ========================================================================

    /// Arm the cooperative timeout for the next execution call.
    pub fn set_deadline(&mut self, limit: Duration) {
        self.deadline = Some(Deadline {
            at: Instant::now() + limit,
            limit,
        });
    }

    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    /// Checked before every statement and loop iteration.
    pub(crate) fn check_deadline(&self) -> RuntimeResult<()> {
        match self.deadline {
            Some(d) if Instant::now() >= d.at => Err(RuntimeError::deadline_exceeded(d.limit)),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Mock substitution
    // ========================================================================

    /// Install `substitute` at dotted `target` (e.g. `datasets.entertainment.get_movielens`).
    pub fn start_patch(&mut self, target: &str, substitute: Value) -> Result<PatchId, MockError> {
        self.patches.start(&mut self.modules, target, substitute)
    }

    pub fn stop_patch(&mut self, id: PatchId) -> Result<(), MockError> {
        self.patches.stop(&mut self.modules, id)
    }

    pub fn is_patch_active(&self, id: PatchId) -> bool {
        self.patches.is_active(id)
    }

    /// Targets still patched, oldest first.
    pub fn active_patches(&self) -> Vec<(PatchId, String)> {
        self.patches.active().to_vec()
    }

    /// Stop every active patch, newest first; returns every failure.
    pub fn teardown_patches(&mut self) -> Vec<MockError> {
        self.patches.teardown(&mut self.modules)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub fn call_value(&mut self, callee: &Value, args: Args) -> RuntimeResult<Value> {
        match callee {
            Value::Native(native) => {
                let native = Rc::clone(native);
                (native.func)(self, args)
            }
            Value::Function(func) => {
                let func = Rc::clone(func);
                self.call_function(&func, args)
            }
            Value::ExceptionType(kind) => {
                let message = match args.positional.first() {
                    Some(v) => v.to_display(),
                    None => String::new(),
                };
                Ok(Value::Exception(Rc::new(value::ExceptionValue { kind: *kind, message })))
            }
            Value::Object(obj) => {
                let obj = Rc::clone(obj);
                obj.call(self, args)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(&mut self, func: &Function, args: Args) -> RuntimeResult<Value> {
        let bound = bind_params(func, args)?;
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                ErrorKind::RuntimeError,
                "maximum recursion depth exceeded",
            ));
        }

        self.call_depth += 1;
        self.env.push_frame(FrameKind::Function);
        for (name, value) in bound {
            self.env.set(name, value);
        }
        let body = Rc::clone(&func.body);
        let result = with_stack(|| self.exec_block(&body));
        self.env.pop_frame();
        self.call_depth -= 1;

        match result? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::None),
            Flow::Break | Flow::Continue => Err(RuntimeError::new(
                ErrorKind::RuntimeError,
                "'break' outside loop",
            )),
        }
    }
}

/// Match call arguments to parameters, filling defaults.
fn bind_params(func: &Function, mut args: Args) -> RuntimeResult<Vec<(String, Value)>> {
    let positional_slots = func.params.iter().filter(|p| !p.keyword_only).count();
    if args.positional.len() > positional_slots {
        return Err(RuntimeError::type_error(format!(
            "{}() takes {} positional arguments but {} were given",
            func.name,
            positional_slots,
            args.positional.len()
        )));
    }

    let mut positional = std::mem::take(&mut args.positional).into_iter();
    let mut bound = Vec::with_capacity(func.params.len());
    for (param, default) in func.params.iter().zip(&func.defaults) {
        let from_position = if param.keyword_only { None } else { positional.next() };
        let value = match (from_position, args.named.shift_remove(&param.name)) {
            (Some(_), Some(_)) => {
                return Err(RuntimeError::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    func.name, param.name
                )));
            }
            (Some(v), None) | (None, Some(v)) => v,
            (None, None) => match default {
                Some(v) => v.clone(),
                None => {
                    return Err(RuntimeError::type_error(format!(
                        "{}() missing required argument: '{}'",
                        func.name, param.name
                    )));
                }
            },
        };
        bound.push((param.name.clone(), value));
    }

    if let Some(name) = args.named.keys().next() {
        return Err(RuntimeError::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            func.name, name
        )));
    }
    Ok(bound)
}

#[cfg(test)]
mod tests;
