//! The seam between the interpreter and host-provided objects
//!
//! Data frames, paths, patchers and models are Rust types implementing [`HostObject`]. The interpreter only ever
//! talks to them through this trait.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use super::Interpreter;
use super::errors::{RuntimeError, RuntimeResult};
use super::value::Value;

/// A host-implemented object reachable from cell code.
///
/// Every hook has a default that raises the same error the cell language raises for an unsupported operation, so
/// implementors only override what they support. State that changes after construction lives behind `Cell` or
/// `RefCell`; objects are shared through `Rc`.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        Err(RuntimeError::no_attribute(self.type_name(), name))
    }

    fn set_attr(&self, name: &str, _value: Value) -> RuntimeResult<()> {
        Err(RuntimeError::no_attribute(self.type_name(), name))
    }

    /// `obj.name(args)`. The default looks the attribute up and calls it.
    fn call_method(&self, interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        let method = self.get_attr(name)?;
        interp.call_value(&method, args)
    }

    /// `obj(args)`
    fn call(&self, _interp: &mut Interpreter, _args: Args) -> RuntimeResult<Value> {
        Err(RuntimeError::type_error(format!(
            "'{}' object is not callable",
            self.type_name()
        )))
    }

    /// `obj[key]`
    fn get_item(&self, _key: &Value) -> RuntimeResult<Value> {
        Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            self.type_name()
        )))
    }

    fn len(&self) -> Option<usize> {
        None
    }

    fn iterate(&self) -> Option<Vec<Value>> {
        None
    }

    fn repr(&self) -> String {
        format!("<{} object>", self.type_name())
    }

    /// `str(obj)`
    fn to_display(&self) -> String {
        self.repr()
    }
}

/// Arguments of one call: positional values plus keyword arguments in call order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: IndexMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            named: IndexMap::new(),
        }
    }

    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Parameter `name` at position `index`, passed either way.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.named.get(name))
    }

    pub fn require(&self, func: &str, index: usize, name: &str) -> RuntimeResult<&Value> {
        self.get(index, name).ok_or_else(|| {
            RuntimeError::type_error(format!("{func}() missing required argument: '{name}'"))
        })
    }

    /// Like [`Args::get`], treating an explicit `None` as absent.
    pub fn get_some(&self, index: usize, name: &str) -> Option<&Value> {
        self.get(index, name).filter(|v| !v.is_none())
    }

    /// Reject surplus positional arguments and keywords outside `allowed`.
    pub fn check(&self, func: &str, max_positional: usize, allowed: &[&str]) -> RuntimeResult<()> {
        if self.positional.len() > max_positional {
            return Err(RuntimeError::type_error(format!(
                "{func}() takes at most {max_positional} positional arguments ({} given)",
                self.positional.len()
            )));
        }
        if let Some(name) = self.named.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(RuntimeError::type_error(format!(
                "{func}() got an unexpected keyword argument '{name}'"
            )));
        }
        Ok(())
    }
}
