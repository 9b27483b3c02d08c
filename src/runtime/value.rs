//! Runtime values
//!
//! Containers are reference types (`Rc<RefCell<..>>`) so aliasing behaves the way notebook authors expect:
//! `metrics.history` and a name bound to it see the same dict.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use cellbook_core::ErrorKind;
use cellbook_syntax::ast::{Param, Spanned, Statement};
use indexmap::{IndexMap, IndexSet};

use super::Interpreter;
use super::errors::{RuntimeError, RuntimeResult};
use super::object::{Args, HostObject};

/// Longest range `list()`, `sorted()` and friends will copy into memory.
pub const MAX_MATERIALIZED_RANGE: usize = 1 << 24;

pub type NativeImpl = dyn Fn(&mut Interpreter, Args) -> RuntimeResult<Value>;

/// A function implemented in Rust: builtins, host module members, bound methods, mock substitutes.
pub struct NativeFn {
    pub name: String,
    pub func: Box<NativeImpl>,
}

impl NativeFn {
    pub fn new(name: impl Into<String>, func: impl Fn(&mut Interpreter, Args) -> RuntimeResult<Value> + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

/// A function defined by `def` in a cell or fragment.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    /// Evaluated once, at definition time; aligned with `params`
    pub defaults: Vec<Option<Value>>,
    pub body: Rc<[Spanned<Statement>]>,
}

/// An exception instance, as produced by `ValueError("...")`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionValue {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<IndexMap<HashKey, Value>>>),
    Set(Rc<RefCell<IndexSet<HashKey>>>),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    Native(Rc<NativeFn>),
    /// A registered host module, by dotted path
    Module(Rc<str>),
    Object(Rc<dyn HostObject>),
    ExceptionType(ErrorKind),
    Exception(Rc<ExceptionValue>),
}

/// Hashable projection of a value, used for dict keys and set members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a non-integral float
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
}

impl HashKey {
    pub fn to_value(&self) -> Value {
        match self {
            HashKey::None => Value::None,
            HashKey::Bool(b) => Value::Bool(*b),
            HashKey::Int(i) => Value::Int(*i),
            HashKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            HashKey::Str(s) => Value::Str(s.clone()),
            HashKey::Tuple(items) => Value::Tuple(items.iter().map(HashKey::to_value).collect()),
        }
    }
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(entries: IndexMap<HashKey, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn set(items: IndexSet<HashKey>) -> Value {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    pub fn object(obj: impl HostObject + 'static) -> Value {
        Value::Object(Rc::new(obj))
    }

    pub fn native(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, Args) -> RuntimeResult<Value> + 'static,
    ) -> Value {
        Value::Native(Rc::new(NativeFn::new(name, func)))
    }

    /// Build a dict with string keys.
    pub fn str_dict<I, K>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Value::dict(
            entries
                .into_iter()
                .map(|(k, v)| (HashKey::Str(Rc::from(k.as_ref())), v))
                .collect(),
        )
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Range { .. } => "range".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Native(_) => "builtin_function_or_method".to_string(),
            Value::Module(_) => "module".to_string(),
            Value::Object(o) => o.type_name().to_string(),
            Value::ExceptionType(_) => "type".to_string(),
            Value::Exception(e) => e.kind.as_str().to_string(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(map) => !map.borrow().is_empty(),
            Value::Set(set) => !set.borrow().is_empty(),
            Value::Range { .. } => self.range_len().is_some_and(|n| n > 0),
            Value::Object(o) => o.len().is_none_or(|n| n > 0),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// Integer view; bools count as integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Borrow a host object as its concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn expect_str(&self, what: &str) -> RuntimeResult<Rc<str>> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            other => Err(RuntimeError::type_error(format!(
                "{what} must be str, not {}",
                other.type_name()
            ))),
        }
    }

    pub fn expect_int(&self, what: &str) -> RuntimeResult<i64> {
        self.as_int().ok_or_else(|| {
            RuntimeError::type_error(format!("{what} must be int, not {}", self.type_name()))
        })
    }

    pub fn expect_float(&self, what: &str) -> RuntimeResult<f64> {
        self.as_float().ok_or_else(|| {
            RuntimeError::type_error(format!("{what} must be a number, not {}", self.type_name()))
        })
    }

    pub fn to_key(&self) -> RuntimeResult<HashKey> {
        match self {
            Value::None => Ok(HashKey::None),
            Value::Bool(b) => Ok(HashKey::Bool(*b)),
            Value::Int(i) => Ok(HashKey::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(HashKey::Int(*f as i64)),
            Value::Float(f) => Ok(HashKey::Float(f.to_bits())),
            Value::Str(s) => Ok(HashKey::Str(s.clone())),
            Value::Tuple(items) => Ok(HashKey::Tuple(
                items.iter().map(Value::to_key).collect::<RuntimeResult<_>>()?,
            )),
            other => Err(RuntimeError::type_error(format!(
                "unhashable type: '{}'",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn range_len(&self) -> Option<usize> {
        match self {
            Value::Range { start, stop, step } => {
                let (start, stop, step) = (*start as i128, *stop as i128, *step as i128);
                let n = if step > 0 {
                    (stop - start + step - 1) / step
                } else {
                    (start - stop - step - 1) / -step
                };
                Some(n.max(0) as usize)
            }
            _ => None,
        }
    }

    /// Materialize the items this value yields when iterated.
    ///
    /// Ranges longer than [`MAX_MATERIALIZED_RANGE`] raise; loops and comprehensions walk them lazily instead.
    pub fn iterate(&self) -> RuntimeResult<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Dict(map) => Ok(map.borrow().keys().map(HashKey::to_value).collect()),
            Value::Set(set) => Ok(set.borrow().iter().map(HashKey::to_value).collect()),
            Value::Range { start, step, .. } => {
                let n = self.range_len().unwrap_or(0);
                if n > MAX_MATERIALIZED_RANGE {
                    return Err(RuntimeError::value_error(format!(
                        "range of {n} items is too large to materialize"
                    )));
                }
                Ok((0..n as i64).map(|i| Value::Int(start + i * step)).collect())
            }
            Value::Object(o) => o.iterate().ok_or_else(|| {
                RuntimeError::type_error(format!("'{}' object is not iterable", o.type_name()))
            }),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    pub fn len(&self) -> RuntimeResult<usize> {
        let n = match self {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.borrow().len(),
            Value::Tuple(items) => items.len(),
            Value::Dict(map) => map.borrow().len(),
            Value::Set(set) => set.borrow().len(),
            Value::Range { .. } => self.range_len().unwrap_or(0),
            Value::Object(o) => match o.len() {
                Some(n) => n,
                None => {
                    return Err(RuntimeError::type_error(format!(
                        "object of type '{}' has no len()",
                        o.type_name()
                    )));
                }
            },
            other => {
                return Err(RuntimeError::type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                )));
            }
        };
        Ok(n)
    }

    /// `str(value)`
    pub fn to_display(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Object(o) => o.to_display(),
            Value::Exception(e) => e.message.clone(),
            other => other.repr(),
        }
    }

    /// `repr(value)`
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => quote_str(s),
            Value::List(items) => format!("[{}]", join_repr(items.borrow().iter())),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items.iter())),
            Value::Dict(map) => {
                let inner: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_value().repr(), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Set(set) if set.borrow().is_empty() => "set()".to_string(),
            Value::Set(set) => {
                let items: Vec<Value> = set.borrow().iter().map(HashKey::to_value).collect();
                format!("{{{}}}", join_repr(items.iter()))
            }
            Value::Range { start, stop, step: 1 } => format!("range({start}, {stop})"),
            Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Value::Function(f) => format!("<function {}>", f.name),
            Value::Native(f) => format!("<built-in function {}>", f.name),
            Value::Module(path) => format!("<module '{path}'>"),
            Value::Object(o) => o.repr(),
            Value::ExceptionType(kind) => format!("<class '{kind}'>"),
            Value::Exception(e) => format!("{}({})", e.kind, quote_str(&e.message)),
        }
    }

    /// `==`
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || seq_eq(&a.borrow(), &b.borrow())
            }
            (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.py_eq(w)))
            }
            (Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|k| b.contains(k))
            }
            (Value::Range { .. }, Value::Range { .. }) => {
                seq_eq(&self.iterate().unwrap_or_default(), &other.iterate().unwrap_or_default())
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// `is`: identity for reference types, equality for immutable scalars.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
            _ => self.py_eq(other),
        }
    }

    /// Ordering for `<`, `sorted`, `min` and `max`.
    pub fn py_cmp(&self, other: &Value) -> RuntimeResult<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => seq_cmp(&a.borrow(), &b.borrow()),
            (Value::Tuple(a), Value::Tuple(b)) => seq_cmp(a, b),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| {
                    RuntimeError::value_error("cannot order NaN")
                }),
                _ => Err(RuntimeError::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }

    /// `item in self`
    pub fn contains(&self, item: &Value) -> RuntimeResult<bool> {
        match self {
            Value::Str(s) => match item {
                Value::Str(needle) => Ok(s.contains(&**needle)),
                other => Err(RuntimeError::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ))),
            },
            Value::Dict(map) => Ok(map.borrow().contains_key(&item.to_key()?)),
            Value::Set(set) => Ok(set.borrow().contains(&item.to_key()?)),
            Value::List(items) => Ok(items.borrow().iter().any(|v| v.py_eq(item))),
            Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
            other => Ok(other.iterate()?.iter().any(|v| v.py_eq(item))),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

fn seq_cmp(a: &[Value], b: &[Value]) -> RuntimeResult<Ordering> {
    for (x, y) in a.iter().zip(b) {
        match x.py_cmp(y)? {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(a.len().cmp(&b.len()))
}

fn join_repr<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// Floats always show a fractional part, like `1.0`.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Single-quoted repr, switching to double quotes when the text contains a single quote.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
