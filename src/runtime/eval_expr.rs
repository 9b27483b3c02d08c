//! Expression evaluation, operators, attribute and item access.

use std::rc::Rc;

use cellbook_core::ErrorKind;
use cellbook_syntax::ast::{BinaryOp, CallArg, Expr, FStringPart, Literal, SliceExpr, Spanned, Target, UnaryOp};
use indexmap::{IndexMap, IndexSet};

use super::{Interpreter, with_stack};
use super::env::FrameKind;
use super::errors::{RuntimeError, RuntimeResult};
use super::format::format_value;
use super::methods;
use super::object::Args;
use super::value::{HashKey, Value};

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Spanned<Expr>) -> RuntimeResult<Value> {
        with_stack(|| self.eval_node(expr))
    }

    fn eval_node(&mut self, expr: &Spanned<Expr>) -> RuntimeResult<Value> {
        match &expr.node {
            Expr::Literal(lit) => Ok(literal(lit)),
            Expr::Ident(name) => self.lookup(name),
            Expr::Attribute(object, name) => {
                let object = self.eval(object)?;
                self.get_attr(&object, name)
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(callee)?;
                let args = self.eval_args(args)?;
                self.call_value(&callee, args)
            }
            Expr::MethodCall(receiver, name, args) => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_args(args)?;
                self.call_method(&receiver, name, args)
            }
            Expr::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.get_item(&object, &index)
            }
            Expr::Slice(object, slice) => {
                let object = self.eval(object)?;
                self.eval_slice(&object, slice)
            }
            Expr::Binary(left, op, right) => match op {
                BinaryOp::And => {
                    let l = self.eval(left)?;
                    if l.truthy() { self.eval(right) } else { Ok(l) }
                }
                BinaryOp::Or => {
                    let l = self.eval(left)?;
                    if l.truthy() { Ok(l) } else { self.eval(right) }
                }
                _ => {
                    let l = self.eval(left)?;
                    let r = self.eval(right)?;
                    self.binary_op(*op, &l, &r)
                }
            },
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                    UnaryOp::Neg => match v {
                        Value::Int(i) => i
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or_else(|| RuntimeError::value_error("integer overflow")),
                        Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::type_error(format!(
                            "bad operand type for unary -: '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Conditional(cond) => {
                if self.eval(&cond.condition)?.truthy() {
                    self.eval(&cond.then)
                } else {
                    self.eval(&cond.otherwise)
                }
            }
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Set(items) => {
                let mut set = IndexSet::new();
                for item in items {
                    set.insert(self.eval(item)?.to_key()?);
                }
                Ok(Value::set(set))
            }
            Expr::Dict(entries) => {
                let mut map = IndexMap::new();
                for (k, v) in entries {
                    let key = self.eval(k)?.to_key()?;
                    let value = self.eval(v)?;
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }
            Expr::ListComp(comp) => {
                let mut out = Vec::new();
                self.comprehension(&comp.target.node, &comp.iter, comp.filter.as_ref(), |interp| {
                    out.push(interp.eval(&comp.expr)?);
                    Ok(())
                })?;
                Ok(Value::list(out))
            }
            Expr::DictComp(comp) => {
                let mut map = IndexMap::new();
                self.comprehension(&comp.target.node, &comp.iter, comp.filter.as_ref(), |interp| {
                    let key = interp.eval(&comp.key)?.to_key()?;
                    let value = interp.eval(&comp.value)?;
                    map.insert(key, value);
                    Ok(())
                })?;
                Ok(Value::dict(map))
            }
            Expr::FString(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => out.push_str(text),
                        FStringPart::Expr { expr, format_spec } => {
                            let value = self.eval(expr)?;
                            out.push_str(&format_value(&value, format_spec.as_deref())?);
                        }
                    }
                }
                Ok(Value::str(out))
            }
            Expr::Paren(inner) => self.eval(inner),
        }
    }

    fn eval_all(&mut self, items: &[Spanned<Expr>]) -> RuntimeResult<Vec<Value>> {
        items.iter().map(|item| self.eval(item)).collect()
    }

    fn eval_args(&mut self, args: &[CallArg]) -> RuntimeResult<Args> {
        let mut out = Args::new();
        for arg in args {
            match arg {
                CallArg::Positional(expr) => out.positional.push(self.eval(expr)?),
                CallArg::Named(name, expr) => {
                    let value = self.eval(expr)?;
                    out.named.insert(name.clone(), value);
                }
            }
        }
        Ok(out)
    }

    /// Run `body` once per item in a comprehension frame.
    fn comprehension(
        &mut self,
        target: &Target,
        iter: &Spanned<Expr>,
        filter: Option<&Spanned<Expr>>,
        mut body: impl FnMut(&mut Interpreter) -> RuntimeResult<()>,
    ) -> RuntimeResult<()> {
        let iterable = self.eval(iter)?;
        self.env.push_frame(FrameKind::Comprehension);
        let result = self.walk(&iterable, |interp, item| {
            interp.assign_target(target, item)?;
            if let Some(filter) = filter {
                if !interp.eval(filter)?.truthy() {
                    return Ok(true);
                }
            }
            body(interp)?;
            Ok(true)
        });
        self.env.pop_frame();
        result
    }

    /// Feed each item of `iterable` to `step`, checking the deadline before every item.
    ///
    /// Ranges are walked lazily. `step` returns `false` to stop early.
    pub(crate) fn walk(
        &mut self,
        iterable: &Value,
        mut step: impl FnMut(&mut Interpreter, Value) -> RuntimeResult<bool>,
    ) -> RuntimeResult<()> {
        if let Value::Range { start, step: stride, .. } = iterable {
            let n = iterable.range_len().unwrap_or(0);
            for i in 0..n as i64 {
                self.check_deadline()?;
                if !step(self, Value::Int(start + i * stride))? {
                    break;
                }
            }
            return Ok(());
        }
        for item in iterable.iterate()? {
            self.check_deadline()?;
            if !step(self, item)? {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        if let Some(v) = self.env.get(name) {
            return Ok(v);
        }
        if let Some(v) = self.builtin(name) {
            return Ok(v);
        }
        match ErrorKind::from_name(name) {
            Some(kind) => Ok(Value::ExceptionType(kind)),
            None => Err(RuntimeError::name_error(name)),
        }
    }

    // ========================================================================
    // Attributes and methods
    // ========================================================================

    pub fn get_attr(&self, object: &Value, name: &str) -> RuntimeResult<Value> {
        match object {
            Value::Object(obj) => obj.get_attr(name),
            Value::Module(path) => self.modules.get_attr(path, name).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::AttributeError,
                    format!("module '{path}' has no attribute '{name}'"),
                )
            }),
            Value::Function(f) if name == "__name__" => Ok(Value::str(&f.name)),
            Value::Exception(e) if name == "args" => Ok(Value::tuple(vec![Value::str(&e.message)])),
            other if methods::has_method(other, name) => Ok(methods::bind(other.clone(), name)),
            other => Err(RuntimeError::no_attribute(&other.type_name(), name)),
        }
    }

    pub(crate) fn set_attr(&mut self, object: &Value, name: &str, value: Value) -> RuntimeResult<()> {
        match object {
            Value::Object(obj) => obj.set_attr(name, value),
            other => Err(RuntimeError::new(
                ErrorKind::AttributeError,
                format!("'{}' object attribute '{}' is read-only", other.type_name(), name),
            )),
        }
    }

    pub fn call_method(&mut self, receiver: &Value, name: &str, args: Args) -> RuntimeResult<Value> {
        match receiver {
            Value::Object(obj) => {
                let obj = Rc::clone(obj);
                obj.call_method(self, name, args)
            }
            other if methods::has_method(other, name) => methods::call(self, other, name, args),
            other => {
                let callee = self.get_attr(other, name)?;
                self.call_value(&callee, args)
            }
        }
    }

    // ========================================================================
    // Items and slices
    // ========================================================================

    pub fn get_item(&self, object: &Value, index: &Value) -> RuntimeResult<Value> {
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let i = normalize_index(index, items.len(), "list")?;
                Ok(items[i].clone())
            }
            Value::Tuple(items) => {
                let i = normalize_index(index, items.len(), "tuple")?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = normalize_index(index, chars.len(), "string")?;
                Ok(Value::str(chars[i].to_string()))
            }
            Value::Range { .. } => {
                let items = object.iterate()?;
                let i = normalize_index(index, items.len(), "range object")?;
                Ok(items[i].clone())
            }
            Value::Dict(map) => {
                let key = index.to_key()?;
                map.borrow()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RuntimeError::key_error(index.repr()))
            }
            Value::Object(obj) => obj.get_item(index),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn set_item(&mut self, object: &Value, index: &Value, value: Value) -> RuntimeResult<()> {
        match object {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = normalize_index(index, items.len(), "list assignment")?;
                items[i] = value;
                Ok(())
            }
            Value::Dict(map) => {
                let key = index.to_key()?;
                map.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn delete_item(&mut self, object: &Value, index: &Value) -> RuntimeResult<()> {
        match object {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = normalize_index(index, items.len(), "list assignment")?;
                items.remove(i);
                Ok(())
            }
            Value::Dict(map) => {
                let key = index.to_key()?;
                match map.borrow_mut().shift_remove(&key) {
                    Some(_) => Ok(()),
                    None => Err(RuntimeError::key_error(index.repr())),
                }
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object does not support item deletion",
                other.type_name()
            ))),
        }
    }

    fn eval_slice(&mut self, object: &Value, slice: &SliceExpr) -> RuntimeResult<Value> {
        let mut bound = |part: &Option<Box<Spanned<Expr>>>| -> RuntimeResult<Option<i64>> {
            match part {
                Some(expr) => match self.eval(expr)? {
                    Value::None => Ok(None),
                    v => Ok(Some(v.expect_int("slice indices")?)),
                },
                None => Ok(None),
            }
        };
        let start = bound(&slice.start)?;
        let end = bound(&slice.end)?;
        let step = bound(&slice.step)?.unwrap_or(1);
        if step == 0 {
            return Err(RuntimeError::value_error("slice step cannot be zero"));
        }

        match object {
            Value::List(items) => {
                let items = items.borrow();
                Ok(Value::list(slice_indices(items.len(), start, end, step).map(|i| items[i].clone()).collect()))
            }
            Value::Tuple(items) => Ok(Value::tuple(
                slice_indices(items.len(), start, end, step).map(|i| items[i].clone()).collect(),
            )),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::str(
                    slice_indices(chars.len(), start, end, step).map(|i| chars[i]).collect::<String>(),
                ))
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not sliceable",
                other.type_name()
            ))),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub(crate) fn binary_op(&mut self, op: BinaryOp, l: &Value, r: &Value) -> RuntimeResult<Value> {
        match op {
            BinaryOp::Eq => Ok(Value::Bool(l.py_eq(r))),
            BinaryOp::NotEq => Ok(Value::Bool(!l.py_eq(r))),
            BinaryOp::Lt => Ok(Value::Bool(l.py_cmp(r)?.is_lt())),
            BinaryOp::LtEq => Ok(Value::Bool(l.py_cmp(r)?.is_le())),
            BinaryOp::Gt => Ok(Value::Bool(l.py_cmp(r)?.is_gt())),
            BinaryOp::GtEq => Ok(Value::Bool(l.py_cmp(r)?.is_ge())),
            BinaryOp::In => Ok(Value::Bool(r.contains(l)?)),
            BinaryOp::NotIn => Ok(Value::Bool(!r.contains(l)?)),
            BinaryOp::Is => Ok(Value::Bool(l.is_same(r))),
            BinaryOp::IsNot => Ok(Value::Bool(!l.is_same(r))),
            BinaryOp::And => Ok(if l.truthy() { r.clone() } else { l.clone() }),
            BinaryOp::Or => Ok(if l.truthy() { l.clone() } else { r.clone() }),
            BinaryOp::Add => add(l, r),
            BinaryOp::Sub => sub(l, r),
            BinaryOp::Mul => mul(l, r),
            BinaryOp::Div => {
                let (a, b) = float_operands(op, l, r)?;
                if b == 0.0 {
                    return Err(RuntimeError::zero_division("division by zero"));
                }
                Ok(Value::Float(a / b))
            }
            BinaryOp::FloorDiv => match (l.as_int(), r.as_int()) {
                (Some(_), Some(0)) => Err(RuntimeError::zero_division("integer division or modulo by zero")),
                (Some(a), Some(b)) => {
                    let q = a.checked_div_euclid(b).ok_or_else(overflow)?;
                    let r = a.checked_rem_euclid(b).ok_or_else(overflow)?;
                    Ok(Value::Int(q - i64::from(b < 0 && r != 0)))
                }
                _ => {
                    let (a, b) = float_operands(op, l, r)?;
                    if b == 0.0 {
                        return Err(RuntimeError::zero_division("float floor division by zero"));
                    }
                    Ok(Value::Float((a / b).floor()))
                }
            },
            BinaryOp::Mod => match (l.as_int(), r.as_int()) {
                (Some(_), Some(0)) => Err(RuntimeError::zero_division("integer division or modulo by zero")),
                (Some(a), Some(b)) => {
                    let r = a.checked_rem_euclid(b).ok_or_else(overflow)?;
                    Ok(Value::Int(if b < 0 && r != 0 { r + b } else { r }))
                }
                _ => {
                    let (a, b) = float_operands(op, l, r)?;
                    if b == 0.0 {
                        return Err(RuntimeError::zero_division("float modulo"));
                    }
                    Ok(Value::Float(a - b * (a / b).floor()))
                }
            },
            BinaryOp::Pow => match (l.as_int(), r.as_int()) {
                (Some(a), Some(b)) if b >= 0 => u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_pow(b))
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::value_error("integer overflow")),
                _ => {
                    let (a, b) = float_operands(op, l, r)?;
                    Ok(Value::Float(a.powf(b)))
                }
            },
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::str(s),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::None => Value::None,
    }
}

fn unsupported(op: BinaryOp, l: &Value, r: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        l.type_name(),
        r.type_name()
    ))
}

fn float_operands(op: BinaryOp, l: &Value, r: &Value) -> RuntimeResult<(f64, f64)> {
    match (l.as_float(), r.as_float()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(unsupported(op, l, r)),
    }
}

fn overflow() -> RuntimeError {
    RuntimeError::value_error("integer overflow")
}

fn add(l: &Value, r: &Value) -> RuntimeResult<Value> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Tuple(a), Value::Tuple(b)) => Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect())),
        _ => match (l.as_int(), r.as_int()) {
            (Some(a), Some(b)) => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            _ => float_operands(BinaryOp::Add, l, r).map(|(a, b)| Value::Float(a + b)),
        },
    }
}

fn sub(l: &Value, r: &Value) -> RuntimeResult<Value> {
    match (l, r) {
        (Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            Ok(Value::set(a.borrow().iter().filter(|k| !b.contains(*k)).cloned().collect()))
        }
        _ => match (l.as_int(), r.as_int()) {
            (Some(a), Some(b)) => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            _ => float_operands(BinaryOp::Sub, l, r).map(|(a, b)| Value::Float(a - b)),
        },
    }
}

fn repeat(items: &[Value], times: i64) -> Vec<Value> {
    let times = usize::try_from(times).unwrap_or(0);
    let mut out = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        out.extend(items.iter().cloned());
    }
    out
}

fn mul(l: &Value, r: &Value) -> RuntimeResult<Value> {
    match (l, r) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::str(s.repeat(usize::try_from(*n).unwrap_or(0))))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            Ok(Value::list(repeat(&items.borrow(), *n)))
        }
        (Value::Tuple(items), Value::Int(n)) | (Value::Int(n), Value::Tuple(items)) => {
            Ok(Value::tuple(repeat(items, *n)))
        }
        _ => match (l.as_int(), r.as_int()) {
            (Some(a), Some(b)) => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            _ => float_operands(BinaryOp::Mul, l, r).map(|(a, b)| Value::Float(a * b)),
        },
    }
}

/// Resolve a possibly negative index against `len`.
pub(crate) fn normalize_index(index: &Value, len: usize, what: &str) -> RuntimeResult<usize> {
    let i = index.as_int().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{what} indices must be integers, not {}",
            index.type_name()
        ))
    })?;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::index_out_of_range(what));
    }
    Ok(resolved as usize)
}

/// Indices selected by `[start:end:step]`, clamped the way sequence slicing clamps.
fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: i64) -> impl Iterator<Item = usize> {
    let len = len as i64;
    let clamp = |v: i64, lo: i64, hi: i64| -> i64 {
        let v = if v < 0 { v + len } else { v };
        v.clamp(lo, hi)
    };
    let (start, end) = if step > 0 {
        (
            start.map_or(0, |s| clamp(s, 0, len)),
            end.map_or(len, |e| clamp(e, 0, len)),
        )
    } else {
        (
            start.map_or(len - 1, |s| clamp(s, -1, len - 1)),
            end.map_or(-1, |e| clamp(e, -1, len - 1)),
        )
    };

    let mut i = start;
    std::iter::from_fn(move || {
        let in_range = if step > 0 { i < end } else { i > end };
        if in_range {
            let current = i;
            i += step;
            Some(current as usize)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_indices() {
        let collect = |start, end, step| slice_indices(5, start, end, step).collect::<Vec<_>>();
        assert_eq!(collect(Some(1), Some(-1), 1), vec![1, 2, 3]);
        assert_eq!(collect(None, None, 2), vec![0, 2, 4]);
        assert_eq!(collect(None, None, -1), vec![4, 3, 2, 1, 0]);
        assert_eq!(collect(Some(10), None, 1), Vec::<usize>::new());
        assert_eq!(collect(None, Some(-10), -1), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(&Value::Int(-1), 3, "list").unwrap(), 2);
        let err = normalize_index(&Value::Int(3), 3, "list").unwrap_err();
        assert_eq!(err.to_string(), "IndexError: list index out of range");
        assert!(normalize_index(&Value::str("0"), 3, "list").is_err());
    }
}
