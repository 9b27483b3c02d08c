//! Builtin functions
//!
//! The set of names comes from [`cellbook_core::lang::builtins::BUILTIN_FUNCTIONS`]; this module supplies the
//! implementation behind each id.

use std::cell::RefCell;
use std::cmp::Ordering;

use cellbook_core::ErrorKind;
use cellbook_core::lang::builtins::{BUILTIN_FUNCTIONS, BuiltinFnId};
use indexmap::{IndexMap, IndexSet};

use super::Interpreter;
use super::errors::{RuntimeError, RuntimeResult};
use super::object::Args;
use super::value::Value;

/// Builtin name -> callable, in registry order.
pub fn table() -> IndexMap<&'static str, Value> {
    BUILTIN_FUNCTIONS
        .iter()
        .map(|info| {
            let id = info.id;
            let value = Value::native(info.canonical, move |interp, args| call(id, interp, args));
            (info.canonical, value)
        })
        .collect()
}

fn call(id: BuiltinFnId, interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    match id {
        BuiltinFnId::Print => print(interp, args).map(|()| Value::None),
        BuiltinFnId::Len => {
            args.check("len", 1, &[])?;
            let n = args.require("len", 0, "obj")?.len()?;
            Ok(Value::Int(n as i64))
        }
        BuiltinFnId::Range => range(&args),
        BuiltinFnId::Str => {
            args.check("str", 1, &[])?;
            Ok(Value::str(args.get(0, "object").map(Value::to_display).unwrap_or_default()))
        }
        BuiltinFnId::Int => to_int(&args),
        BuiltinFnId::Float => to_float(&args),
        BuiltinFnId::Bool => {
            args.check("bool", 1, &[])?;
            Ok(Value::Bool(args.get(0, "x").is_some_and(Value::truthy)))
        }
        BuiltinFnId::List => Ok(Value::list(optional_items(&args, "list")?)),
        BuiltinFnId::Tuple => Ok(Value::tuple(optional_items(&args, "tuple")?)),
        BuiltinFnId::Set => {
            let mut set = IndexSet::new();
            for item in optional_items(&args, "set")? {
                set.insert(item.to_key()?);
            }
            Ok(Value::set(set))
        }
        BuiltinFnId::Dict => dict(args),
        BuiltinFnId::Sorted => {
            args.check("sorted", 1, &["key", "reverse"])?;
            let items = args.require("sorted", 0, "iterable")?.iterate()?;
            let key = args.named.get("key").filter(|k| !k.is_none()).cloned();
            let reverse = args.named.get("reverse").is_some_and(Value::truthy);
            Ok(Value::list(sort_values(interp, items, key.as_ref(), reverse)?))
        }
        BuiltinFnId::Min => extreme(interp, args, "min", Ordering::Less),
        BuiltinFnId::Max => extreme(interp, args, "max", Ordering::Greater),
        BuiltinFnId::Sum => {
            args.check("sum", 2, &["start"])?;
            let mut total = args.get(1, "start").cloned().unwrap_or(Value::Int(0));
            interp.walk(args.require("sum", 0, "iterable")?, |interp, item| {
                total = interp.binary_op(cellbook_syntax::ast::BinaryOp::Add, &total, &item)?;
                Ok(true)
            })?;
            Ok(total)
        }
        BuiltinFnId::Abs => match args.require("abs", 0, "x")? {
            Value::Int(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::value_error("integer overflow")),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(RuntimeError::type_error(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
        },
        BuiltinFnId::Round => round(&args),
        BuiltinFnId::Enumerate => {
            args.check("enumerate", 2, &["start"])?;
            let items = args.require("enumerate", 0, "iterable")?.iterate()?;
            let start = match args.get(1, "start") {
                Some(v) => v.expect_int("enumerate() start")?,
                None => 0,
            };
            Ok(Value::list(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Value::tuple(vec![Value::Int(start + i as i64), v]))
                    .collect(),
            ))
        }
        BuiltinFnId::Zip => {
            let columns = args
                .positional
                .iter()
                .map(Value::iterate)
                .collect::<RuntimeResult<Vec<_>>>()?;
            let n = columns.iter().map(Vec::len).min().unwrap_or(0);
            Ok(Value::list(
                (0..n)
                    .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
                    .collect(),
            ))
        }
        BuiltinFnId::Any => {
            let mut found = false;
            interp.walk(args.require("any", 0, "iterable")?, |_, item| {
                found = item.truthy();
                Ok(!found)
            })?;
            Ok(Value::Bool(found))
        }
        BuiltinFnId::All => {
            let mut holds = true;
            interp.walk(args.require("all", 0, "iterable")?, |_, item| {
                holds = item.truthy();
                Ok(holds)
            })?;
            Ok(Value::Bool(holds))
        }
        BuiltinFnId::Isinstance => {
            args.check("isinstance", 2, &[])?;
            let value = args.require("isinstance", 0, "obj")?;
            let class = args.require("isinstance", 1, "class_or_tuple")?;
            Ok(Value::Bool(is_instance(value, class)?))
        }
    }
}

fn print(interp: &mut Interpreter, args: Args) -> RuntimeResult<()> {
    args.check("print", usize::MAX, &["sep", "end"])?;
    let sep = match args.named.get("sep") {
        Some(Value::None) | None => " ".to_string(),
        Some(v) => v.expect_str("sep")?.to_string(),
    };
    let end = match args.named.get("end") {
        Some(Value::None) | None => "\n".to_string(),
        Some(v) => v.expect_str("end")?.to_string(),
    };
    let text: Vec<String> = args.positional.iter().map(Value::to_display).collect();
    let line = format!("{}{}", text.join(&sep), end);
    interp.print_line(line.strip_suffix('\n').unwrap_or(&line).to_string());
    Ok(())
}

fn range(args: &Args) -> RuntimeResult<Value> {
    args.check("range", 3, &[])?;
    let ints = args
        .positional
        .iter()
        .map(|v| v.expect_int("range() argument"))
        .collect::<RuntimeResult<Vec<_>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(RuntimeError::type_error("range expected at least 1 argument, got 0")),
    };
    if step == 0 {
        return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn to_int(args: &Args) -> RuntimeResult<Value> {
    args.check("int", 1, &[])?;
    match args.get(0, "x") {
        None => Ok(Value::Int(0)),
        Some(Value::Int(i)) => Ok(Value::Int(*i)),
        Some(Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        Some(Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Some(Value::Float(f)) => Err(RuntimeError::value_error(format!(
            "cannot convert float {} to integer",
            super::value::format_float(*f)
        ))),
        Some(Value::Str(s)) => s.trim().replace('_', "").parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::value_error(format!(
                "invalid literal for int() with base 10: {}",
                super::value::quote_str(s)
            ))
        }),
        Some(other) => Err(RuntimeError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(args: &Args) -> RuntimeResult<Value> {
    args.check("float", 1, &[])?;
    match args.get(0, "x") {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(s)) => {
            let text = s.trim().to_ascii_lowercase();
            let parsed = match text.as_str() {
                "nan" | "+nan" | "-nan" => Some(f64::NAN),
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                _ => text.parse::<f64>().ok(),
            };
            parsed.map(Value::Float).ok_or_else(|| {
                RuntimeError::value_error(format!(
                    "could not convert string to float: {}",
                    super::value::quote_str(s)
                ))
            })
        }
        Some(v) => v.expect_float("float() argument").map(Value::Float),
    }
}

fn optional_items(args: &Args, func: &str) -> RuntimeResult<Vec<Value>> {
    args.check(func, 1, &[])?;
    match args.get(0, "iterable") {
        Some(v) => v.iterate(),
        None => Ok(Vec::new()),
    }
}

fn dict(args: Args) -> RuntimeResult<Value> {
    args.check("dict", 1, &[])?;
    let mut map = IndexMap::new();
    if let Some(source) = args.positional.first() {
        if let Value::Dict(other) = source {
            map.extend(other.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
        } else {
            for pair in source.iterate()? {
                let items = pair.iterate()?;
                let [k, v] = items.as_slice() else {
                    return Err(RuntimeError::value_error(format!(
                        "dictionary update sequence element has length {}; 2 is required",
                        items.len()
                    )));
                };
                map.insert(k.to_key()?, v.clone());
            }
        }
    }
    for (name, value) in args.named {
        map.insert(Value::str(&name).to_key()?, value);
    }
    Ok(Value::dict(map))
}

/// Stable sort of `items`, by `key(item)` when given.
pub(crate) fn sort_values(
    interp: &mut Interpreter,
    items: Vec<Value>,
    key: Option<&Value>,
    reverse: bool,
) -> RuntimeResult<Vec<Value>> {
    let keys = match key {
        Some(key) => items
            .iter()
            .map(|item| interp.call_value(key, Args::positional(vec![item.clone()])))
            .collect::<RuntimeResult<Vec<_>>>()?,
        None => items.clone(),
    };

    let failure: RefCell<Option<RuntimeError>> = RefCell::new(None);
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = if reverse { (&keys[b], &keys[a]) } else { (&keys[a], &keys[b]) };
        x.py_cmp(y).unwrap_or_else(|e| {
            failure.borrow_mut().get_or_insert(e);
            Ordering::Equal
        })
    });
    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    Ok(order.into_iter().map(|i| items[i].clone()).collect())
}

fn extreme(interp: &mut Interpreter, args: Args, func: &str, want: Ordering) -> RuntimeResult<Value> {
    args.check(func, usize::MAX, &["key", "default"])?;
    let items = match args.positional.as_slice() {
        [single] => single.iterate()?,
        [] => return Err(RuntimeError::type_error(format!("{func} expected at least 1 argument, got 0"))),
        many => many.to_vec(),
    };
    let key = args.named.get("key").filter(|k| !k.is_none());

    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let k = match key {
            Some(key) => interp.call_value(key, Args::positional(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_key, _)) => k.py_cmp(best_key)? == want,
        };
        if replace {
            best = Some((k, item));
        }
    }
    match (best, args.named.get("default")) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(RuntimeError::value_error(format!("{func}() arg is an empty sequence"))),
    }
}

fn round(args: &Args) -> RuntimeResult<Value> {
    args.check("round", 2, &["ndigits"])?;
    let number = args.require("round", 0, "number")?;
    let ndigits = match args.get_some(1, "ndigits") {
        Some(v) => Some(v.expect_int("ndigits")?),
        None => None,
    };
    match (number, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(number.as_int().unwrap_or(0))),
        (Value::Int(_) | Value::Bool(_), Some(_)) => Ok(number.clone()),
        (Value::Float(f), None) => Ok(Value::Int(f.round_ties_even() as i64)),
        (Value::Float(f), Some(n)) => {
            let factor = 10f64.powi(n.clamp(-308, 308) as i32);
            Ok(Value::Float((f * factor).round_ties_even() / factor))
        }
        (other, _) => Err(RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn is_instance(value: &Value, class: &Value) -> RuntimeResult<bool> {
    match class {
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if is_instance(value, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Native(native) => {
            let type_name = value.type_name();
            Ok(type_name == native.name || (native.name == "int" && type_name == "bool"))
        }
        Value::ExceptionType(kind) => Ok(matches!(value, Value::Exception(e) if e.kind == *kind)),
        other => Err(RuntimeError::new(
            ErrorKind::TypeError,
            format!(
                "isinstance() arg 2 must be a type or tuple of types, not {}",
                other.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;

    fn call_builtin(name: &str, args: Args) -> RuntimeResult<Value> {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let id = cellbook_core::lang::builtins::from_str(name).unwrap();
        call(id, &mut interp, args)
    }

    #[test]
    fn test_table_covers_registry() {
        let table = table();
        assert_eq!(table.len(), BUILTIN_FUNCTIONS.len());
        assert!(table.contains_key("isinstance"));
    }

    #[test]
    fn test_round_half_to_even() {
        let r = |f| call_builtin("round", Args::positional(vec![Value::Float(f)])).unwrap();
        assert!(matches!(r(2.5), Value::Int(2)));
        assert!(matches!(r(3.5), Value::Int(4)));
        let two_places = call_builtin(
            "round",
            Args::positional(vec![Value::Float(0.12345), Value::Int(2)]),
        )
        .unwrap();
        assert!(two_places.py_eq(&Value::Float(0.12)));
    }

    #[test]
    fn test_range_rejects_zero_step() {
        let err = call_builtin("range", Args::positional(vec![Value::Int(0), Value::Int(3), Value::Int(0)]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
    }

    #[test]
    fn test_int_parsing() {
        assert!(matches!(
            call_builtin("int", Args::positional(vec![Value::str(" 42 ")])).unwrap(),
            Value::Int(42)
        ));
        let err = call_builtin("int", Args::positional(vec![Value::str("4.2")])).unwrap_err();
        assert_eq!(err.message, "invalid literal for int() with base 10: '4.2'");
    }

    #[test]
    fn test_min_max_and_default() {
        let xs = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(matches!(call_builtin("min", Args::positional(vec![xs.clone()])).unwrap(), Value::Int(1)));
        assert!(matches!(call_builtin("max", Args::positional(vec![xs])).unwrap(), Value::Int(3)));
        let empty = Args::positional(vec![Value::list(vec![])]);
        assert!(call_builtin("max", empty.clone()).is_err());
        assert!(call_builtin("max", empty.with_named("default", Value::None)).unwrap().is_none());
    }

    #[test]
    fn test_sorted_is_stable_in_reverse() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let pairs = vec![
            Value::tuple(vec![Value::Int(1), Value::str("a")]),
            Value::tuple(vec![Value::Int(1), Value::str("b")]),
            Value::tuple(vec![Value::Int(2), Value::str("c")]),
        ];
        let first = Value::native("first", |interp, args| {
            let pair = args.require("first", 0, "pair")?;
            interp.get_item(pair, &Value::Int(0))
        });
        let sorted = sort_values(&mut interp, pairs, Some(&first), true).unwrap();
        let labels: Vec<String> = sorted.iter().map(|p| p.repr()).collect();
        assert_eq!(labels, vec!["(2, 'c')", "(1, 'a')", "(1, 'b')"]);
    }

    #[test]
    fn test_sorted_mixed_types_fails() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let err = sort_values(&mut interp, vec![Value::Int(1), Value::str("a")], None, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_isinstance_bool_is_int() {
        let int = table().get("int").cloned().unwrap();
        assert!(is_instance(&Value::Bool(true), &int).unwrap());
        assert!(!is_instance(&Value::str("1"), &int).unwrap());
    }

    #[test]
    fn test_print_captures_output() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let args = Args::positional(vec![Value::str("rows"), Value::Int(3)]).with_named("sep", Value::str("="));
        print(&mut interp, args).unwrap();
        assert_eq!(interp.output(), &["rows=3".to_string()]);
    }
}
