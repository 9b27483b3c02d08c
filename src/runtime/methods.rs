//! Methods of builtin types (`str`, `list`, `dict`, `set`, `tuple`).

use std::rc::Rc;

use indexmap::IndexSet;

use super::Interpreter;
use super::builtins::sort_values;
use super::errors::{RuntimeError, RuntimeResult};
use super::object::Args;
use super::value::{HashKey, Value};

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "startswith", "endswith", "replace", "find",
    "count", "title", "isdigit",
];
const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "copy", "clear",
];
const DICT_METHODS: &[&str] = &["get", "keys", "values", "items", "pop", "update", "setdefault", "copy", "clear"];
const SET_METHODS: &[&str] = &["add", "discard", "remove", "update", "union", "intersection", "difference", "copy"];
const TUPLE_METHODS: &[&str] = &["count", "index"];

pub(crate) fn has_method(receiver: &Value, name: &str) -> bool {
    let table = match receiver {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

/// `xs.append` without a call: a native closure bound to the receiver.
pub(crate) fn bind(receiver: Value, name: &str) -> Value {
    let method = name.to_string();
    Value::native(name, move |interp, args| call(interp, &receiver, &method, args))
}

pub(crate) fn call(interp: &mut Interpreter, receiver: &Value, name: &str, args: Args) -> RuntimeResult<Value> {
    match receiver {
        Value::Str(s) => str_method(s, name, &args),
        Value::List(_) => list_method(interp, receiver, name, args),
        Value::Dict(_) => dict_method(receiver, name, &args),
        Value::Set(_) => set_method(receiver, name, &args),
        Value::Tuple(items) => sequence_method(items, "tuple", name, &args),
        other => Err(RuntimeError::no_attribute(&other.type_name(), name)),
    }
}

fn str_arg(args: &Args, func: &str, index: usize, name: &str) -> RuntimeResult<Rc<str>> {
    args.require(func, index, name)?.expect_str(name)
}

fn str_method(s: &str, name: &str, args: &Args) -> RuntimeResult<Value> {
    let strip_chars = |index: usize| -> RuntimeResult<Option<Vec<char>>> {
        match args.get_some(index, "chars") {
            Some(v) => Ok(Some(v.expect_str("chars")?.chars().collect())),
            None => Ok(None),
        }
    };
    let value = match name {
        "upper" => Value::str(s.to_uppercase()),
        "lower" => Value::str(s.to_lowercase()),
        "strip" | "lstrip" | "rstrip" => {
            let chars = strip_chars(0)?;
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let out = match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            };
            Value::str(out)
        }
        "split" => {
            let maxsplit = match args.get_some(1, "maxsplit") {
                Some(v) => v.expect_int("maxsplit")?,
                None => -1,
            };
            let parts: Vec<Value> = match args.get_some(0, "sep") {
                Some(sep) => {
                    let sep = sep.expect_str("sep")?;
                    if sep.is_empty() {
                        return Err(RuntimeError::value_error("empty separator"));
                    }
                    if maxsplit < 0 {
                        s.split(&*sep).map(Value::str).collect()
                    } else {
                        s.splitn(maxsplit as usize + 1, &*sep).map(Value::str).collect()
                    }
                }
                None => s.split_whitespace().map(Value::str).collect(),
            };
            Value::list(parts)
        }
        "join" => {
            let items = args.require("join", 0, "iterable")?.iterate()?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(text) => parts.push(text.to_string()),
                    None => {
                        return Err(RuntimeError::type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            item.type_name()
                        )));
                    }
                }
            }
            Value::str(parts.join(s))
        }
        "startswith" => Value::Bool(s.starts_with(&*str_arg(args, "startswith", 0, "prefix")?)),
        "endswith" => Value::Bool(s.ends_with(&*str_arg(args, "endswith", 0, "suffix")?)),
        "replace" => {
            let old = str_arg(args, "replace", 0, "old")?;
            let new = str_arg(args, "replace", 1, "new")?;
            Value::str(s.replace(&*old, &new))
        }
        "find" => {
            let needle = str_arg(args, "find", 0, "sub")?;
            match s.find(&*needle) {
                Some(byte) => Value::Int(s[..byte].chars().count() as i64),
                None => Value::Int(-1),
            }
        }
        "count" => Value::Int(s.matches(&*str_arg(args, "count", 0, "sub")?).count() as i64),
        "title" => {
            let mut out = String::with_capacity(s.len());
            let mut at_word_start = true;
            for c in s.chars() {
                if c.is_alphabetic() {
                    if at_word_start {
                        out.extend(c.to_uppercase());
                    } else {
                        out.extend(c.to_lowercase());
                    }
                    at_word_start = false;
                } else {
                    out.push(c);
                    at_word_start = true;
                }
            }
            Value::str(out)
        }
        "isdigit" => Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
        other => return Err(RuntimeError::no_attribute("str", other)),
    };
    Ok(value)
}

fn list_method(interp: &mut Interpreter, receiver: &Value, name: &str, args: Args) -> RuntimeResult<Value> {
    let Value::List(items) = receiver else {
        return Err(RuntimeError::no_attribute(&receiver.type_name(), name));
    };
    match name {
        "append" => {
            let item = args.require("append", 0, "object")?.clone();
            items.borrow_mut().push(item);
        }
        "extend" => {
            let extra = args.require("extend", 0, "iterable")?.iterate()?;
            items.borrow_mut().extend(extra);
        }
        "insert" => {
            let index = args.require("insert", 0, "index")?.expect_int("index")?;
            let item = args.require("insert", 1, "object")?.clone();
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(at as usize, item);
        }
        "pop" => {
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(RuntimeError::new(cellbook_core::ErrorKind::IndexError, "pop from empty list"));
            }
            let index = match args.get(0, "index") {
                Some(v) => super::eval_expr::normalize_index(v, items.len(), "pop")?,
                None => items.len() - 1,
            };
            return Ok(items.remove(index));
        }
        "remove" => {
            let target = args.require("remove", 0, "value")?;
            let mut items = items.borrow_mut();
            match items.iter().position(|v| v.py_eq(target)) {
                Some(i) => {
                    items.remove(i);
                }
                None => return Err(RuntimeError::value_error("list.remove(x): x not in list")),
            }
        }
        "sort" => {
            args.check("sort", 0, &["key", "reverse"])?;
            let key = args.named.get("key").filter(|k| !k.is_none());
            let reverse = args.named.get("reverse").is_some_and(Value::truthy);
            let current = items.borrow().clone();
            let sorted = sort_values(interp, current, key, reverse)?;
            *items.borrow_mut() = sorted;
        }
        "reverse" => items.borrow_mut().reverse(),
        "copy" => return Ok(Value::list(items.borrow().clone())),
        "clear" => items.borrow_mut().clear(),
        "index" | "count" => {
            let snapshot = items.borrow().clone();
            return sequence_method(&snapshot, "list", name, &args);
        }
        other => return Err(RuntimeError::no_attribute("list", other)),
    }
    Ok(Value::None)
}

fn sequence_method(items: &[Value], type_name: &str, name: &str, args: &Args) -> RuntimeResult<Value> {
    let target = args.require(name, 0, "value")?;
    match name {
        "count" => Ok(Value::Int(items.iter().filter(|v| v.py_eq(target)).count() as i64)),
        "index" => items
            .iter()
            .position(|v| v.py_eq(target))
            .map(|i| Value::Int(i as i64))
            .ok_or_else(|| RuntimeError::value_error(format!("{} is not in {type_name}", target.repr()))),
        other => Err(RuntimeError::no_attribute(type_name, other)),
    }
}

fn dict_method(receiver: &Value, name: &str, args: &Args) -> RuntimeResult<Value> {
    let Value::Dict(map) = receiver else {
        return Err(RuntimeError::no_attribute(&receiver.type_name(), name));
    };
    let value = match name {
        "get" => {
            let key = args.require("get", 0, "key")?.to_key()?;
            let default = args.get(1, "default").cloned().unwrap_or(Value::None);
            map.borrow().get(&key).cloned().unwrap_or(default)
        }
        "keys" => Value::list(map.borrow().keys().map(HashKey::to_value).collect()),
        "values" => Value::list(map.borrow().values().cloned().collect()),
        "items" => Value::list(
            map.borrow()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.to_value(), v.clone()]))
                .collect(),
        ),
        "pop" => {
            let key_value = args.require("pop", 0, "key")?;
            let key = key_value.to_key()?;
            let removed = map.borrow_mut().shift_remove(&key);
            match (removed, args.get(1, "default")) {
                (Some(v), _) => v,
                (None, Some(default)) => default.clone(),
                (None, None) => return Err(RuntimeError::key_error(key_value.repr())),
            }
        }
        "update" => {
            if let Some(other) = args.positional.first() {
                let entries: Vec<(HashKey, Value)> = match other {
                    Value::Dict(other) => other.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    other => other
                        .iterate()?
                        .into_iter()
                        .map(|pair| {
                            let kv = pair.iterate()?;
                            match kv.as_slice() {
                                [k, v] => Ok((k.to_key()?, v.clone())),
                                _ => Err(RuntimeError::value_error(
                                    "dictionary update sequence element has wrong length",
                                )),
                            }
                        })
                        .collect::<RuntimeResult<_>>()?,
                };
                map.borrow_mut().extend(entries);
            }
            for (k, v) in &args.named {
                map.borrow_mut().insert(HashKey::Str(Rc::from(k.as_str())), v.clone());
            }
            Value::None
        }
        "setdefault" => {
            let key = args.require("setdefault", 0, "key")?.to_key()?;
            let default = args.get(1, "default").cloned().unwrap_or(Value::None);
            map.borrow_mut().entry(key).or_insert(default).clone()
        }
        "copy" => Value::dict(map.borrow().clone()),
        "clear" => {
            map.borrow_mut().clear();
            Value::None
        }
        other => return Err(RuntimeError::no_attribute("dict", other)),
    };
    Ok(value)
}

fn set_method(receiver: &Value, name: &str, args: &Args) -> RuntimeResult<Value> {
    let Value::Set(set) = receiver else {
        return Err(RuntimeError::no_attribute(&receiver.type_name(), name));
    };
    let other_keys = |func: &str| -> RuntimeResult<IndexSet<HashKey>> {
        args.require(func, 0, "other")?
            .iterate()?
            .iter()
            .map(Value::to_key)
            .collect()
    };
    let value = match name {
        "add" => {
            let key = args.require("add", 0, "elem")?.to_key()?;
            set.borrow_mut().insert(key);
            Value::None
        }
        "discard" => {
            let key = args.require("discard", 0, "elem")?.to_key()?;
            set.borrow_mut().shift_remove(&key);
            Value::None
        }
        "remove" => {
            let elem = args.require("remove", 0, "elem")?;
            if !set.borrow_mut().shift_remove(&elem.to_key()?) {
                return Err(RuntimeError::key_error(elem.repr()));
            }
            Value::None
        }
        "update" => {
            let extra = other_keys("update")?;
            set.borrow_mut().extend(extra);
            Value::None
        }
        "union" => {
            let mut out = set.borrow().clone();
            out.extend(other_keys("union")?);
            Value::set(out)
        }
        "intersection" => {
            let other = other_keys("intersection")?;
            Value::set(set.borrow().iter().filter(|k| other.contains(*k)).cloned().collect())
        }
        "difference" => {
            let other = other_keys("difference")?;
            Value::set(set.borrow().iter().filter(|k| !other.contains(*k)).cloned().collect())
        }
        "copy" => Value::set(set.borrow().clone()),
        other => return Err(RuntimeError::no_attribute("set", other)),
    };
    Ok(value)
}
