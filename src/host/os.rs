//! `os` and `os.path`
//!
//! Environment lookups go through [`crate::config::HarnessConfig::env_var`], so a test can point
//! `INPUT_DATA_DIR` somewhere without mutating the process environment.

use std::any::Any;
use std::path::{MAIN_SEPARATOR, PathBuf};

use super::pathlib::path_arg;
use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

fn getenv(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("getenv", 2, &["key", "default"])?;
    let key = args.require("getenv", 0, "key")?.expect_str("getenv() key")?;
    match interp.config().env_var(&key) {
        Some(value) => Ok(Value::str(value)),
        None => Ok(args.get(1, "default").cloned().unwrap_or(Value::None)),
    }
}

/// `os.environ`: a read-only view of the session's environment.
#[derive(Debug)]
struct Environ;

impl HostObject for Environ {
    fn type_name(&self) -> &str {
        "_Environ"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "get" => Ok(Value::native("get", getenv)),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "get" => getenv(interp, args),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        "environ({...})".to_string()
    }
}

/// Expand a leading `~` using `HOME`.
pub(crate) fn expand_user(interp: &Interpreter, path: &str) -> String {
    let Some(rest) = path.strip_prefix('~') else {
        return path.to_string();
    };
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with(MAIN_SEPARATOR)) {
        return path.to_string();
    }
    match interp.config().env_var("HOME") {
        Some(home) => format!("{}{}", home.trim_end_matches('/'), rest),
        None => path.to_string(),
    }
}

fn expanduser(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("expanduser", 1, &[])?;
    let path = args.require("expanduser", 0, "path")?.expect_str("expanduser() path")?;
    Ok(Value::str(expand_user(interp, &path)))
}

fn join(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("join", usize::MAX, &[])?;
    let Some((first, rest)) = args.positional.split_first() else {
        return Err(RuntimeError::type_error("join() missing required argument: 'a'"));
    };
    let mut out = path_arg(first)?.to_string_lossy().into_owned();
    for part in rest {
        let part = path_arg(part)?.to_string_lossy().into_owned();
        if part.starts_with('/') {
            out = part;
        } else if out.is_empty() || out.ends_with('/') {
            out.push_str(&part);
        } else {
            out.push('/');
            out.push_str(&part);
        }
    }
    Ok(Value::str(out))
}

fn exists(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("exists", 1, &[])?;
    let path: PathBuf = path_arg(args.require("exists", 0, "path")?)?;
    Ok(Value::Bool(path.exists()))
}

fn makedirs(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("makedirs", 1, &["name", "exist_ok"])?;
    let path = path_arg(args.require("makedirs", 0, "name")?)?;
    let exist_ok = args.named.get("exist_ok").is_some_and(Value::truthy);
    super::pathlib::make_dir(&path, true, exist_ok)?;
    Ok(Value::None)
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register(
        "os",
        [
            ("getenv", Value::native("getenv", getenv)),
            ("environ", Value::object(Environ)),
            ("makedirs", Value::native("makedirs", makedirs)),
            ("sep", Value::str("/")),
        ],
    );
    registry.register(
        "os.path",
        [
            ("expanduser", Value::native("expanduser", expanduser)),
            ("join", Value::native("join", join)),
            ("exists", Value::native("exists", exists)),
        ],
    );
}
