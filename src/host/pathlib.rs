//! `pathlib.Path`

use std::any::Any;
use std::io;
use std::path::{Path, PathBuf};

use cellbook_core::ErrorKind;

use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

#[derive(Debug, Clone)]
pub struct PathObject {
    path: PathBuf,
}

impl PathObject {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Accept either a `str` or a `Path` wherever a filesystem path is expected.
pub(crate) fn path_arg(value: &Value) -> RuntimeResult<PathBuf> {
    if let Some(p) = value.downcast_ref::<PathObject>() {
        return Ok(p.path.clone());
    }
    match value {
        Value::Str(s) => Ok(PathBuf::from(&**s)),
        other => Err(RuntimeError::type_error(format!(
            "expected str or Path, not {}",
            other.type_name()
        ))),
    }
}

/// Map an IO failure onto the error kind cell code expects.
pub(crate) fn io_error(err: &io::Error, path: &Path) -> RuntimeError {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::FileNotFoundError,
        io::ErrorKind::AlreadyExists => ErrorKind::FileExistsError,
        _ => ErrorKind::RuntimeError,
    };
    RuntimeError::new(kind, format!("{err}: '{}'", path.display()))
}

pub(crate) fn make_dir(path: &Path, parents: bool, exist_ok: bool) -> RuntimeResult<()> {
    if path.is_dir() {
        return if exist_ok {
            Ok(())
        } else {
            Err(RuntimeError::new(
                ErrorKind::FileExistsError,
                format!("File exists: '{}'", path.display()),
            ))
        };
    }
    let result = if parents {
        std::fs::create_dir_all(path)
    } else {
        std::fs::create_dir(path)
    };
    result.map_err(|e| io_error(&e, path))
}

impl HostObject for PathObject {
    fn type_name(&self) -> &str {
        "Path"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "name" => Ok(Value::str(
                self.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            )),
            "parent" => Ok(Value::object(PathObject::new(
                self.path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ))),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, _interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "mkdir" => {
                args.check("mkdir", 0, &["parents", "exist_ok"])?;
                let parents = args.named.get("parents").is_some_and(Value::truthy);
                let exist_ok = args.named.get("exist_ok").is_some_and(Value::truthy);
                make_dir(&self.path, parents, exist_ok)?;
                Ok(Value::None)
            }
            "exists" => {
                args.check("exists", 0, &[])?;
                Ok(Value::Bool(self.path.exists()))
            }
            "is_dir" => Ok(Value::Bool(self.path.is_dir())),
            "joinpath" => {
                let mut joined = self.path.clone();
                for part in &args.positional {
                    joined.push(path_arg(part)?);
                }
                Ok(Value::object(PathObject::new(joined)))
            }
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        format!("PosixPath('{}')", self.path.display())
    }

    fn to_display(&self) -> String {
        self.path.display().to_string()
    }
}

fn path_ctor(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("Path", usize::MAX, &[])?;
    let mut path = PathBuf::new();
    for part in &args.positional {
        path.push(path_arg(part)?);
    }
    Ok(Value::object(PathObject::new(path)))
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register("pathlib", [("Path", Value::native("Path", path_ctor))]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;

    #[test]
    fn test_mkdir_is_idempotent_with_exist_ok() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let path = PathObject::new(&target);
        let args = || Args::new().with_named("parents", Value::Bool(true)).with_named("exist_ok", Value::Bool(true));
        path.call_method(&mut interp, "mkdir", args()).unwrap();
        path.call_method(&mut interp, "mkdir", args()).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_mkdir_without_exist_ok_fails_on_existing() {
        let dir = tempfile::tempdir().unwrap();
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let err = PathObject::new(dir.path())
            .call_method(&mut interp, "mkdir", Args::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileExistsError);
    }

    #[test]
    fn test_mkdir_without_parents_fails_on_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let err = PathObject::new(dir.path().join("x").join("y"))
            .call_method(&mut interp, "mkdir", Args::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFoundError);
    }

    #[test]
    fn test_path_arg_accepts_str_and_path() {
        assert_eq!(path_arg(&Value::str("/tmp")).unwrap(), PathBuf::from("/tmp"));
        let p = Value::object(PathObject::new("/data"));
        assert_eq!(path_arg(&p).unwrap(), PathBuf::from("/data"));
        assert!(path_arg(&Value::Int(1)).is_err());
        assert_eq!(p.to_display(), "/data");
    }
}
