//! `datasets.entertainment.get_movielens`
//!
//! Loads previously materialized splits from `<path>/<variant>/{train,valid}.parquet`. Downloading is not
//! possible, so a missing split is a `ConnectionError`; tests patch this function out.

use std::path::PathBuf;

use cellbook_core::ErrorKind;

use super::codec;
use super::frame::DatasetObject;
use super::os::expand_user;
use super::pathlib::path_arg;
use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::Args;
use crate::runtime::value::Value;

pub const VARIANTS: &[&str] = &["ml-1m", "ml-100k", "ml-25m"];

fn input_dir(interp: &Interpreter) -> PathBuf {
    let config = interp.config();
    let dir = config
        .env_var(&config.input_dir_var)
        .unwrap_or_else(|| config.default_input_dir.clone());
    PathBuf::from(expand_user(interp, &dir))
}

fn get_movielens(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("get_movielens", 2, &["path", "variant"])?;
    let root = match args.get_some(0, "path") {
        Some(p) => path_arg(p)?,
        None => input_dir(interp),
    };
    let variant = match args.get_some(1, "variant") {
        Some(v) => v.expect_str("get_movielens() variant")?.to_string(),
        None => "ml-1m".to_string(),
    };
    if !VARIANTS.contains(&variant.as_str()) {
        return Err(RuntimeError::value_error(format!("unknown MovieLens variant '{variant}'")));
    }

    let dir = root.join(&variant);
    let (train, valid) = (dir.join("train.parquet"), dir.join("valid.parquet"));
    if !(train.is_file() && valid.is_file()) {
        return Err(RuntimeError::new(
            ErrorKind::ConnectionError,
            format!(
                "cannot download MovieLens {variant} into '{}': network access is disabled",
                dir.display()
            ),
        ));
    }
    tracing::debug!(dir = %dir.display(), "loading MovieLens splits");
    Ok(Value::list(vec![
        Value::object(DatasetObject::new(codec::read(&train)?)),
        Value::object(DatasetObject::new(codec::read(&valid)?)),
    ]))
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register(
        "datasets.entertainment",
        [("get_movielens", Value::native("get_movielens", get_movielens))],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::host::frame::{Frame, frame_of};
    use crate::host::synthetic;

    #[test]
    fn test_missing_splits_fail_with_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let args = Args::positional(vec![Value::str(dir.path().to_string_lossy())]);
        let err = get_movielens(&mut interp, args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionError);
    }

    #[test]
    fn test_loads_materialized_splits_from_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::default().with_input_dir(dir.path().to_string_lossy());
        let mut interp = Interpreter::new(&config);
        let schema = synthetic::schema("movielens-1m").unwrap();
        let frame = synthetic::generate(&mut interp, schema, 10);
        let split_dir = dir.path().join("ml-1m");
        std::fs::create_dir_all(&split_dir).unwrap();
        codec::write(&split_dir.join("train.parquet"), &frame).unwrap();
        codec::write(&split_dir.join("valid.parquet"), &frame).unwrap();

        let loaded = get_movielens(&mut interp, Args::new()).unwrap().iterate().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(frame_of(&loaded[1]).map(Frame::num_rows), Some(10));
    }

    #[test]
    fn test_unknown_variant() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let args = Args::new().with_named("path", Value::str("/tmp")).with_named("variant", Value::str("ml-7"));
        assert_eq!(get_movielens(&mut interp, args).unwrap_err().kind, ErrorKind::ValueError);
    }
}
