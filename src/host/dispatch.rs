//! `dispatch.get_lib()`: the dataframe library handle notebooks use for `read_parquet` and `DataFrame`.

use std::any::Any;

use super::codec;
use super::frame::{DataFrameObject, dataframe_ctor};
use super::pathlib::path_arg;
use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

#[derive(Debug)]
pub struct Lib;

impl HostObject for Lib {
    fn type_name(&self) -> &str {
        "DataFrameLib"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "read_parquet" => Ok(Value::native("read_parquet", read_parquet)),
            "DataFrame" => Ok(Value::native("DataFrame", dataframe_ctor)),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "read_parquet" => read_parquet(interp, args),
            "DataFrame" => dataframe_ctor(interp, args),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        "<module 'cudf-compatible'>".to_string()
    }
}

fn read_parquet(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("read_parquet", 1, &["path"])?;
    let path = path_arg(args.require("read_parquet", 0, "path")?)?;
    Ok(Value::object(DataFrameObject::new(codec::read(&path)?)))
}

fn get_lib(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("get_lib", 0, &[])?;
    Ok(Value::object(Lib))
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register("dispatch", [("get_lib", Value::native("get_lib", get_lib))]);
    registry.alias("core.dispatch", "dispatch");
}
