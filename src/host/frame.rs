//! Tabular stand-ins: `DataFrame`, `Series` and the lazy `Dataset` the generator returns.

use std::any::Any;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use super::codec;
use super::pathlib::path_arg;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

/// Column-major table. Every column holds `num_rows` values.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: IndexMap<String, Vec<Value>>,
    num_rows: usize,
}

impl Frame {
    /// Build a frame, rejecting ragged columns.
    pub fn from_columns(columns: IndexMap<String, Vec<Value>>) -> RuntimeResult<Self> {
        let mut lengths = columns.values().map(Vec::len);
        let num_rows = lengths.next().unwrap_or(0);
        if lengths.any(|n| n != num_rows) {
            return Err(RuntimeError::value_error("All arrays must be of the same length"));
        }
        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<Value>> {
        &self.columns
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Frame {
        let n = n.min(self.num_rows);
        Frame {
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[..n].to_vec()))
                .collect(),
            num_rows: n,
        }
    }
}

#[derive(Debug)]
pub struct DataFrameObject {
    frame: Rc<Frame>,
}

impl DataFrameObject {
    pub fn new(frame: Frame) -> Self {
        Self { frame: Rc::new(frame) }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    fn series(&self, name: &str) -> Option<Value> {
        self.frame
            .column(name)
            .map(|values| Value::object(SeriesObject::new(name, values.to_vec())))
    }
}

impl HostObject for DataFrameObject {
    fn type_name(&self) -> &str {
        "DataFrame"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "columns" => Ok(Value::list(self.frame.column_names().map(Value::str).collect())),
            "shape" => Ok(Value::tuple(vec![
                Value::Int(self.frame.num_rows as i64),
                Value::Int(self.frame.columns.len() as i64),
            ])),
            other => self
                .series(other)
                .ok_or_else(|| RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, _interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "to_parquet" => {
                args.check("to_parquet", 1, &["path"])?;
                let path = path_arg(args.require("to_parquet", 0, "path")?)?;
                codec::write(&path, &self.frame)?;
                Ok(Value::None)
            }
            "head" => {
                args.check("head", 1, &["n"])?;
                let n = match args.get(0, "n") {
                    Some(v) => v.expect_int("head() n")?.max(0) as usize,
                    None => 5,
                };
                Ok(Value::object(DataFrameObject::new(self.frame.head(n))))
            }
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn get_item(&self, key: &Value) -> RuntimeResult<Value> {
        let name = key.expect_str("column name")?;
        self.series(&name)
            .ok_or_else(|| RuntimeError::key_error(key.repr()))
    }

    fn len(&self) -> Option<usize> {
        Some(self.frame.num_rows)
    }

    fn iterate(&self) -> Option<Vec<Value>> {
        Some(self.frame.column_names().map(Value::str).collect())
    }

    fn repr(&self) -> String {
        format!(
            "<DataFrame {} rows x {} columns>",
            self.frame.num_rows,
            self.frame.columns.len()
        )
    }
}

#[derive(Debug, Clone)]
pub struct SeriesObject {
    name: String,
    values: Vec<Value>,
}

impl SeriesObject {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Distinct values in first-seen order.
    fn unique(&self) -> RuntimeResult<SeriesObject> {
        let mut seen = IndexSet::new();
        let mut values = Vec::new();
        for v in &self.values {
            if seen.insert(v.to_key()?) {
                values.push(v.clone());
            }
        }
        Ok(SeriesObject::new(self.name.clone(), values))
    }
}

impl HostObject for SeriesObject {
    fn type_name(&self) -> &str {
        "Series"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "size" => Ok(Value::Int(self.values.len() as i64)),
            "name" => Ok(Value::str(&self.name)),
            "values" => Ok(Value::list(self.values.clone())),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, _interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        args.check(name, 0, &[])?;
        match name {
            "unique" => Ok(Value::object(self.unique()?)),
            "tolist" => Ok(Value::list(self.values.clone())),
            "nunique" => Ok(Value::Int(self.unique()?.values.len() as i64)),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn get_item(&self, key: &Value) -> RuntimeResult<Value> {
        let len = self.values.len() as i64;
        let i = key.expect_int("Series index")?;
        let resolved = if i < 0 { i + len } else { i };
        if resolved < 0 || resolved >= len {
            return Err(RuntimeError::index_out_of_range("Series"));
        }
        Ok(self.values[resolved as usize].clone())
    }

    fn len(&self) -> Option<usize> {
        Some(self.values.len())
    }

    fn iterate(&self) -> Option<Vec<Value>> {
        Some(self.values.clone())
    }

    fn repr(&self) -> String {
        format!("<Series '{}' ({} values)>", self.name, self.values.len())
    }
}

/// Lazily materialized split, as returned by `synthetic.generate_data`.
#[derive(Debug)]
pub struct DatasetObject {
    frame: Rc<Frame>,
}

impl DatasetObject {
    pub fn new(frame: Frame) -> Self {
        Self { frame: Rc::new(frame) }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl HostObject for DatasetObject {
    fn type_name(&self) -> &str {
        "Dataset"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "num_rows" => Ok(Value::Int(self.frame.num_rows as i64)),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, _interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        args.check(name, 0, &[])?;
        match name {
            "compute" | "to_ddf" => Ok(Value::object(DataFrameObject {
                frame: Rc::clone(&self.frame),
            })),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn len(&self) -> Option<usize> {
        Some(self.frame.num_rows)
    }

    fn repr(&self) -> String {
        format!("<Dataset {} rows>", self.frame.num_rows)
    }
}

/// The frame behind a `DataFrame` or `Dataset` value.
pub(crate) fn frame_of(value: &Value) -> Option<&Frame> {
    if let Some(df) = value.downcast_ref::<DataFrameObject>() {
        return Some(df.frame());
    }
    value.downcast_ref::<DatasetObject>().map(DatasetObject::frame)
}

/// `DataFrame(data={...})`: columns from lists or series.
pub(crate) fn dataframe_ctor(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("DataFrame", 1, &["data"])?;
    let mut columns = IndexMap::new();
    if let Some(data) = args.get_some(0, "data") {
        let Value::Dict(map) = data else {
            return Err(RuntimeError::type_error(format!(
                "DataFrame() data must be a dict, not {}",
                data.type_name()
            )));
        };
        for (key, column) in map.borrow().iter() {
            let name = key.to_value().to_display();
            columns.insert(name, column.iterate()?);
        }
    }
    Ok(Value::object(DataFrameObject::new(Frame::from_columns(columns)?)))
}
