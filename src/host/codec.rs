//! Columnar fixture files
//!
//! `to_parquet`/`read_parquet` keep their names but store a small JSON document:
//!
//! ```json
//! {"format": "cellbook-columnar", "version": 1, "num_rows": 2, "columns": {"movieId": [1, 2]}}
//! ```
//!
//! Writes replace the file wholesale, so materializing the same fixture twice leaves identical bytes.

use std::fs;
use std::path::Path;

use cellbook_core::ErrorKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::frame::Frame;
use super::pathlib::io_error;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::value::Value;

pub const FORMAT: &str = "cellbook-columnar";
pub const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ColumnarFile {
    format: String,
    version: u32,
    num_rows: usize,
    columns: IndexMap<String, Vec<serde_json::Value>>,
}

fn to_json(value: &Value) -> RuntimeResult<serde_json::Value> {
    Ok(match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::List(_) | Value::Tuple(_) => {
            serde_json::Value::Array(value.iterate()?.iter().map(to_json).collect::<RuntimeResult<_>>()?)
        }
        other => {
            return Err(RuntimeError::type_error(format!(
                "cannot store a value of type '{}' in a column",
                other.type_name()
            )));
        }
    })
}

fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => Value::list(items.iter().map(from_json).collect()),
        serde_json::Value::Object(_) => Value::None,
    }
}

/// Encode a frame to its on-disk text.
pub fn encode(frame: &Frame) -> RuntimeResult<String> {
    let mut columns = IndexMap::new();
    for (name, values) in frame.columns() {
        let encoded = values.iter().map(to_json).collect::<RuntimeResult<Vec<_>>>()?;
        columns.insert(name.clone(), encoded);
    }
    let file = ColumnarFile {
        format: FORMAT.to_string(),
        version: VERSION,
        num_rows: frame.num_rows(),
        columns,
    };
    serde_json::to_string_pretty(&file).map_err(|e| RuntimeError::value_error(e.to_string()))
}

pub fn decode(text: &str, path: &Path) -> RuntimeResult<Frame> {
    let corrupt = |reason: String| {
        RuntimeError::value_error(format!("'{}' is not a columnar fixture: {reason}", path.display()))
    };
    let file: ColumnarFile = serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
    if file.format != FORMAT || file.version != VERSION {
        return Err(corrupt(format!("unsupported format {} v{}", file.format, file.version)));
    }
    let columns = file
        .columns
        .into_iter()
        .map(|(name, values)| (name, values.iter().map(from_json).collect()))
        .collect();
    let frame = Frame::from_columns(columns)?;
    if frame.num_rows() != file.num_rows && !frame.columns().is_empty() {
        return Err(corrupt(format!(
            "header says {} rows, columns hold {}",
            file.num_rows,
            frame.num_rows()
        )));
    }
    Ok(frame)
}

pub fn write(path: &Path, frame: &Frame) -> RuntimeResult<()> {
    let text = encode(frame)?;
    fs::write(path, text).map_err(|e| io_error(&e, path))?;
    tracing::debug!(path = %path.display(), rows = frame.num_rows(), "fixture written");
    Ok(())
}

pub fn read(path: &Path) -> RuntimeResult<Frame> {
    if !path.is_file() {
        return Err(RuntimeError::new(
            ErrorKind::FileNotFoundError,
            format!("No such file or directory: '{}'", path.display()),
        ));
    }
    let text = fs::read_to_string(path).map_err(|e| io_error(&e, path))?;
    decode(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let mut columns = IndexMap::new();
        columns.insert("movieId".to_string(), vec![Value::Int(1), Value::Int(2)]);
        columns.insert("rating".to_string(), vec![Value::Float(3.5), Value::Float(4.0)]);
        columns.insert(
            "genres".to_string(),
            vec![Value::list(vec![Value::str("a_genre")]), Value::list(vec![])],
        );
        Frame::from_columns(columns).unwrap()
    }

    #[test]
    fn test_write_then_read_keeps_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write(&path, &sample()).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back.num_rows(), 2);
        let rating = back.column("rating").unwrap();
        assert!(matches!(rating[1], Value::Float(f) if f == 4.0));
        assert_eq!(back.column("genres").unwrap()[0].repr(), "['a_genre']");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valid.parquet");
        write(&path, &sample()).unwrap();
        let first = fs::read(&path).unwrap();
        write(&path, &sample()).unwrap();
        assert_eq!(first, fs::read(&path).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let err = read(Path::new("/definitely/not/here.parquet")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFoundError);
    }

    #[test]
    fn test_rejects_foreign_json() {
        let err = decode("{\"a\": 1}", Path::new("x.parquet")).unwrap_err();
        assert!(err.message.contains("is not a columnar fixture"));
    }
}
