//! `synthetic.generate_data`: seeded rating tables shaped like the public MovieLens releases.

use rand::Rng;

use indexmap::IndexMap;

use super::frame::{DatasetObject, Frame};
use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::Args;
use crate::runtime::value::Value;

/// Cardinalities of one known schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub users: i64,
    pub items: i64,
}

pub const SCHEMAS: &[Schema] = &[
    Schema {
        name: "movielens-1m",
        users: 6040,
        items: 3952,
    },
    Schema {
        name: "movielens-100k",
        users: 943,
        items: 1682,
    },
];

pub fn schema(name: &str) -> Option<Schema> {
    SCHEMAS.iter().copied().find(|s| s.name == name)
}

/// Rows per split; the last split absorbs rounding.
fn split_sizes(num_rows: usize, fractions: &[f64]) -> RuntimeResult<Vec<usize>> {
    if fractions.is_empty() || fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
        return Err(RuntimeError::value_error("set_sizes must be fractions between 0 and 1"));
    }
    let total: f64 = fractions.iter().sum();
    if (total - 1.0).abs() > 1e-6 {
        return Err(RuntimeError::value_error(format!("set_sizes must sum to 1, got {total}")));
    }
    let mut sizes = Vec::with_capacity(fractions.len());
    let mut assigned = 0;
    for f in &fractions[..fractions.len() - 1] {
        let n = ((num_rows as f64) * f).round() as usize;
        let n = n.min(num_rows - assigned);
        sizes.push(n);
        assigned += n;
    }
    sizes.push(num_rows - assigned);
    Ok(sizes)
}

/// Draw `num_rows` interactions for `schema`.
pub fn generate(interp: &mut Interpreter, schema: Schema, num_rows: usize) -> Frame {
    let rng = interp.rng();
    let mut user_ids = Vec::with_capacity(num_rows);
    let mut movie_ids = Vec::with_capacity(num_rows);
    let mut ratings = Vec::with_capacity(num_rows);
    let mut binary = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let rating: i64 = rng.gen_range(1..=5);
        user_ids.push(Value::Int(rng.gen_range(1..=schema.users)));
        movie_ids.push(Value::Int(rng.gen_range(1..=schema.items)));
        ratings.push(Value::Float(rating as f64));
        binary.push(Value::Int(i64::from(rating > 3)));
    }

    let mut columns = IndexMap::new();
    columns.insert("userId".to_string(), user_ids);
    columns.insert("movieId".to_string(), movie_ids);
    columns.insert("rating".to_string(), ratings);
    columns.insert("rating_binary".to_string(), binary);
    Frame::from_columns(columns).unwrap_or_default()
}

fn generate_data(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("generate_data", 3, &["input", "num_rows", "set_sizes"])?;
    let input = args.require("generate_data", 0, "input")?.expect_str("generate_data() input")?;
    let schema = schema(&input)
        .ok_or_else(|| RuntimeError::value_error(format!("unknown dataset schema '{input}'")))?;
    let num_rows = match args.get(1, "num_rows") {
        Some(v) => v.expect_int("generate_data() num_rows")?,
        None => 1000,
    };
    if num_rows < 0 {
        return Err(RuntimeError::value_error("num_rows must be non-negative"));
    }
    let fractions = match args.get(2, "set_sizes") {
        Some(v) => v
            .iterate()?
            .iter()
            .map(|f| f.expect_float("set_sizes item"))
            .collect::<RuntimeResult<Vec<_>>>()?,
        None => vec![1.0],
    };
    let sizes = split_sizes(num_rows as usize, &fractions)?;

    let all = generate(interp, schema, num_rows as usize);
    let mut datasets = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for size in &sizes {
        datasets.push(Value::object(DatasetObject::new(slice_rows(&all, offset, *size))));
        offset += size;
    }
    tracing::debug!(schema = schema.name, num_rows, splits = ?sizes, "synthetic data generated");

    if datasets.len() == 1 {
        Ok(datasets.remove(0))
    } else {
        Ok(Value::list(datasets))
    }
}

fn slice_rows(frame: &Frame, offset: usize, len: usize) -> Frame {
    let columns = frame
        .columns()
        .iter()
        .map(|(name, values)| (name.clone(), values[offset..offset + len].to_vec()))
        .collect();
    Frame::from_columns(columns).unwrap_or_default()
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register("synthetic", [("generate_data", Value::native("generate_data", generate_data))]);
    registry.alias("datasets.synthetic", "synthetic");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::host::frame::frame_of;

    #[test]
    fn test_split_sizes() {
        assert_eq!(split_sizes(1000, &[0.8, 0.2]).unwrap(), vec![800, 200]);
        assert_eq!(split_sizes(7, &[0.5, 0.5]).unwrap(), vec![4, 3]);
        assert!(split_sizes(10, &[0.8, 0.3]).is_err());
        assert!(split_sizes(10, &[]).is_err());
    }

    #[test]
    fn test_generated_ids_are_in_range() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let schema = schema("movielens-100k").unwrap();
        let frame = generate(&mut interp, schema, 200);
        assert_eq!(frame.num_rows(), 200);
        for v in frame.column("movieId").unwrap() {
            let id = v.as_int().unwrap();
            assert!((1..=schema.items).contains(&id));
        }
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["userId", "movieId", "rating", "rating_binary"]
        );
    }

    #[test]
    fn test_generate_data_returns_splits() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let args = Args::positional(vec![Value::str("movielens-1m")])
            .with_named("num_rows", Value::Int(1000))
            .with_named("set_sizes", Value::tuple(vec![Value::Float(0.8), Value::Float(0.2)]));
        let result = generate_data(&mut interp, args).unwrap();
        let splits = result.iterate().unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(frame_of(&splits[0]).map(Frame::num_rows), Some(800));
        assert_eq!(frame_of(&splits[1]).map(Frame::num_rows), Some(200));
    }

    #[test]
    fn test_unknown_schema() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let err = generate_data(&mut interp, Args::positional(vec![Value::str("imdb")])).unwrap_err();
        assert_eq!(err.message, "unknown dataset schema 'imdb'");
    }
}
