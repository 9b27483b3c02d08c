//! `random`, `numpy.random` and `string`
//!
//! Every draw comes from the interpreter's seeded [`rand::rngs::StdRng`], so two sessions opened with the same
//! seed produce the same values.

use rand::Rng;
use rand::seq::SliceRandom;

use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::Args;
use crate::runtime::value::Value;

const ASCII_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const ASCII_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn seed(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("seed", 1, &["a"])?;
    let seed = match args.get_some(0, "a") {
        Some(v) => v.expect_int("seed")? as u64,
        None => interp.config().seed,
    };
    interp.reseed(seed);
    Ok(Value::None)
}

fn shuffle(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("shuffle", 1, &["x"])?;
    match args.require("shuffle", 0, "x")? {
        Value::List(items) => {
            items.borrow_mut().shuffle(interp.rng());
            Ok(Value::None)
        }
        other => Err(RuntimeError::type_error(format!(
            "shuffle() argument must be a list, not {}",
            other.type_name()
        ))),
    }
}

/// Uniform integer in `[low, high)`.
fn draw(interp: &mut Interpreter, low: i64, high: i64, func: &str) -> RuntimeResult<Value> {
    if low >= high {
        return Err(RuntimeError::value_error(format!(
            "empty range in {func}({low}, {high})"
        )));
    }
    Ok(Value::Int(interp.rng().gen_range(low..high)))
}

/// `random.randint(a, b)`: both ends inclusive.
fn randint(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("randint", 2, &["a", "b"])?;
    let a = args.require("randint", 0, "a")?.expect_int("randint() a")?;
    let b = args.require("randint", 1, "b")?.expect_int("randint() b")?;
    draw(interp, a, b.saturating_add(1), "randint")
}

fn randrange(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("randrange", 2, &["start", "stop"])?;
    let first = args.require("randrange", 0, "start")?.expect_int("randrange() start")?;
    match args.get_some(1, "stop") {
        Some(stop) => draw(interp, first, stop.expect_int("randrange() stop")?, "randrange"),
        None => draw(interp, 0, first, "randrange"),
    }
}

fn random(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("random", 0, &[])?;
    Ok(Value::Float(interp.rng().r#gen::<f64>()))
}

fn choice(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("choice", 1, &["seq"])?;
    let items = args.require("choice", 0, "seq")?.iterate()?;
    items
        .choose(interp.rng())
        .cloned()
        .ok_or_else(|| RuntimeError::new(cellbook_core::ErrorKind::IndexError, "Cannot choose from an empty sequence"))
}

/// `numpy.random.randint(low, high=None)`: `[0, low)` with one argument, `[low, high)` with two.
fn np_randint(interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("randint", 2, &["low", "high"])?;
    let low = args.require("randint", 0, "low")?.expect_int("randint() low")?;
    match args.get_some(1, "high") {
        Some(high) => draw(interp, low, high.expect_int("randint() high")?, "randint"),
        None => draw(interp, 0, low, "randint"),
    }
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register(
        "random",
        [
            ("seed", Value::native("seed", seed)),
            ("shuffle", Value::native("shuffle", shuffle)),
            ("randint", Value::native("randint", randint)),
            ("randrange", Value::native("randrange", randrange)),
            ("random", Value::native("random", random)),
            ("choice", Value::native("choice", choice)),
        ],
    );
    registry.register(
        "numpy.random",
        [
            ("seed", Value::native("seed", seed)),
            ("shuffle", Value::native("shuffle", shuffle)),
            ("randint", Value::native("randint", np_randint)),
            ("random", Value::native("random", random)),
        ],
    );
    registry.register(
        "string",
        [
            ("ascii_lowercase", Value::str(ASCII_LOWERCASE)),
            ("ascii_uppercase", Value::str(ASCII_UPPERCASE)),
            ("ascii_letters", Value::str(format!("{ASCII_LOWERCASE}{ASCII_UPPERCASE}"))),
            ("digits", Value::str("0123456789")),
        ],
    );
}
