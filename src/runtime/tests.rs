//! Interpreter tests driven by cell-language source.

use std::time::Duration;

use cellbook_core::ErrorKind;

use super::Interpreter;
use super::errors::RuntimeError;
use super::value::Value;
use crate::config::HarnessConfig;

fn interp() -> Interpreter {
    Interpreter::new(&HarnessConfig::default())
}

fn exec(interp: &mut Interpreter, source: &str) -> Result<(), RuntimeError> {
    let program = cellbook_syntax::parse_source(source).expect("source should parse");
    interp.run_program(&program)
}

fn run(source: &str) -> Interpreter {
    let mut interp = interp();
    exec(&mut interp, source).expect("program should run");
    interp
}

fn run_err(source: &str) -> RuntimeError {
    exec(&mut interp(), source).expect_err("program should fail")
}

fn repr_of(interp: &Interpreter, name: &str) -> String {
    interp.global(name).map(|v| v.repr()).unwrap_or_else(|| panic!("{name} is unbound"))
}

// ============================================================================
// Arithmetic and operators
// ============================================================================

#[test]
fn test_floor_division_and_modulo_follow_the_divisor_sign() {
    let i = run("a = 7 // -2\nb = -7 % 3\nc = 7.5 // 2\nd = 2 ** 10\ne = 1 / 4\n");
    assert_eq!(repr_of(&i, "a"), "-4");
    assert_eq!(repr_of(&i, "b"), "2");
    assert_eq!(repr_of(&i, "c"), "3.0");
    assert_eq!(repr_of(&i, "d"), "1024");
    assert_eq!(repr_of(&i, "e"), "0.25");
}

#[test]
fn test_min_int_divided_by_minus_one_overflows() {
    for op in ["//", "%"] {
        let err = run_err(&format!("x = (-9223372036854775807 - 1) {op} -1\n"));
        assert_eq!(err.kind, ErrorKind::ValueError);
        assert_eq!(err.message, "integer overflow");
    }
    let i = run("a = (-9223372036854775807 - 1) // 1\nb = (-9223372036854775807 - 1) % 7\n");
    assert_eq!(repr_of(&i, "a"), "-9223372036854775808");
    assert_eq!(repr_of(&i, "b"), "6");
}

#[test]
fn test_division_by_zero() {
    let err = run_err("x = 1 / 0\n");
    assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
    assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
}

#[test]
fn test_short_circuit_does_not_evaluate_rhs() {
    let i = run("x = 0 and undefined_name\ny = 1 or undefined_name\n");
    assert_eq!(repr_of(&i, "x"), "0");
    assert_eq!(repr_of(&i, "y"), "1");
}

#[test]
fn test_sequence_operators() {
    let i = run("a = [1] * 3 + [2]\nb = 'ab' * 2\nc = 2 in {1, 2}\nd = {1, 2, 3} - {2}\ne = 'x' not in 'abc'\n");
    assert_eq!(repr_of(&i, "a"), "[1, 1, 1, 2]");
    assert_eq!(repr_of(&i, "b"), "'abab'");
    assert_eq!(repr_of(&i, "c"), "True");
    assert_eq!(repr_of(&i, "d"), "{1, 3}");
    assert_eq!(repr_of(&i, "e"), "True");
}

#[test]
fn test_unsupported_operand_message() {
    let err = run_err("x = 'a' - 1\n");
    assert_eq!(err.message, "unsupported operand type(s) for -: 'str' and 'int'");
}

// ============================================================================
// Names, scopes and functions
// ============================================================================

#[test]
fn test_undefined_name() {
    let err = run_err("print(movies)\n");
    assert_eq!(err.kind, ErrorKind::NameError);
    assert_eq!(err.message, "name 'movies' is not defined");
    assert!(err.span.is_some());
}

#[test]
fn test_functions_defaults_and_keywords() {
    let source = "\
def scale(x, factor=2, *, offset=0):
    return x * factor + offset

a = scale(3)
b = scale(3, 10)
c = scale(3, offset=1)
";
    let i = run(source);
    assert_eq!(repr_of(&i, "a"), "6");
    assert_eq!(repr_of(&i, "b"), "30");
    assert_eq!(repr_of(&i, "c"), "7");
}

#[test]
fn test_function_locals_do_not_leak() {
    let i = run("def f():\n    local = 1\n    return local\n\nr = f()\n");
    assert!(i.global("local").is_none());
    assert_eq!(repr_of(&i, "r"), "1");
}

#[test]
fn test_call_argument_errors() {
    let err = run_err("def f(a):\n    return a\n\nf()\n");
    assert_eq!(err.message, "f() missing required argument: 'a'");
    let err = run_err("def f(a):\n    return a\n\nf(1, b=2)\n");
    assert_eq!(err.message, "f() got an unexpected keyword argument 'b'");
}

#[test]
fn test_recursion_limit() {
    let err = run_err("def f(n):\n    return f(n + 1)\n\nf(0)\n");
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert_eq!(err.message, "maximum recursion depth exceeded");
}

#[test]
fn test_deep_recursion_below_the_limit() {
    let i = run("def depth(n):\n    if n == 0:\n        return 0\n    return 1 + depth(n - 1)\n\na = depth(150)\nb = depth(900)\n");
    assert_eq!(repr_of(&i, "a"), "150");
    assert_eq!(repr_of(&i, "b"), "900");
}

#[test]
fn test_recursion_limit_leaves_the_interpreter_usable() {
    let mut interp = interp();
    let source = "def f(n):\n    return [f(n + 1) for _ in range(1)]\n\nf(0)\n";
    let err = exec(&mut interp, source).unwrap_err();
    assert_eq!(err.message, "maximum recursion depth exceeded");
    exec(&mut interp, "def g(n):\n    return n if n == 0 else g(n - 1)\n\ny = g(100)\n").unwrap();
    assert_eq!(repr_of(&interp, "y"), "0");
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_loops_break_and_continue() {
    let source = "\
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 7:
        break
    total += i
n = 0
while n < 3:
    n += 1
";
    let i = run(source);
    assert_eq!(repr_of(&i, "total"), "16");
    assert_eq!(repr_of(&i, "n"), "3");
}

#[test]
fn test_stray_return_is_an_error() {
    let err = run_err("return 1\n");
    assert_eq!(err.message, "'return' outside function");
}

#[test]
fn test_assert_and_raise() {
    let err = run_err("assert 1 == 2, 'mismatch'\n");
    assert_eq!(err.to_string(), "AssertionError: mismatch");
    let err = run_err("raise ValueError('bad rows')\n");
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert_eq!(err.message, "bad rows");
}

#[test]
fn test_deadline_interrupts_infinite_loop() {
    let mut interp = interp();
    interp.set_deadline(Duration::from_millis(20));
    let err = exec(&mut interp, "while True:\n    pass\n").unwrap_err();
    assert!(err.is_deadline());
    interp.clear_deadline();
    exec(&mut interp, "x = 1\n").unwrap();
}

#[test]
fn test_deadline_interrupts_comprehension_over_huge_range() {
    let mut interp = interp();
    interp.set_deadline(Duration::from_millis(50));
    let err = exec(&mut interp, "xs = [i for i in range(10 ** 12) if False]\n").unwrap_err();
    assert!(err.is_deadline());
    interp.set_deadline(Duration::from_millis(50));
    let err = exec(&mut interp, "t = sum(range(10 ** 12))\n").unwrap_err();
    assert!(err.is_deadline());
    interp.clear_deadline();
    assert!(interp.global("xs").is_none());
}

#[test]
fn test_huge_range_is_not_materialized() {
    let err = run_err("xs = list(range(10 ** 12))\n");
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert!(err.message.contains("too large to materialize"), "{}", err.message);
    let i = run("a = any(range(10 ** 12))\nc = all(range(10 ** 12))\n");
    assert_eq!(repr_of(&i, "a"), "True");
    assert_eq!(repr_of(&i, "c"), "False");
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_comprehensions_and_unpacking() {
    let source = "\
pairs = [(i, i * i) for i in range(4) if i > 0]
squares = {k: v for k, v in pairs}
a, b = pairs[0]
";
    let i = run(source);
    assert_eq!(repr_of(&i, "pairs"), "[(1, 1), (2, 4), (3, 9)]");
    assert_eq!(repr_of(&i, "squares"), "{1: 1, 2: 4, 3: 9}");
    assert_eq!(repr_of(&i, "a"), "1");
    assert!(i.global("k").is_none());
}

#[test]
fn test_unpack_count_mismatch() {
    let err = run_err("a, b = [1, 2, 3]\n");
    assert_eq!(err.message, "too many values to unpack (expected 2)");
    let err = run_err("a, b, c = (1, 2)\n");
    assert_eq!(err.message, "not enough values to unpack (expected 3, got 2)");
}

#[test]
fn test_indexing_and_slicing() {
    let i = run("xs = [10, 20, 30, 40]\na = xs[-1]\nb = xs[1:3]\nc = xs[::-1]\nd = 'hello'[1:]\n");
    assert_eq!(repr_of(&i, "a"), "40");
    assert_eq!(repr_of(&i, "b"), "[20, 30]");
    assert_eq!(repr_of(&i, "c"), "[40, 30, 20, 10]");
    assert_eq!(repr_of(&i, "d"), "'ello'");
}

#[test]
fn test_dict_key_error_and_delete() {
    let err = run_err("d = {'a': 1}\nd['b']\n");
    assert_eq!(err.to_string(), "KeyError: 'b'");
    let i = run("d = {'a': 1, 'b': 2}\ndel d['a']\n");
    assert_eq!(repr_of(&i, "d"), "{'b': 2}");
}

#[test]
fn test_list_plus_equals_extends_in_place() {
    let i = run("a = [1]\nb = a\na += [2]\n");
    assert_eq!(repr_of(&i, "b"), "[1, 2]");
}

#[test]
fn test_fstrings() {
    let i = run("loss = 0.123456\nn = 1000\ns = f'loss={loss:.3f} rows={n:,} {\"ok\"}'\n");
    assert_eq!(i.global("s").and_then(|v| v.as_str().map(str::to_string)).unwrap(), "loss=0.123 rows=1,000 ok");
}

// ============================================================================
// Imports and output
// ============================================================================

#[test]
fn test_import_unknown_module() {
    let err = run_err("import tensorflow\n");
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert_eq!(err.message, "No module named 'tensorflow'");
}

#[test]
fn test_from_import_missing_name() {
    let err = run_err("from os import nothing_here\n");
    assert_eq!(err.message, "cannot import name 'nothing_here' from 'os'");
}

#[test]
fn test_import_binds_root_or_alias() {
    let i = run("import os.path\nimport numpy as np\n");
    assert!(matches!(i.global("os"), Some(Value::Module(_))));
    assert!(matches!(i.global("np"), Some(Value::Module(ref m)) if &**m == "numpy"));
}

#[test]
fn test_print_is_captured() {
    let mut i = run("print('rows', 3)\nprint('a', 'b', sep='-')\n");
    assert_eq!(i.take_output(), vec!["rows 3".to_string(), "a-b".to_string()]);
    assert!(i.output().is_empty());
}

#[test]
fn test_seeded_random_is_reproducible() {
    let source = "import random\nxs = [random.randint(0, 100) for _ in range(5)]\n";
    let a = run(source);
    let b = run(source);
    assert_eq!(repr_of(&a, "xs"), repr_of(&b, "xs"));
}
