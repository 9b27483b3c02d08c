//! End-to-end runs of the demo notebooks through `Testbook`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cellbook::harness::validate::render_diff;
use cellbook::{CellKind, Contract, HarnessConfig, HarnessError, OpenOptions, RunState, Testbook, Unit};

const DEMO: &str = "demos/02-advanced-workflow.ipynb";

const EXPECTED_KEYS: [&str; 14] = [
    "auc_1",
    "binary_accuracy",
    "loss",
    "loss_batch",
    "precision_1",
    "recall_1",
    "regularization_loss",
    "val_auc_1",
    "val_binary_accuracy",
    "val_loss",
    "val_loss_batch",
    "val_precision_1",
    "val_recall_1",
    "val_regularization_loss",
];

const SETUP: &str = r#"
    import os
    from unittest.mock import patch
    from datasets.synthetic import generate_data
    from pathlib import Path

    mock_train, mock_valid = generate_data(input="movielens-1m", num_rows=1000, set_sizes=(0.8, 0.2))
    input_path = os.environ.get("INPUT_DATA_DIR", os.path.expanduser("~/cellbook/movielens/"))
    Path(f"{input_path}ml-1m").mkdir(parents=True, exist_ok=True)
    mock_train.compute().to_parquet(f"{input_path}ml-1m/train.parquet")
    mock_train.compute().to_parquet(f"{input_path}ml-1m/valid.parquet")
    p1 = patch("datasets.entertainment.get_movielens", return_value=[mock_train, mock_valid])
    p1.start()
"#;

// `valid` re-reads train.parquet, as recorded.
const MOVIES: &str = r#"
    from dispatch import get_lib
    import string
    import numpy as np

    def generate_title():
        letters = list(string.ascii_lowercase)
        np.random.shuffle(letters)
        return "".join(letters)[: np.random.randint(len(letters))]

    train = get_lib().read_parquet(f"{input_path}ml-1m/train.parquet")
    valid = get_lib().read_parquet(f"{input_path}ml-1m/train.parquet")

    num_rows = train.movieId.unique().size
    movies = get_lib().DataFrame(
        data={
            "movieId": train.movieId.unique(),
            "title": [generate_title() for _ in range(num_rows)],
            "genres": [["a_genre"] for _ in range(num_rows)],
        }
    )
"#;

fn demo_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEMO)
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn config(input_dir: &Path, seed: u64) -> HarnessConfig {
    HarnessConfig::new()
        .with_seed(seed)
        .with_timeout(Duration::from_secs(60))
        .with_input_dir(format!("{}/", input_dir.display()))
}

/// The phased run: setup, cells 0-4, movie metadata in place of cell 5, then the rest.
fn run_demo(input_dir: &Path, seed: u64) -> Testbook {
    let mut tb = Testbook::open_with_config(demo_path(), OpenOptions::new(), config(input_dir, seed)).unwrap();
    tb.inject(SETUP).unwrap();
    tb.execute_range(0, Some(5)).unwrap();
    tb.inject(MOVIES).unwrap();
    let len = tb.len();
    tb.execute_range(6, Some(len)).unwrap();
    tb
}

fn history_repr(tb: &Testbook) -> String {
    let metrics = tb.r#ref("metrics").unwrap();
    tb.interpreter().get_attr(&metrics, "history").unwrap().repr()
}

#[test]
fn test_demo_document_shape() {
    let tb = Testbook::open(demo_path(), OpenOptions::new()).unwrap();
    assert_eq!(tb.len(), 10);
    assert_eq!(tb.cells()[0].kind, CellKind::Narrative);
    assert_eq!(tb.cells()[5].kind, CellKind::Code);
    assert_eq!(tb.state(), RunState::Loaded);
    assert!(tb.r#ref("metrics").is_err());
}

#[test]
fn test_end_to_end_history_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut tb = run_demo(dir.path(), 0x5EED);
    assert_eq!(tb.state(), RunState::Completed);
    tb.expect(&Contract::new("metrics", &["history"], EXPECTED_KEYS)).unwrap();

    // The notebook called the substitute exactly once.
    let p1 = tb.r#ref("p1").unwrap();
    assert_eq!(tb.interpreter().get_attr(&p1, "call_count").unwrap().as_int(), Some(1));
    assert_eq!(tb.output()[0], "train rows: 800, valid rows: 200");
    tb.close().unwrap();
}

#[test]
fn test_missing_validation_metric_names_exactly_that_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut tb = run_demo(dir.path(), 0x5EED);
    let len = tb.len();
    // Anchored after the last cell; runs when execution reaches the end again.
    tb.inject_at(len, "del metrics.history['val_auc_1']").unwrap();
    assert_eq!(tb.state(), RunState::Completed);
    tb.execute_range(len, None).unwrap();

    let err = tb.expect(&Contract::new("metrics", &["history"], EXPECTED_KEYS)).unwrap_err();
    let HarnessError::ContractMismatch { name, missing, extra } = err else {
        panic!("expected a key-set mismatch");
    };
    assert_eq!(name, "metrics.history");
    assert_eq!(missing, vec!["val_auc_1"]);
    assert!(extra.is_empty());
    insta::assert_snapshot!(render_diff(&missing, &extra), @"- val_auc_1");
}

#[test]
fn test_failure_at_cell_3_stops_the_run() {
    let mut tb = Testbook::open(fixture("fails_at_cell_3.ipynb"), OpenOptions::new()).unwrap();
    let err = tb.execute().unwrap_err();
    match &err {
        HarnessError::CellExecution { unit, cause, .. } => {
            assert_eq!(unit, &Unit::Cell(3));
            assert_eq!(cause.kind, cellbook_core::ErrorKind::ZeroDivisionError);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(tb.state(), RunState::Failed);
    assert!(tb.r#ref("reached").is_err());
    assert_eq!(tb.r#ref("b").unwrap().as_int(), Some(2));
    assert!(matches!(tb.execute_cell(4), Err(HarnessError::NotRunnable { .. })));
}

#[test]
fn test_fragment_visibility_follows_the_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let mut tb = Testbook::open_with_config(demo_path(), OpenOptions::new(), config(dir.path(), 1)).unwrap();
    tb.inject(SETUP).unwrap();
    tb.execute_range(0, Some(2)).unwrap();
    // Queued at cursor 2: not yet visible, then visible to cell 2 onward.
    tb.inject("marker = 'queued at 2'").unwrap();
    assert!(tb.r#ref("marker").is_err());
    tb.execute_cell(2).unwrap();
    assert_eq!(tb.r#ref("marker").unwrap().to_display(), "queued at 2");
    assert_eq!(tb.state(), RunState::PartiallyExecuted);
}

#[test]
fn test_teardown_restores_the_real_loader() {
    let dir = tempfile::tempdir().unwrap();
    let mut tb = run_demo(dir.path(), 7);
    assert_eq!(tb.interpreter().active_patches().len(), 1);
    tb.close().unwrap();
    assert!(tb.interpreter().active_patches().is_empty());

    // The real loader reads the materialized files, where valid.parquet holds the training rows.
    tb.run_fragment(
        r#"
        from datasets.entertainment import get_movielens
        real_train, real_valid = get_movielens(path=input_path)
        "#,
    )
    .unwrap();
    let real_valid = tb.r#ref("real_valid").unwrap();
    assert_eq!(tb.interpreter().get_attr(&real_valid, "num_rows").unwrap().as_int(), Some(800));
    assert_eq!(real_valid.len().unwrap(), 800);
    let p1 = tb.r#ref("p1").unwrap();
    assert_eq!(tb.interpreter().get_attr(&p1, "call_count").unwrap().as_int(), Some(1));
}

#[test]
fn test_setup_fragment_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 3);
    let path = fixture("fails_at_cell_3.ipynb");

    let mut first = Testbook::open_with_config(&path, OpenOptions::new(), config.clone()).unwrap();
    first.run_fragment(SETUP).unwrap();
    first.close().unwrap();
    let written = std::fs::read(dir.path().join("ml-1m/train.parquet")).unwrap();

    let mut second = Testbook::open_with_config(&path, OpenOptions::new(), config).unwrap();
    second.run_fragment(SETUP).unwrap();
    second.close().unwrap();
    assert_eq!(std::fs::read(dir.path().join("ml-1m/train.parquet")).unwrap(), written);
    assert!(dir.path().join("ml-1m/valid.parquet").is_file());
}

#[test]
fn test_same_seed_same_results() {
    let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let first = run_demo(a.path(), 42);
    let second = run_demo(b.path(), 42);
    assert_eq!(history_repr(&first), history_repr(&second));
    assert_eq!(first.r#ref("num_rows").unwrap().as_int(), second.r#ref("num_rows").unwrap().as_int());
}

#[test]
fn test_unpatched_loader_cannot_download() {
    let dir = tempfile::tempdir().unwrap();
    let mut tb = Testbook::open_with_config(demo_path(), OpenOptions::new(), config(dir.path(), 1)).unwrap();
    let err = tb.execute_range(0, Some(3)).unwrap_err();
    let HarnessError::CellExecution { unit, cause, .. } = err else {
        panic!("expected a cell failure");
    };
    assert_eq!(unit, Unit::Cell(2));
    assert_eq!(cause.kind, cellbook_core::ErrorKind::ConnectionError);
}

#[test]
fn test_timeout_bounds_each_call() {
    let options = OpenOptions::new().timeout(Duration::from_millis(50));
    let mut tb = Testbook::open(fixture("loop_forever.py"), options).unwrap();
    let err = tb.execute().unwrap_err();
    assert!(matches!(err, HarnessError::Timeout { unit: Unit::Cell(1), .. }));
    assert_eq!(tb.state(), RunState::Failed);
    assert!(tb.r#ref("n").unwrap().as_int().unwrap_or(0) > 0);
}

#[test]
fn test_open_with_execute_runs_everything() {
    let tb = Testbook::open(fixture("fails_at_cell_3.ipynb"), OpenOptions::new().execute(true));
    assert!(matches!(tb, Err(HarnessError::CellExecution { .. })));
}

#[test]
fn test_missing_notebook_is_a_load_error() {
    let err = Testbook::open("/definitely/not/here.ipynb", OpenOptions::new()).err().unwrap();
    assert!(matches!(err, HarnessError::Load(_)));
}
