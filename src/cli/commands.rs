//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cellbook_syntax::diagnostics::render;

use super::{CliError, CliResult, ExitCode, Step};
use crate::config::{HarnessConfig, OpenOptions};
use crate::document::{Document, LoadError};
use crate::harness::validate::render_diff;
use crate::harness::{Contract, HarnessError, Testbook};

/// Arguments of `cellbook run`.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub notebook: PathBuf,
    pub steps: Vec<Step>,
    pub expect: Vec<Contract>,
    pub extract: Vec<String>,
    pub timeout: Option<u64>,
    pub seed: Option<u64>,
    pub input_dir: Option<PathBuf>,
}

fn load(path: &Path) -> CliResult<Document> {
    Document::load(path).map_err(|e: LoadError| CliError::report(HarnessError::from(e), ExitCode::FAILURE))
}

/// One line per cell: index, kind and first line of source.
pub fn format_listing(document: &Document) -> String {
    let mut out = String::new();
    for cell in document.cells() {
        out.push_str(&format!("{:<4}{:<10}{}\n", cell.index, cell.kind.to_string(), cell.first_line()));
    }
    out
}

pub fn list_cells(path: &Path) -> CliResult<ExitCode> {
    let document = load(path)?;
    print!("{}", format_listing(&document));
    Ok(ExitCode::SUCCESS)
}

/// Rendered syntax errors of every code cell, empty when all parse.
pub fn check_document(document: &Document) -> Vec<String> {
    let mut reports = Vec::new();
    for cell in document.code_cells() {
        if let Err(errors) = cellbook_syntax::parse_source(&cell.source) {
            let name = format!("cell[{}]", cell.index);
            reports.extend(errors.iter().map(|e| render(&name, &cell.source, e)));
        }
    }
    reports
}

pub fn check_notebook(path: &Path) -> CliResult<ExitCode> {
    let document = load(path)?;
    let reports = check_document(&document);
    if reports.is_empty() {
        println!("{}: {} code cells parse", path.display(), document.code_cells().count());
        return Ok(ExitCode::SUCCESS);
    }
    for report in &reports {
        eprintln!("{report}");
    }
    Err(CliError::failure(format!("{} syntax error(s)", reports.len())))
}

fn config_for(request: &RunRequest) -> HarnessConfig {
    let mut config = HarnessConfig::from_env();
    if let Some(secs) = request.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(seed) = request.seed {
        config = config.with_seed(seed);
    }
    if let Some(dir) = &request.input_dir {
        config = config.with_input_dir(dir.to_string_lossy());
    }
    config
}

fn apply_step(tb: &mut Testbook, step: &Step) -> Result<(), HarnessError> {
    tracing::debug!(?step, "step");
    match step {
        Step::Inject { anchor, file } => {
            let code = fs::read_to_string(file).map_err(|source| {
                HarnessError::Load(LoadError::Io {
                    path: file.clone(),
                    source,
                })
            })?;
            match anchor {
                Some(index) => tb.inject_at(*index, &code)?,
                None => tb.inject(&code)?,
            };
            Ok(())
        }
        Step::Run { lo, hi } => tb.execute_range(*lo, *hi),
        Step::RunAll => tb.execute(),
    }
}

pub fn run_notebook(request: &RunRequest) -> CliResult<ExitCode> {
    let mut tb = Testbook::open_with_config(&request.notebook, OpenOptions::new(), config_for(request))
        .map_err(|e| CliError::report(e, ExitCode::FAILURE))?;

    let steps = if request.steps.is_empty() {
        vec![Step::RunAll]
    } else {
        request.steps.clone()
    };
    let outcome = steps.iter().try_for_each(|step| apply_step(&mut tb, step));

    for line in tb.take_output() {
        println!("{line}");
    }
    if let Err(err) = outcome {
        if let HarnessError::CellExecution { source_excerpt, .. } = &err {
            eprintln!("  {source_excerpt}");
        }
        tb.close().map_err(|e| CliError::report(e, ExitCode::FAILURE))?;
        return Err(CliError::report(err, ExitCode::FAILURE));
    }

    for name in &request.extract {
        let value = tb.r#ref(name).map_err(|e| CliError::report(e, ExitCode::FAILURE))?;
        println!("{name} = {}", value.repr());
    }

    let mut exit = ExitCode::SUCCESS;
    for contract in &request.expect {
        match tb.expect(contract) {
            Ok(()) => println!("ok: {}", contract.target()),
            Err(HarnessError::ContractMismatch { name, missing, extra }) => {
                println!("mismatch: {name}\n{}", render_diff(&missing, &extra));
                exit = ExitCode::MISMATCH;
            }
            Err(other) => return Err(CliError::report(other, ExitCode::FAILURE)),
        }
    }

    tb.close().map_err(|e| CliError::report(e, ExitCode::FAILURE))?;
    Ok(exit)
}
