//! CLI module for cellbook
//!
//! ## Commands
//!
//! - `cells <notebook>` - List cells with their indices
//! - `check <notebook>` - Parse every code cell and report syntax errors
//! - `run <notebook>` - Execute steps, then extract and validate results
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::harness::Contract;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The notebook ran but its results did not match the contract
    pub const MISMATCH: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic with miette's graphical reporter.
    pub fn report(diagnostic: impl miette::Diagnostic + Send + Sync + 'static, exit_code: ExitCode) -> Self {
        Self::new(format!("{:?}", miette::Report::new(diagnostic)), exit_code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Execute and validate literate notebooks
#[derive(Parser, Debug)]
#[command(name = "cellbook")]
#[command(version = VERSION)]
#[command(about = "Execute and validate literate notebooks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the cells of a notebook
    Cells {
        #[arg(value_name = "NOTEBOOK")]
        notebook: PathBuf,
    },

    /// Parse every code cell without running anything
    Check {
        #[arg(value_name = "NOTEBOOK")]
        notebook: PathBuf,
    },

    /// Run a notebook in phases
    Run {
        #[arg(value_name = "NOTEBOOK")]
        notebook: PathBuf,
        /// `inject:FILE`, `inject@INDEX:FILE`, `run:LO..HI`, `run:LO..`, `run:INDEX` or `run:all`; in order
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<Step>,
        /// Key-set contract checked after the steps, e.g. `metrics.history=loss,val_loss`
        #[arg(long, value_name = "NAME.PATH=KEYS")]
        expect: Vec<Contract>,
        /// Print the repr of a global after the steps
        #[arg(long, value_name = "NAME")]
        extract: Vec<String>,
        /// Budget per execution call, in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// RNG seed (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_seed_arg)]
        seed: Option<u64>,
        /// Fixture directory exposed to cells through the input-directory variable
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,
    },
}

fn parse_seed_arg(raw: &str) -> Result<u64, String> {
    crate::config::parse_seed(raw).ok_or_else(|| format!("invalid seed '{raw}'"))
}

/// One `--step` of a phased run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Queue a file's contents at the cursor, or before an explicit cell
    Inject { anchor: Option<usize>, file: PathBuf },
    /// Execute `lo..hi`; `hi = None` runs to the end
    Run { lo: usize, hi: Option<usize> },
    /// Execute everything from the cursor
    RunAll,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid step '{s}': expected inject:FILE or run:RANGE"))?;
        let index = |raw: &str| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid cell index '{raw}' in step '{s}'"))
        };
        match verb {
            "inject" => Ok(Step::Inject {
                anchor: None,
                file: PathBuf::from(arg),
            }),
            _ if verb.starts_with("inject@") => Ok(Step::Inject {
                anchor: Some(index(&verb["inject@".len()..])?),
                file: PathBuf::from(arg),
            }),
            "run" if arg == "all" => Ok(Step::RunAll),
            "run" => match arg.split_once("..") {
                Some((lo, "")) => Ok(Step::Run { lo: index(lo)?, hi: None }),
                Some((lo, hi)) => Ok(Step::Run {
                    lo: index(lo)?,
                    hi: Some(index(hi)?),
                }),
                None => {
                    let i = index(arg)?;
                    Ok(Step::Run { lo: i, hi: Some(i + 1) })
                }
            },
            _ => Err(format!("unknown step '{verb}' in '{s}'")),
        }
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Cells { notebook } => commands::list_cells(&notebook),
        Command::Check { notebook } => commands::check_notebook(&notebook),
        Command::Run {
            notebook,
            steps,
            expect,
            extract,
            timeout,
            seed,
            input_dir,
        } => commands::run_notebook(&commands::RunRequest {
            notebook,
            steps,
            expect,
            extract,
            timeout,
            seed,
            input_dir,
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_cells() {
        let cli = Cli::try_parse_from(["cellbook", "cells", "nb.ipynb"]).unwrap();
        assert!(matches!(cli.command, Command::Cells { .. }));
    }

    #[test]
    fn test_cli_parse_run_with_steps() {
        let cli = Cli::try_parse_from([
            "cellbook",
            "run",
            "nb.ipynb",
            "--step",
            "inject:setup.py",
            "--step",
            "run:0..5",
            "--step",
            "inject@6:more.py",
            "--step",
            "run:6..",
            "--expect",
            "metrics.history=loss,val_loss",
            "--seed",
            "0x2A",
        ])
        .unwrap();
        let Command::Run { steps, expect, seed, .. } = cli.command else {
            panic!("Expected Run command");
        };
        assert_eq!(
            steps,
            vec![
                Step::Inject {
                    anchor: None,
                    file: PathBuf::from("setup.py")
                },
                Step::Run { lo: 0, hi: Some(5) },
                Step::Inject {
                    anchor: Some(6),
                    file: PathBuf::from("more.py")
                },
                Step::Run { lo: 6, hi: None },
            ]
        );
        assert_eq!(expect[0].target(), "metrics.history");
        assert_eq!(seed, Some(42));
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!("run:all".parse::<Step>(), Ok(Step::RunAll));
        assert_eq!("run:3".parse::<Step>(), Ok(Step::Run { lo: 3, hi: Some(4) }));
        assert!("run:a..b".parse::<Step>().is_err());
        assert!("exec:1".parse::<Step>().is_err());
        assert!("inject".parse::<Step>().is_err());
    }

    #[test]
    fn test_cli_rejects_bad_contract() {
        assert!(Cli::try_parse_from(["cellbook", "run", "nb.ipynb", "--expect", "metrics"]).is_err());
    }
}
