//! CLI module for specrun
//!
//! ## Commands
//!
//! - `discover [ROOT]` - List every spec of a project
//! - `run [ROOT] [--id ID]...` - Run all specs, or only the given ids
//! - `cache clear [ROOT]` - Delete the structural parse cache
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `sinks` - Console and JSON-lines outcome sinks
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
pub mod sinks;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::version::SPECRUN_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad project setup (unreadable root, invalid `specrun.toml`).
    pub const CONFIG: ExitCode = ExitCode(2);
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
    /// Create a new CLI error with a message and exit code.
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
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<crate::SpecrunError> for CliError {
    fn from(err: crate::SpecrunError) -> Self {
        let exit_code = match err {
            crate::SpecrunError::Config(_) => ExitCode::CONFIG,
            crate::SpecrunError::Io(_) | crate::SpecrunError::Cancelled => ExitCode::FAILURE,
        };
        Self::new(format!("Error: {}", err), exit_code)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Discover and run behavior-driven spec scripts
#[derive(Parser, Debug)]
#[command(name = "specrun")]
#[command(version = SPECRUN_VERSION)]
#[command(about = "Discover and run behavior-driven spec scripts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every spec of a project
    Discover {
        /// Project root
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run all specs, or only the given ids
    Run {
        /// Project root
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
        /// Spec id to run (repeatable)
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,
        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the structural parse cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Delete every cache entry
    Clear {
        /// Project root
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
    },
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
        Command::Discover { root, json } => commands::discover(&root, json),
        Command::Run { root, ids, json } => commands::run_specs(&root, &ids, json),
        Command::Cache {
            action: CacheCommand::Clear { root },
        } => commands::clear_cache(&root),
    }
}

// ============================================================================
// Tests
// ============================================================================
