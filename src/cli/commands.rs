//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;

use crate::cancel::CancellationToken;
use crate::config::ProjectConfig;
use crate::orchestrator::{OutcomeSink, Orchestrator};
use crate::SpecrunError;

use super::sinks::{ConsoleSink, JsonSink, SummaryStyle};
use super::{CliError, CliResult, ExitCode};

fn load_config(root: &Path) -> CliResult<ProjectConfig> {
    ProjectConfig::load(root).map_err(|e| CliError::from(SpecrunError::from(e)))
}

fn sink(json: bool, style: SummaryStyle) -> Box<dyn OutcomeSink> {
    if json {
        Box::new(JsonSink::stdout())
    } else {
        Box::new(ConsoleSink::stdio(style))
    }
}

/// `specrun discover`
pub fn discover(root: &Path, json: bool) -> CliResult<ExitCode> {
    let orchestrator = Orchestrator::new(load_config(root)?);
    let mut sink = sink(json, SummaryStyle::Discovery);
    let discovery = orchestrator.discover(sink.as_mut(), &CancellationToken::new())?;

    if discovery.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// `specrun run`; an empty `ids` runs everything.
pub fn run_specs(root: &Path, ids: &[String], json: bool) -> CliResult<ExitCode> {
    let orchestrator = Orchestrator::new(load_config(root)?);
    let mut sink = sink(json, SummaryStyle::Run);
    let requested = (!ids.is_empty()).then_some(ids);
    let summary = orchestrator.run(requested, sink.as_mut(), &CancellationToken::new())?;

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// `specrun cache clear`
pub fn clear_cache(root: &Path) -> CliResult<ExitCode> {
    let config = load_config(root)?;
    let cache = config.cache();
    if !cache.is_enabled() {
        println!("Parse cache is disabled");
        return Ok(ExitCode::SUCCESS);
    }
    let removed = cache
        .clear()
        .map_err(|e| CliError::failure(format!("Error clearing {}: {}", cache.dir().display(), e)))?;
    println!("Removed {} cache file(s) from {}", removed, cache.dir().display());
    Ok(ExitCode::SUCCESS)
}
