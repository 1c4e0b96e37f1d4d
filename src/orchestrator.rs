//! Top-level workflows: discover a project, or run all or some of its specs.
//!
//! Results are pushed to an [`OutcomeSink`] as they become available. The orchestrator owns the host and the parse
//! cache for its project, so compiled scripts are shared between discovery and execution within one process.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::cache::ParseResultCache;
use crate::cancel::CancellationToken;
use crate::config::ProjectConfig;
use crate::discovery::{DiscoveredSpec, Discoverer, DiscoveryError, DiscoveryResult, display_path, file_of_id};
use crate::error::SpecrunError;
use crate::execution::{Executor, SpecResult, SpecStatus};
use crate::host::ScriptExecutionHost;

/// One published outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkNode {
    /// A spec found by discovery.
    Spec(DiscoveredSpec),
    /// A file that yielded no specs because it faulted.
    DiscoveryError(DiscoveryError),
    /// The outcome of running (or failing to run) one spec.
    Result {
        source_file: String,
        #[serde(flatten)]
        result: SpecResult,
    },
}

/// Receives published nodes.
pub trait OutcomeSink {
    fn publish(&mut self, node: SinkNode);

    /// Called once after a workflow completes.
    fn finish(&mut self, _summary: &RunSummary) {}
}

/// Keeps every node in publication order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub nodes: Vec<SinkNode>,
}

impl OutcomeSink for CollectingSink {
    fn publish(&mut self, node: SinkNode) {
        self.nodes.push(node);
    }
}

/// Counts of published outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    /// Files that could not be discovered at all.
    pub errors: usize,
}

impl RunSummary {
    fn record(&mut self, status: SpecStatus) {
        match status {
            SpecStatus::Passed => self.passed += 1,
            SpecStatus::Failed => self.failed += 1,
            SpecStatus::Skipped => self.skipped += 1,
            SpecStatus::Pending => self.pending += 1,
        }
    }

    /// No failed spec and no undiscoverable file.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Drives discovery and execution for one project.
pub struct Orchestrator {
    config: ProjectConfig,
    host: ScriptExecutionHost,
    cache: ParseResultCache,
}

impl Orchestrator {
    pub fn new(config: ProjectConfig) -> Self {
        let cache = config.cache();
        Self {
            config,
            host: ScriptExecutionHost::new(),
            cache,
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn host(&self) -> &ScriptExecutionHost {
        &self.host
    }

    pub fn cache(&self) -> &ParseResultCache {
        &self.cache
    }

    fn discoverer(&self) -> Discoverer<'_> {
        Discoverer::new(&self.config, &self.host, &self.cache)
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.config.root, &self.host)
    }

    /// Publish every discovered spec and discovery error.
    ///
    /// ## Errors
    /// See [`Discoverer::discover_all`].
    #[tracing::instrument(skip_all)]
    pub fn discover(
        &self,
        sink: &mut dyn OutcomeSink,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, SpecrunError> {
        let discovery = self.discoverer().discover_all(cancel)?;
        let summary = RunSummary {
            discovered: discovery.specs.len(),
            errors: discovery.errors.len(),
            ..RunSummary::default()
        };
        for spec in &discovery.specs {
            sink.publish(SinkNode::Spec(spec.clone()));
        }
        for error in &discovery.errors {
            sink.publish(SinkNode::DiscoveryError(error.clone()));
        }
        sink.finish(&summary);
        Ok(discovery)
    }

    /// Run every spec (`ids == None`) or exactly the requested ones.
    ///
    /// Requested ids that belong to a file that does not compile are published as failures, or as that file's
    /// discovery error when nothing could be recovered from it. Ids that do not exist are not published at all.
    ///
    /// ## Errors
    /// IO errors while listing files, or cancellation.
    #[tracing::instrument(skip_all, fields(by_id = ids.is_some()))]
    pub fn run(
        &self,
        ids: Option<&[String]>,
        sink: &mut dyn OutcomeSink,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, SpecrunError> {
        let discovery = self.discoverer().discover_all(cancel)?;
        let mut summary = RunSummary {
            discovered: discovery.specs.len(),
            ..RunSummary::default()
        };

        match ids {
            None => self.run_all(&discovery, sink, cancel, &mut summary)?,
            Some(ids) => self.run_ids(&discovery, ids, sink, cancel, &mut summary)?,
        }

        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            pending = summary.pending,
            errors = summary.errors,
            "run finished"
        );
        sink.finish(&summary);
        Ok(summary)
    }

    fn run_all(
        &self,
        discovery: &DiscoveryResult,
        sink: &mut dyn OutcomeSink,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<(), SpecrunError> {
        for error in &discovery.errors {
            summary.errors += 1;
            sink.publish(SinkNode::DiscoveryError(error.clone()));
        }

        let mut by_id: HashMap<&str, &DiscoveredSpec> = HashMap::new();
        let mut groups: Vec<(PathBuf, Vec<&DiscoveredSpec>)> = Vec::new();
        for spec in &discovery.specs {
            if let Some(error) = spec.compilation_error() {
                publish_result(sink, summary, spec.source_file(), compile_failure(spec, spec.description(), error));
                continue;
            }
            by_id.insert(spec.id(), spec);
            match groups.last_mut() {
                Some((file, specs)) if file.as_path() == spec.absolute_source_file() => specs.push(spec),
                _ => groups.push((spec.absolute_source_file().to_path_buf(), vec![spec])),
            }
        }

        let executor = self.executor();
        for (file, specs) in groups {
            if cancel.is_cancelled() {
                return Err(SpecrunError::Cancelled);
            }
            let source_file = specs[0].source_file().to_string();
            match executor.execute_file(&file, None) {
                Ok(execution) => {
                    for mut result in execution.results {
                        if let Some(spec) = by_id.get(result.id.as_str()) {
                            result.display_name = spec.description().to_string();
                        }
                        publish_result(sink, summary, &source_file, result);
                    }
                }
                // The file ran during discovery but not now (it changed in between).
                Err(fault) => {
                    let message = fault.to_string();
                    for spec in specs {
                        publish_result(sink, summary, &source_file, compile_failure(spec, spec.description(), &message));
                    }
                }
            }
        }
        Ok(())
    }

    fn run_ids(
        &self,
        discovery: &DiscoveryResult,
        ids: &[String],
        sink: &mut dyn OutcomeSink,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<(), SpecrunError> {
        let known: HashMap<&str, &DiscoveredSpec> = discovery.specs.iter().map(|s| (s.id(), s)).collect();
        let undiscoverable: HashMap<&str, &DiscoveryError> =
            discovery.errors.iter().map(|e| (e.source_file.as_str(), e)).collect();

        let mut reported_files = HashSet::new();
        let mut seen = HashSet::new();
        let mut executable = Vec::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match known.get(id.as_str()) {
                Some(spec) => match spec.compilation_error() {
                    Some(error) => {
                        let display_name = display_path(spec.context_path(), spec.description());
                        publish_result(sink, summary, spec.source_file(), compile_failure(spec, &display_name, error));
                    }
                    None => executable.push(id.clone()),
                },
                // The id may name a spec in a file that faulted with nothing recoverable.
                None => match file_of_id(id).and_then(|file| undiscoverable.get(file)) {
                    Some(error) => {
                        if reported_files.insert(error.source_file.as_str()) {
                            summary.errors += 1;
                            sink.publish(SinkNode::DiscoveryError((*error).clone()));
                        }
                    }
                    None => tracing::debug!(%id, "requested spec does not exist"),
                },
            }
        }

        for execution in self.executor().execute_by_ids(&executable, cancel)? {
            for result in execution.results {
                publish_result(sink, summary, &execution.source_file, result);
            }
        }
        Ok(())
    }
}

fn compile_failure(spec: &DiscoveredSpec, display_name: &str, error: &str) -> SpecResult {
    SpecResult {
        id: spec.id().to_string(),
        description: spec.description().to_string(),
        display_name: display_name.to_string(),
        context_path: spec.context_path().to_vec(),
        status: SpecStatus::Failed,
        duration: Duration::ZERO,
        message: Some(error.to_string()),
        trace: Vec::new(),
    }
}

fn publish_result(sink: &mut dyn OutcomeSink, summary: &mut RunSummary, source_file: &str, result: SpecResult) {
    summary.record(result.status);
    sink.publish(SinkNode::Result {
        source_file: source_file.to_string(),
        result,
    });
}
