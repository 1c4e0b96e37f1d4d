//! Spec execution: run a file (or a set of ids) and capture one result per spec.
//!
//! The executor recompiles nothing it does not have to: the host reuses its compiled artifact, and each execution
//! re-runs the script to get a fresh tree. Ids are computed by the same flattening discovery uses, so an id
//! obtained from discovery always selects the same spec here.
//!
//! ## Run semantics
//! - If any included spec of a file is focused, the other included specs are skipped.
//! - Skipped specs report `Skipped`, specs without a body report `Pending`.
//! - `before_all` and `after_all` run once per context that executes at least one spec.
//! - `before_each` runs outermost first, `after_each` innermost first. A failing hook fails the specs it guards.

pub mod reporter;
mod runner;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use specrun_core::lang::dsl::Variant;

use crate::cancel::CancellationToken;
use crate::discovery::{SpecFile, display_path, file_of_id, flatten_specs};
use crate::error::SpecrunError;
use crate::host::{HostFault, ScriptExecutionHost};
use crate::source;

pub use reporter::{CollectingReporter, SpecReporter, TracingReporter};
use runner::{Disposition, Planned, TreeRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
}

/// Outcome of one spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecResult {
    pub id: String,
    pub description: String,
    /// `Outer > Inner > description`.
    pub display_name: String,
    pub context_path: Vec<String>,
    pub status: SpecStatus,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub message: Option<String>,
    pub trace: Vec<String>,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Results of one file, in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub source_file: String,
    pub absolute_source_file: PathBuf,
    pub results: Vec<SpecResult>,
}

/// Runs specs of one project.
pub struct Executor<'a> {
    root: &'a Path,
    host: &'a ScriptExecutionHost,
}

impl<'a> Executor<'a> {
    pub fn new(root: &'a Path, host: &'a ScriptExecutionHost) -> Self {
        Self { root, host }
    }

    /// Run the specs of `path`, restricted to `filter` when given.
    ///
    /// ## Errors
    /// Without a filter, a fault of the file itself is returned. With a filter, the fault becomes one failed
    /// result per requested id instead.
    pub fn execute_file(&self, path: &Path, filter: Option<&HashSet<String>>) -> Result<ExecutionResult, HostFault> {
        let mut collector = CollectingReporter::new();
        let file = self.execute_file_with(path, filter, &mut collector)?;
        Ok(ExecutionResult {
            source_file: file.relative,
            absolute_source_file: file.absolute,
            results: collector.into_results(),
        })
    }

    /// Like [`Executor::execute_file`], streaming results to `reporter`. Returns the file that was run.
    ///
    /// ## Errors
    /// See [`Executor::execute_file`].
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn execute_file_with(
        &self,
        path: &Path,
        filter: Option<&HashSet<String>>,
        reporter: &mut dyn SpecReporter,
    ) -> Result<SpecFile, HostFault> {
        let absolute = source::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let file = SpecFile::new(self.root, absolute);
        let mut reporter = TracingReporter::new(reporter);

        let tree = match self.host.execute(&file.absolute) {
            Ok(tree) => tree,
            Err(fault) => {
                let Some(ids) = filter else {
                    return Err(fault);
                };
                reporter.on_file_start(&file);
                let mut ids: Vec<&String> = ids.iter().collect();
                ids.sort();
                for id in ids {
                    reporter.on_spec_complete(&faulted_result(id, &fault));
                }
                reporter.on_file_complete(&file);
                return Ok(file);
            }
        };

        reporter.on_file_start(&file);
        if let Some(tree) = tree {
            let flat = flatten_specs(&tree);
            let mut plan = HashMap::new();
            let mut focused = false;
            let mut included = Vec::new();
            for spec in &flat {
                let id = file.spec_id(&spec.context_path, &spec.spec.description);
                if filter.is_some_and(|ids| !ids.contains(&id)) {
                    continue;
                }
                focused |= spec.variant == Variant::Focused;
                included.push((spec, id));
            }

            for (spec, id) in included {
                let disposition = if spec.variant == Variant::Skipped || (focused && spec.variant != Variant::Focused) {
                    Disposition::Skip
                } else if spec.spec.is_pending() {
                    Disposition::Pending
                } else {
                    Disposition::Run
                };
                plan.insert(
                    Rc::as_ptr(spec.spec),
                    Planned {
                        id,
                        description: spec.spec.description.clone(),
                        context_path: spec.context_path.clone(),
                        disposition,
                    },
                );
            }

            TreeRun::new(plan, &mut reporter).run(&tree);
        }
        reporter.on_file_complete(&file);
        Ok(file)
    }

    /// Run exactly the specs named by `ids`, grouped by file.
    ///
    /// Groups whose file no longer exists are skipped. Each group runs independently, so one faulting file only
    /// affects its own ids. Only results whose id was requested are returned.
    ///
    /// ## Errors
    /// [`SpecrunError::Cancelled`] if `cancel` fires between files.
    #[tracing::instrument(skip_all, fields(ids = ids.len()))]
    pub fn execute_by_ids(
        &self,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ExecutionResult>, SpecrunError> {
        let mut groups: Vec<(&str, HashSet<String>)> = Vec::new();
        for id in ids {
            let Some(file) = file_of_id(id) else {
                tracing::warn!(%id, "ignoring malformed spec id");
                continue;
            };
            match groups.iter_mut().find(|(f, _)| *f == file) {
                Some((_, set)) => {
                    set.insert(id.clone());
                }
                None => groups.push((file, HashSet::from([id.clone()]))),
            }
        }

        let mut results = Vec::new();
        for (file, requested) in groups {
            if cancel.is_cancelled() {
                return Err(SpecrunError::Cancelled);
            }
            let path = self.root.join(file);
            if !path.is_file() {
                tracing::warn!(file, "skipping ids of a file that no longer exists");
                continue;
            }
            match self.execute_file(&path, Some(&requested)) {
                Ok(mut result) => {
                    result.results.retain(|r| requested.contains(&r.id));
                    results.push(result);
                }
                // Unreachable with a filter, but a fault must never abort the other groups.
                Err(fault) => tracing::warn!(file, %fault, "file faulted"),
            }
        }
        Ok(results)
    }
}

/// Failed result standing in for a requested spec of a file that faulted.
fn faulted_result(id: &str, fault: &HostFault) -> SpecResult {
    let (context_path, description) = split_id(id);
    SpecResult {
        id: id.to_string(),
        display_name: display_path(&context_path, &description),
        description,
        context_path,
        status: SpecStatus::Failed,
        duration: Duration::ZERO,
        message: Some(fault.to_string()),
        trace: fault.trace().to_vec(),
    }
}

/// Best-effort split of an id's path part into context path and description.
fn split_id(id: &str) -> (Vec<String>, String) {
    let path = id.split_once(':').map_or(id, |(_, rest)| rest);
    match path.rsplit_once('/') {
        Some((contexts, description)) => {
            let context_path = contexts
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            (context_path, description.to_string())
        }
        None => (Vec::new(), path.to_string()),
    }
}
