//! Reporting seam between the executor and whoever consumes spec outcomes.
//!
//! The executor never prints; it hands every finished [`SpecResult`] to a [`SpecReporter`]. Implement the trait to
//! stream progress, collect results, or emit another format.

use crate::discovery::SpecFile;

use super::SpecResult;

/// Receives outcomes as a file's specs finish.
pub trait SpecReporter {
    /// Called before the first spec of a file runs.
    fn on_file_start(&mut self, _file: &SpecFile) {}

    /// Called once per reported spec, in declaration order.
    fn on_spec_complete(&mut self, result: &SpecResult);

    /// Called after the last spec of a file, including when the file faulted.
    fn on_file_complete(&mut self, _file: &SpecFile) {}
}

/// Keeps every result in order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    results: Vec<SpecResult>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[SpecResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SpecResult> {
        self.results
    }
}

impl SpecReporter for CollectingReporter {
    fn on_spec_complete(&mut self, result: &SpecResult) {
        self.results.push(result.clone());
    }
}

/// Logs each outcome at `debug` and forwards it.
pub struct TracingReporter<'r> {
    inner: &'r mut dyn SpecReporter,
}

impl<'r> TracingReporter<'r> {
    pub fn new(inner: &'r mut dyn SpecReporter) -> Self {
        Self { inner }
    }
}

impl SpecReporter for TracingReporter<'_> {
    fn on_file_start(&mut self, file: &SpecFile) {
        tracing::debug!(file = %file.relative, "executing file");
        self.inner.on_file_start(file);
    }

    fn on_spec_complete(&mut self, result: &SpecResult) {
        tracing::debug!(id = %result.id, status = ?result.status, "spec finished");
        self.inner.on_spec_complete(result);
    }

    fn on_file_complete(&mut self, file: &SpecFile) {
        self.inner.on_file_complete(file);
    }
}
