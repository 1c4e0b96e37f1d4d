//! Outcome sinks used by the CLI: human-readable console output and JSON lines.

use std::io::{self, Write};

use miette::{GraphicalReportHandler, GraphicalTheme, NamedSource, Report};
use serde::Serialize;

use crate::execution::SpecStatus;
use crate::host::HostFault;
use crate::orchestrator::{OutcomeSink, RunSummary, SinkNode};

/// Which totals `finish` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Discovery,
    Run,
}

/// Text output: one line per node on `out`, discovery errors on `err`.
pub struct ConsoleSink<O: Write, E: Write> {
    out: O,
    err: E,
    style: SummaryStyle,
}

impl ConsoleSink<io::Stdout, io::Stderr> {
    pub fn stdio(style: SummaryStyle) -> Self {
        Self::new(io::stdout(), io::stderr(), style)
    }
}

impl<O: Write, E: Write> ConsoleSink<O, E> {
    pub fn new(out: O, err: E, style: SummaryStyle) -> Self {
        Self { out, err, style }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> OutcomeSink for ConsoleSink<O, E> {
    fn publish(&mut self, node: SinkNode) {
        // Write errors on stdout/stderr have nowhere better to go.
        let _ = match node {
            SinkNode::Spec(spec) => {
                let mut flags = String::new();
                if spec.is_focused() {
                    flags.push_str(" [focused]");
                }
                if spec.is_skipped() {
                    flags.push_str(" [skipped]");
                }
                if spec.is_pending() {
                    flags.push_str(" [pending]");
                }
                if spec.compilation_error().is_some() {
                    flags.push_str(" [not compiled]");
                }
                writeln!(self.out, "{}{}", spec.id(), flags)
            }
            SinkNode::DiscoveryError(error) => writeln!(
                self.err,
                "error: {}\n{}",
                error.source_file,
                render_fault(&error.absolute_source_file.to_string_lossy(), &error.fault)
            ),
            SinkNode::Result { source_file, result } => {
                let status = match result.status {
                    SpecStatus::Passed => "PASS",
                    SpecStatus::Failed => "FAIL",
                    SpecStatus::Skipped => "SKIP",
                    SpecStatus::Pending => "TODO",
                };
                let mut line = format!("{} {} :: {}", status, source_file, result.display_name);
                if result.status == SpecStatus::Passed {
                    line.push_str(&format!(" ({}ms)", result.duration.as_millis()));
                }
                if let Some(message) = &result.message {
                    line.push_str(&format!("\n    {}", message));
                }
                for frame in &result.trace {
                    line.push_str(&format!("\n      {}", frame));
                }
                writeln!(self.out, "{}", line)
            }
        };
    }

    fn finish(&mut self, summary: &RunSummary) {
        let line = match self.style {
            SummaryStyle::Discovery => format!("\n{} specs, {} errors", summary.discovered, summary.errors),
            SummaryStyle::Run => format!(
                "\n{} passed, {} failed, {} skipped, {} pending, {} errors",
                summary.passed, summary.failed, summary.skipped, summary.pending, summary.errors
            ),
        };
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }
}

/// One JSON object per line; a final `{"kind":"summary",...}` line closes the stream.
pub struct JsonSink<W: Write> {
    out: W,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    kind: &'static str,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                let _ = writeln!(self.out, "{}", line);
            }
            Err(err) => tracing::debug!(%err, "failed to serialize node"),
        }
    }
}

impl<W: Write> OutcomeSink for JsonSink<W> {
    fn publish(&mut self, node: SinkNode) {
        self.write_line(&node);
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.write_line(&SummaryLine {
            kind: "summary",
            summary,
        });
        let _ = self.out.flush();
    }
}

/// Render a fault for humans. Compile diagnostics get a source snippet.
pub fn render_fault(name: &str, fault: &HostFault) -> String {
    match fault {
        HostFault::Compile {
            diagnostics, unit_text, ..
        } if !diagnostics.is_empty() => {
            let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
            let mut out = String::new();
            for diagnostic in diagnostics {
                let report = Report::new(diagnostic.error.to_diagnostic())
                    .with_source_code(NamedSource::new(name, unit_text.to_string()));
                if handler.render_report(&mut out, &*report).is_err() {
                    out.push_str(&diagnostic.to_string());
                    out.push('\n');
                }
            }
            out
        }
        HostFault::Runtime { message, trace } => {
            let mut out = format!("runtime error: {}", message);
            for frame in trace {
                out.push_str(&format!("\n    {}", frame));
            }
            out
        }
        other => other.to_string(),
    }
}
