//! Mapping from compiled-unit spans back to source files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use specrun_syntax::ast::Span;
use specrun_syntax::line_index::LineIndex;

use crate::source::{LineMap, SourceUnit};

/// A resolved position in one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// The text and line map of one compiled unit.
#[derive(Debug)]
pub struct ScriptOrigin {
    pub root: PathBuf,
    pub text: Arc<str>,
    line_index: LineIndex,
    line_map: LineMap,
}

impl ScriptOrigin {
    pub fn new(unit: &SourceUnit) -> Self {
        Self {
            root: unit.root.clone(),
            text: Arc::from(unit.text.as_str()),
            line_index: LineIndex::new(&unit.text),
            line_map: unit.line_map.clone(),
        }
    }

    pub fn locate(&self, span: Span) -> Location {
        let (unit_line, column) = self.line_index.line_col(span.start);
        let (file, line) = self
            .line_map
            .resolve(unit_line)
            .map_or((self.root.as_path(), unit_line), |(file, line)| (file, line));
        Location {
            file: file.to_path_buf(),
            line,
            column,
        }
    }

    /// 1-based line of `span` within its own file.
    pub fn line_of(&self, span: Span) -> usize {
        self.line_map.file_line(self.line_index.line(span.start))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
