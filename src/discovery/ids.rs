//! Stable spec identifiers.
//!
//! An id is `{relative file}:{context path joined by '/'}/{description}`. It depends only on where the spec is
//! declared, never on sibling order or on other files, so it survives reordering and unrelated edits.

use std::path::{Path, PathBuf};

/// Build the stable id of a spec.
pub fn spec_id(relative_file: &str, context_path: &[String], description: &str) -> String {
    format!(
        "{}:{}/{}",
        relative_file.replace('\\', "/"),
        context_path.join("/"),
        description
    )
}

/// Display name used when results are mapped back by id: `Outer > Inner > spec`.
pub fn display_path(context_path: &[String], description: &str) -> String {
    context_path
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(description))
        .collect::<Vec<_>>()
        .join(" > ")
}

/// The file part of an id (everything before the first `:`).
pub fn file_of_id(id: &str) -> Option<&str> {
    id.split_once(':').map(|(file, _)| file)
}

/// Path of `file` relative to `root`, `/`-separated. Files outside the root keep their full path.
pub fn relative_source_file(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative.to_string_lossy().replace('\\', "/")
}

/// A spec file as both an absolute path and its id prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecFile {
    pub absolute: PathBuf,
    pub relative: String,
}

impl SpecFile {
    pub fn new(root: &Path, absolute: impl Into<PathBuf>) -> Self {
        let absolute = absolute.into();
        let relative = relative_source_file(root, &absolute);
        Self { absolute, relative }
    }

    pub fn spec_id(&self, context_path: &[String], description: &str) -> String {
        spec_id(&self.relative, context_path, description)
    }
}
