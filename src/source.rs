//! Source resolution: directive inlining and line mapping.
//!
//! A spec file may pull in other files with `#load "path"` and name native libraries with `#ref "name"`. Resolution
//! walks inclusions depth-first with a visited set and concatenates every file body into one [`SourceUnit`],
//! dependencies first and the root file last.
//!
//! ## Notes
//! - Directive lines are blanked, not removed, so line numbers inside each segment are unchanged.
//! - The unit records problems (unknown directives, missing includes) instead of failing, so the tolerant
//!   structural parser can still walk a file the host refuses to compile.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use specrun_core::lang::directives::{self, DirectiveId};

use crate::hashing::{DependencyHash, hash_bytes};

/// Failure to read the root file of a unit.
#[derive(Debug, thiserror::Error)]
#[error("cannot read {}: {source}", path.display())]
pub struct SourceError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A `#ref` directive found during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    /// `true` for `pkg:` references owned by the external package manager.
    pub is_package: bool,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveProblemKind {
    /// `#name` is not a known directive.
    Unknown,
    /// A known directive without a quoted argument.
    Malformed,
    /// `#load` target cannot be read.
    MissingInclude,
}

/// A directive the resolver could not honor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveProblem {
    pub kind: DirectiveProblemKind,
    pub message: String,
    pub file: PathBuf,
    pub line: usize,
}

/// Where a line of the combined unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineOrigin {
    file: usize,
    line: usize,
}

/// Maps 1-based unit lines back to `(file, line)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    files: Vec<PathBuf>,
    lines: Vec<LineOrigin>,
}

impl LineMap {
    /// Resolve a 1-based line of the combined unit.
    pub fn resolve(&self, unit_line: usize) -> Option<(&Path, usize)> {
        let origin = self.lines.get(unit_line.checked_sub(1)?)?;
        Some((self.files[origin.file].as_path(), origin.line))
    }

    /// Resolve to the line within its own file, falling back to the unit line.
    pub fn file_line(&self, unit_line: usize) -> usize {
        self.resolve(unit_line).map_or(unit_line, |(_, line)| line)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Inverse of [`LineMap::resolve`]: the unit line holding `line` of `file`.
    pub fn unit_line(&self, file: &Path, line: usize) -> Option<usize> {
        let file_idx = self.files.iter().position(|f| f == file)?;
        self.lines
            .iter()
            .position(|origin| origin.file == file_idx && origin.line == line)
            .map(|idx| idx + 1)
    }

    fn push_file(&mut self, file: &Path, line_count: usize) {
        let idx = self.files.len();
        self.files.push(file.to_path_buf());
        self.lines
            .extend((1..=line_count).map(|line| LineOrigin { file: idx, line }));
    }
}

/// One directive-inlined compilation unit.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Absolute path of the root file.
    pub root: PathBuf,
    /// Combined text of all segments, dependencies first.
    pub text: String,
    pub line_map: LineMap,
    /// Every file read, root first, each with the hash of the bytes that went into `text`.
    pub dependencies: Vec<DependencyHash>,
    pub references: Vec<Reference>,
    pub problems: Vec<DirectiveProblem>,
}

impl SourceUnit {
    /// Fingerprint of every participating file's content.
    pub fn fingerprint(&self) -> String {
        let mut joined = String::new();
        for dep in &self.dependencies {
            joined.push_str(&dep.hash);
            joined.push('\n');
        }
        hash_bytes(joined.as_bytes())
    }
}

/// Resolve `path` and everything it includes into one [`SourceUnit`].
///
/// ## Errors
/// Returns [`SourceError`] only when the root file itself cannot be read. Unreadable includes are recorded as
/// [`DirectiveProblemKind::MissingInclude`].
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn resolve(path: &Path) -> Result<SourceUnit, SourceError> {
    let root = absolute(path).map_err(|source| SourceError {
        path: path.to_path_buf(),
        source,
    })?;

    let mut resolver = Resolver::default();
    let text = std::fs::read_to_string(&root).map_err(|source| SourceError {
        path: root.clone(),
        source,
    })?;
    resolver.visit_text(&root, text);

    tracing::debug!(
        files = resolver.dependencies.len(),
        problems = resolver.problems.len(),
        "resolved source unit"
    );

    Ok(SourceUnit {
        root,
        text: resolver.text,
        line_map: resolver.line_map,
        dependencies: resolver.dependencies,
        references: resolver.references,
        problems: resolver.problems,
    })
}

/// Absolute, symlink-free form of `path` when it exists.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    path.canonicalize().or_else(|_| std::path::absolute(path))
}

#[derive(Default)]
struct Resolver {
    visited: HashSet<PathBuf>,
    text: String,
    line_map: LineMap,
    dependencies: Vec<DependencyHash>,
    references: Vec<Reference>,
    problems: Vec<DirectiveProblem>,
}

impl Resolver {
    fn visit_text(&mut self, file: &Path, text: String) {
        if !self.visited.insert(file.to_path_buf()) {
            return;
        }
        self.dependencies.push(DependencyHash::new(file, hash_bytes(text.as_bytes())));

        let mut body = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            match parse_directive(line) {
                Some(directive) => {
                    self.apply(file, line_no, directive);
                    body.push("");
                }
                None => body.push(line),
            }
        }

        self.line_map.push_file(file, body.len());
        for line in body {
            self.text.push_str(line);
            self.text.push('\n');
        }
    }

    fn apply(&mut self, file: &Path, line: usize, directive: RawDirective<'_>) {
        let problem = |kind, message: String| DirectiveProblem {
            kind,
            message,
            file: file.to_path_buf(),
            line,
        };

        let Some(id) = directives::from_str(directive.name) else {
            self.problems.push(problem(
                DirectiveProblemKind::Unknown,
                format!("Unknown directive '#{}'", directive.name),
            ));
            return;
        };
        let Some(argument) = directive.argument else {
            self.problems.push(problem(
                DirectiveProblemKind::Malformed,
                format!("Directive '#{}' expects a quoted argument", directives::as_str(id)),
            ));
            return;
        };

        match id {
            DirectiveId::Load => {
                let target = file.parent().unwrap_or(Path::new("")).join(argument);
                let loaded = absolute(&target).and_then(|abs| {
                    let text = std::fs::read_to_string(&abs)?;
                    Ok((abs, text))
                });
                match loaded {
                    Ok((abs, text)) => self.visit_text(&abs, text),
                    Err(err) => self.problems.push(problem(
                        DirectiveProblemKind::MissingInclude,
                        format!("Cannot load '{}': {}", argument, err),
                    )),
                }
            }
            DirectiveId::Ref => self.references.push(Reference {
                name: argument.trim().to_string(),
                is_package: directives::is_package_reference(argument),
                file: file.to_path_buf(),
                line,
            }),
        }
    }
}

struct RawDirective<'a> {
    name: &'a str,
    argument: Option<&'a str>,
}

/// Recognize a whole-line directive: `#name "argument"`.
fn parse_directive(line: &str) -> Option<RawDirective<'_>> {
    let rest = line.trim_start().strip_prefix(directives::DIRECTIVE_MARKER)?;
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(name_len);
    let tail = tail.trim();

    let argument = ['"', '\'']
        .into_iter()
        .find_map(|q| tail.strip_prefix(q).and_then(|t| t.strip_suffix(q)));

    Some(RawDirective { name, argument })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn plain_file_is_a_single_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.spec", "context(\"A\") {\n}\n");

        let unit = resolve(&path).unwrap();
        assert_eq!(unit.text, "context(\"A\") {\n}\n");
        assert_eq!(unit.dependencies.len(), 1);
        assert_eq!(unit.dependencies[0].path, absolute(&path).unwrap());
        assert!(unit.problems.is_empty());
    }

    #[test]
    fn includes_come_first_and_lines_map_back() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/helpers.spec", "fn helper() {}\nfn other() {}\n");
        let root = write(
            dir.path(),
            "root.spec",
            "#load \"lib/helpers.spec\"\ncontext(\"R\") {}\n",
        );

        let unit = resolve(&root).unwrap();
        assert_eq!(unit.text, "fn helper() {}\nfn other() {}\n\ncontext(\"R\") {}\n");

        // root first in dependencies, last in text
        assert_eq!(unit.dependencies.len(), 2);
        assert!(unit.dependencies[0].path.ends_with("root.spec"));
        assert!(unit.dependencies[1].path.ends_with("helpers.spec"));

        let (file, line) = unit.line_map.resolve(4).unwrap();
        assert!(file.ends_with("root.spec"));
        assert_eq!(line, 2);
        let (file, line) = unit.line_map.resolve(2).unwrap();
        assert!(file.ends_with("helpers.spec"));
        assert_eq!(line, 2);
        assert!(unit.line_map.resolve(0).is_none());
        assert!(unit.line_map.resolve(5).is_none());
    }

    #[test]
    fn include_cycles_and_diamonds_inline_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.spec", "#load \"b.spec\"\n#load \"c.spec\"\nlet a = 1\n");
        write(dir.path(), "b.spec", "#load \"c.spec\"\n#load \"a.spec\"\nlet b = 1\n");
        write(dir.path(), "c.spec", "let c = 1\n");

        let unit = resolve(&dir.path().join("a.spec")).unwrap();
        assert_eq!(unit.dependencies.len(), 3);
        assert_eq!(unit.text.matches("let c = 1").count(), 1);
        assert_eq!(unit.text.matches("let a = 1").count(), 1);
        let c = unit.text.find("let c").unwrap();
        let b = unit.text.find("let b").unwrap();
        let a = unit.text.find("let a").unwrap();
        assert!(c < b && b < a);
    }

    #[test]
    fn references_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.spec", "#ref \"math\"\n#r \"pkg:json\"\n");

        let unit = resolve(&path).unwrap();
        assert_eq!(unit.references.len(), 2);
        assert_eq!(unit.references[0].name, "math");
        assert!(!unit.references[0].is_package);
        assert!(unit.references[1].is_package);
        assert_eq!(unit.references[1].line, 2);
    }

    #[test]
    fn problems_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "p.spec",
            "#load \"missing.spec\"\n#pragma \"x\"\n#load nothing\nspec(\"s\")\n",
        );

        let unit = resolve(&path).unwrap();
        let kinds: Vec<_> = unit.problems.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DirectiveProblemKind::MissingInclude,
                DirectiveProblemKind::Unknown,
                DirectiveProblemKind::Malformed,
            ]
        );
        assert_eq!(unit.problems[1].line, 2);
        assert_eq!(unit.text, "\n\n\nspec(\"s\")\n");
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&dir.path().join("gone.spec")).unwrap_err();
        assert!(err.to_string().contains("gone.spec"));
    }

    #[test]
    fn fingerprint_tracks_dependency_content() {
        let dir = tempfile::tempdir().unwrap();
        let dep = write(dir.path(), "dep.spec", "let x = 1\n");
        let root = write(dir.path(), "root.spec", "#load \"dep.spec\"\n");

        let before = resolve(&root).unwrap().fingerprint();
        assert_eq!(before, resolve(&root).unwrap().fingerprint());
        fs::write(&dep, "let x = 2\n").unwrap();
        assert_ne!(before, resolve(&root).unwrap().fingerprint());
    }
}
