//! Spec discovery: find every spec a project declares, with stable ids.
//!
//! Each candidate file is first run through the [`ScriptExecutionHost`]. If it runs, the live tree is flattened
//! into executable specs. If it faults, discovery falls back to the parse cache and then the static structural
//! parser; specs recovered that way are reported but carry the fault and cannot be executed.
//!
//! ## Notes
//! - One bad file never aborts discovery. Only IO errors while listing files and cancellation do.
//! - Cancellation is checked between files.

pub mod flatten;
pub mod ids;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use specrun_core::lang::dsl::Variant;

use crate::cache::ParseResultCache;
use crate::cancel::CancellationToken;
use crate::config::ProjectConfig;
use crate::error::SpecrunError;
use crate::host::{HostFault, ScriptExecutionHost, SpecNode};
use crate::source;
use crate::structural::{self, StaticParseResult};

pub use flatten::{ContextView, FlatSpec, SpecView, StaticTree, TreeItem, flatten_specs};
pub use ids::{SpecFile, display_path, file_of_id, spec_id};

/// One discovered spec.
///
/// A spec is either executable (it came from a successful run and holds the live node) or carries the compilation
/// error of its file. The two constructors are the only way to build one, so the two states cannot mix.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredSpec {
    id: String,
    description: String,
    display_name: String,
    context_path: Vec<String>,
    source_file: String,
    absolute_source_file: PathBuf,
    is_pending: bool,
    is_skipped: bool,
    is_focused: bool,
    tags: Vec<String>,
    line_number: usize,
    compilation_error: Option<String>,
    #[serde(skip)]
    node: Option<Rc<SpecNode>>,
}

impl DiscoveredSpec {
    fn from_flat<S: SpecView>(
        file: &SpecFile,
        flat: &FlatSpec<'_, S>,
        node: Option<Rc<SpecNode>>,
        compilation_error: Option<String>,
    ) -> Self {
        let description = flat.spec.description().to_string();
        Self {
            id: file.spec_id(&flat.context_path, &description),
            display_name: description.clone(),
            description,
            context_path: flat.context_path.clone(),
            source_file: file.relative.clone(),
            absolute_source_file: file.absolute.clone(),
            is_pending: flat.spec.is_pending(),
            is_skipped: flat.variant == Variant::Skipped,
            is_focused: flat.variant == Variant::Focused,
            tags: flat.tags.clone(),
            line_number: flat.spec.line(),
            compilation_error,
            node,
        }
    }

    /// A spec from a successful run, backed by its live node.
    pub fn executable(file: &SpecFile, flat: &FlatSpec<'_, Rc<SpecNode>>) -> Self {
        Self::from_flat(file, flat, Some(Rc::clone(flat.spec)), None)
    }

    /// A spec recovered statically from a file that does not run.
    pub fn with_compilation_error<S: SpecView>(
        file: &SpecFile,
        flat: &FlatSpec<'_, S>,
        error: impl Into<String>,
    ) -> Self {
        Self::from_flat(file, flat, None, Some(error.into()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn context_path(&self) -> &[String] {
        &self.context_path
    }

    /// Source file relative to the project root, `/`-separated.
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn absolute_source_file(&self) -> &Path {
        &self.absolute_source_file
    }

    pub fn is_pending(&self) -> bool {
        self.is_pending
    }

    pub fn is_skipped(&self) -> bool {
        self.is_skipped
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn compilation_error(&self) -> Option<&str> {
        self.compilation_error.as_deref()
    }

    pub fn node(&self) -> Option<&Rc<SpecNode>> {
        self.node.as_ref()
    }

    pub fn is_executable(&self) -> bool {
        self.node.is_some()
    }
}

/// A file that faulted and from which no spec could be recovered.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{source_file}: {message}")]
pub struct DiscoveryError {
    pub source_file: String,
    pub absolute_source_file: PathBuf,
    pub message: String,
    #[serde(skip)]
    pub fault: HostFault,
}

#[derive(Debug, Default)]
pub struct DiscoveryResult {
    pub specs: Vec<DiscoveredSpec>,
    pub errors: Vec<DiscoveryError>,
}

/// Finds the specs of one project.
pub struct Discoverer<'a> {
    config: &'a ProjectConfig,
    host: &'a ScriptExecutionHost,
    cache: &'a ParseResultCache,
}

impl<'a> Discoverer<'a> {
    pub fn new(config: &'a ProjectConfig, host: &'a ScriptExecutionHost, cache: &'a ParseResultCache) -> Self {
        Self { config, host, cache }
    }

    /// Discover every candidate file under the project root.
    ///
    /// ## Errors
    /// [`SpecrunError::Io`] if the root cannot be listed, [`SpecrunError::Cancelled`] if `cancel` fires.
    #[tracing::instrument(skip_all, fields(root = %self.config.root.display()))]
    pub fn discover_all(&self, cancel: &CancellationToken) -> Result<DiscoveryResult, SpecrunError> {
        let files = candidate_files(&self.config.root, &self.config.extension)?;
        tracing::debug!(files = files.len(), "collected candidate files");

        let mut result = DiscoveryResult::default();
        for file in files {
            if cancel.is_cancelled() {
                return Err(SpecrunError::Cancelled);
            }
            match self.discover_one(&file) {
                Ok(specs) => result.specs.extend(specs),
                Err(err) => result.errors.push(err),
            }
        }
        tracing::info!(
            specs = result.specs.len(),
            errors = result.errors.len(),
            "discovery finished"
        );
        Ok(result)
    }

    /// Discover the specs of a single file.
    ///
    /// ## Errors
    /// [`DiscoveryError`] when the file faults and static recovery finds nothing.
    pub fn discover_one(&self, path: &Path) -> Result<Vec<DiscoveredSpec>, DiscoveryError> {
        let absolute = source::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let file = SpecFile::new(&self.config.root, absolute);

        match self.host.execute(&file.absolute) {
            Ok(Some(tree)) => Ok(flatten_specs(&tree)
                .iter()
                .map(|flat| DiscoveredSpec::executable(&file, flat))
                .collect()),
            Ok(None) => Ok(Vec::new()),
            Err(fault) => self.recover(&file, fault),
        }
    }

    fn recover(&self, file: &SpecFile, fault: HostFault) -> Result<Vec<DiscoveredSpec>, DiscoveryError> {
        let message = fault.to_string();
        tracing::info!(file = %file.relative, %message, "falling back to static discovery");

        let result = self.static_parse(&file.absolute);
        if result.specs.is_empty() {
            return Err(DiscoveryError {
                source_file: file.relative.clone(),
                absolute_source_file: file.absolute.clone(),
                message,
                fault,
            });
        }

        let tree = StaticTree::from_result(&result);
        Ok(flatten_specs(&tree)
            .iter()
            .map(|flat| DiscoveredSpec::with_compilation_error(file, flat, message.clone()))
            .collect())
    }

    /// Cached structural parse, computing and storing it on a miss.
    fn static_parse(&self, path: &Path) -> StaticParseResult {
        let unit = match source::resolve(path) {
            Ok(unit) => unit,
            Err(_) => return structural::parse(path),
        };
        if let Some(hit) = self.cache.try_get(&unit.root, &unit.dependencies) {
            return hit;
        }
        let result = structural::parse_unit(&unit);
        self.cache.put(&unit.root, &unit.dependencies, &result);
        result
    }
}

/// Every file under `root` with the given extension, in sorted order.
///
/// Hidden directories (which include the cache) and `target` are skipped.
pub fn candidate_files(root: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(root, extension, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if path.is_dir() {
            if !name.starts_with('.') && name != "target" {
                collect(&path, extension, files)?;
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Project {
        _dir: tempfile::TempDir,
        config: ProjectConfig,
    }

    impl Project {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = ProjectConfig::new(dir.path());
            Self { _dir: dir, config }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.config.root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, text).unwrap();
            path
        }
    }

    #[test]
    fn candidate_files_skip_hidden_and_target() {
        let project = Project::new();
        project.write("b.spec", "");
        project.write("nested/a.spec", "");
        project.write("notes.txt", "");
        project.write(".specrun/cache/x.spec", "");
        project.write("target/y.spec", "");

        let files = candidate_files(&project.config.root, "spec").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| ids::relative_source_file(&project.config.root, f))
            .collect();
        assert_eq!(names, vec!["b.spec", "nested/a.spec"]);
    }

    #[test]
    fn executable_specs_from_a_running_file() {
        let project = Project::new();
        let path = project.write(
            "specs/calc.spec",
            "context(\"Calc\") {\n  spec(\"adds\") { assert_eq(1 + 1, 2) }\n  xspec(\"later\")\n}\n",
        );
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let discoverer = Discoverer::new(&project.config, &host, &cache);

        let specs = discoverer.discover_one(&path).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].id(), "specs/calc.spec:Calc/adds");
        assert_eq!(specs[0].display_name(), "adds");
        assert!(specs[0].is_executable());
        assert!(specs[0].compilation_error().is_none());
        assert_eq!(specs[1].id(), "specs/calc.spec:Calc/later");
        assert!(specs[1].is_pending());
        assert!(specs[1].is_skipped());
    }

    #[test]
    fn broken_file_falls_back_to_static_specs() {
        let project = Project::new();
        let path = project.write(
            "broken.spec",
            "context(\"Broken\") {\n  spec(\"a\") { let = }\n  spec(\"b\") {}\n}\n",
        );
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let specs = Discoverer::new(&project.config, &host, &cache)
            .discover_one(&path)
            .unwrap();

        let ids: Vec<&str> = specs.iter().map(DiscoveredSpec::id).collect();
        assert_eq!(ids, vec!["broken.spec:Broken/a", "broken.spec:Broken/b"]);
        assert!(specs.iter().all(|s| !s.is_executable()));
        assert!(specs[0].compilation_error().unwrap().starts_with("compilation failed"));
    }

    #[test]
    fn unrecoverable_file_is_a_discovery_error() {
        let project = Project::new();
        let path = project.write("garbage.spec", "let = = =\n");
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let err = Discoverer::new(&project.config, &host, &cache)
            .discover_one(&path)
            .unwrap_err();
        assert_eq!(err.source_file, "garbage.spec");
        assert!(matches!(err.fault, HostFault::Compile { .. }));
    }

    #[test]
    fn file_without_specs_is_empty_not_an_error() {
        let project = Project::new();
        let path = project.write("helpers.spec", "fn helper() { return 1 }\n");
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let specs = Discoverer::new(&project.config, &host, &cache)
            .discover_one(&path)
            .unwrap();
        assert!(specs.is_empty());
    }

    #[test]
    fn discover_all_honours_cancellation() {
        let project = Project::new();
        project.write("a.spec", "spec(\"x\") {}\n");
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Discoverer::new(&project.config, &host, &cache)
            .discover_all(&cancel)
            .unwrap_err();
        assert!(matches!(err, SpecrunError::Cancelled));
    }

    #[test]
    fn serialized_spec_omits_the_live_node() {
        let project = Project::new();
        let path = project.write("a.spec", "spec(\"x\") {}\n");
        let host = ScriptExecutionHost::new();
        let cache = ParseResultCache::disabled();
        let specs = Discoverer::new(&project.config, &host, &cache)
            .discover_one(&path)
            .unwrap();
        let json = serde_json::to_value(&specs[0]).unwrap();
        assert_eq!(json["id"], "a.spec:/x");
        assert_eq!(json["line_number"], 1);
        assert!(json.get("node").is_none());
        assert!(json["compilation_error"].is_null());
    }
}
