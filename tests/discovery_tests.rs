//! Discovery through the public API: dynamic discovery, static fallback and the parse cache.

use std::fs;
use std::path::{Path, PathBuf};

use specrun::discovery::Discoverer;
use specrun::structural::{self, StaticParseResult, StaticSpec, StaticSpecKind};
use specrun::{CancellationToken, ParseResultCache, ProjectConfig, ScriptExecutionHost, source};

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

    fn cache(&self) -> ParseResultCache {
        self.config.cache()
    }

    fn cache_files(&self) -> usize {
        fs::read_dir(&self.config.cache_dir).map(|d| d.count()).unwrap_or(0)
    }
}

fn ids_of(path: &Path, project: &Project, cache: &ParseResultCache) -> Vec<String> {
    let host = ScriptExecutionHost::new();
    Discoverer::new(&project.config, &host, cache)
        .discover_one(path)
        .unwrap()
        .iter()
        .map(|s| s.id().to_string())
        .collect()
}

#[test]
fn single_context_single_spec() {
    let project = Project::new();
    let path = project.write("foo.spec", "context(\"Foo\"){ spec(\"works\"){} }");
    let host = ScriptExecutionHost::new();
    let cache = project.cache();

    let specs = Discoverer::new(&project.config, &host, &cache)
        .discover_one(&path)
        .unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].id(), "foo.spec:Foo/works");
    assert_eq!(specs[0].context_path(), ["Foo".to_string()]);
    assert!(specs[0].is_executable());
}

#[test]
fn nested_ids_in_declaration_order() {
    let project = Project::new();
    let path = project.write(
        "specs/account.spec",
        r#"
describe("Account") {
  it("opens")
  context("when overdrawn") {
    tag("billing") {
      spec("charges a fee") {}
    }
    xit("notifies") {}
  }
  fcontext("Focus") { spec("only this") {} }
}
spec("top level") {}
"#,
    );

    let ids = ids_of(&path, &project, &project.cache());
    insta::assert_debug_snapshot!(ids, @r#"
    [
        "specs/account.spec:Account/opens",
        "specs/account.spec:Account/when overdrawn/charges a fee",
        "specs/account.spec:Account/when overdrawn/notifies",
        "specs/account.spec:Account/Focus/only this",
        "specs/account.spec:/top level",
    ]
    "#);
}

#[test]
fn uncompilable_file_yields_statically_classified_spec() {
    let project = Project::new();
    let path = project.write("broken.spec", "context(\"C\") {\n  xspec(\"only\") { let = }\n}\n");
    let host = ScriptExecutionHost::new();
    let cache = project.cache();

    let specs = Discoverer::new(&project.config, &host, &cache)
        .discover_one(&path)
        .unwrap();
    assert_eq!(specs.len(), 1);
    let spec = &specs[0];
    assert_eq!(spec.id(), "broken.spec:C/only");
    assert!(spec.compilation_error().is_some());
    assert!(!spec.is_executable());
    assert!(spec.is_skipped());
    assert!(!spec.is_focused());
    assert!(!spec.is_pending());
    assert_eq!(spec.line_number(), 2);
}

#[test]
fn computed_description_is_reported_and_omitted() {
    let project = Project::new();
    let path = project.write(
        "computed.spec",
        "let name = \"dyn\"\ncontext(\"Static\") {\n  spec(name + \"amic\") {}\n  spec(\"literal\") {}\n}\n",
    );

    let result = structural::parse(&path);
    assert!(!result.is_complete);
    assert!(!result.warnings.is_empty());
    let descriptions: Vec<&str> = result.specs.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(descriptions, vec!["literal"]);
}

#[test]
fn static_results_are_cached_and_reused() {
    let project = Project::new();
    let path = project.write("broken.spec", "context(\"C\") {\n  spec(\"a\") { missing_fn() }\n}\n");
    let cache = project.cache();

    let cold = ids_of(&path, &project, &cache);
    assert_eq!(cold, vec!["broken.spec:C/a"]);
    assert_eq!(project.cache_files(), 2);

    let warm = ids_of(&path, &project, &cache);
    assert_eq!(cold, warm);
    assert_eq!(project.cache_files(), 2);
}

#[test]
fn cache_is_consulted_before_the_structural_walk() {
    let project = Project::new();
    let path = project.write("broken.spec", "spec(\"real\") { missing_fn() }\n");
    let cache = project.cache();
    let unit = source::resolve(&path).unwrap();

    let planted = StaticParseResult {
        specs: vec![StaticSpec {
            description: "from cache".into(),
            context_path: vec![],
            line: 1,
            kind: StaticSpecKind::Focused,
            pending: true,
        }],
        warnings: vec![],
        is_complete: true,
    };
    cache.put(&unit.root, &unit.dependencies, &planted);

    let host = ScriptExecutionHost::new();
    let specs = Discoverer::new(&project.config, &host, &cache)
        .discover_one(&path)
        .unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].id(), "broken.spec:/from cache");
    assert!(specs[0].is_focused());
    assert!(specs[0].is_pending());
}

#[test]
fn changing_an_included_file_invalidates_the_entry() {
    let project = Project::new();
    project.write("helpers.spec", "fn helper() { return 1 }\n");
    let path = project.write(
        "main.spec",
        "#load \"helpers.spec\"\ncontext(\"Main\") {\n  spec(\"a\") { missing_fn() }\n}\n",
    );
    let cache = project.cache();

    ids_of(&path, &project, &cache);
    let before = source::resolve(&path).unwrap();
    assert_eq!(before.dependencies.len(), 2);
    assert!(cache.try_get(&before.root, &before.dependencies).is_some());

    // One byte in the dependency changes.
    project.write("helpers.spec", "fn helper() { return 2 }\n");
    let after = source::resolve(&path).unwrap();
    assert!(cache.try_get(&after.root, &after.dependencies).is_none());

    ids_of(&path, &project, &cache);
    assert!(cache.try_get(&after.root, &after.dependencies).is_some());
}

#[test]
fn disabled_cache_writes_nothing() {
    let project = Project::new();
    let path = project.write("broken.spec", "spec(\"a\") { missing_fn() }\n");
    ids_of(&path, &project, &ParseResultCache::disabled());
    assert_eq!(project.cache_files(), 0);
}

#[test]
fn discover_all_collects_specs_and_errors() {
    let project = Project::new();
    project.write("a.spec", "spec(\"one\") {}\n");
    project.write("b/broken.spec", "spec(\"two\") { let = }\n");
    project.write("c.spec", "let = = =\n");
    project.write("ignored.txt", "spec(\"nope\") {}\n");

    let host = ScriptExecutionHost::new();
    let cache = project.cache();
    let result = Discoverer::new(&project.config, &host, &cache)
        .discover_all(&CancellationToken::new())
        .unwrap();

    let ids: Vec<&str> = result.specs.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["a.spec:/one", "b/broken.spec:/two"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_file, "c.spec");
}

#[test]
fn discover_all_is_identical_cold_and_warm() {
    let project = Project::new();
    project.write("a.spec", "context(\"A\") {\n  spec(\"one\") {}\n  xspec(\"two\")\n}\n");
    project.write("b/broken.spec", "context(\"B\") {\n  fit(\"three\") { missing_fn() }\n  spec(\"four\")\n}\n");
    project.write("c.spec", "let = = =\n");
    let cache = project.cache();

    let discover = || {
        let host = ScriptExecutionHost::new();
        let result = Discoverer::new(&project.config, &host, &cache)
            .discover_all(&CancellationToken::new())
            .unwrap();
        (
            serde_json::to_value(&result.specs).unwrap(),
            serde_json::to_value(&result.errors).unwrap(),
        )
    };

    let cold = discover();
    let entries = project.cache_files();
    assert!(entries >= 2);

    let warm = discover();
    assert_eq!(cold, warm);
    assert_eq!(project.cache_files(), entries);

    let ids: Vec<&str> = cold.0.as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        vec!["a.spec:A/one", "a.spec:A/two", "b/broken.spec:B/three", "b/broken.spec:B/four"]
    );
    assert_eq!(cold.1.as_array().unwrap().len(), 1);
}

#[test]
fn self_containing_list_does_not_abort_discovery() {
    let project = Project::new();
    project.write("a.spec", "spec(\"one\") {}\n");
    project.write(
        "b.spec",
        "let xs = []\npush(xs, xs)\nspec(str(xs)) { assert_eq(xs, xs) }\n",
    );

    let host = ScriptExecutionHost::new();
    let cache = project.cache();
    let result = Discoverer::new(&project.config, &host, &cache)
        .discover_all(&CancellationToken::new())
        .unwrap();

    let ids: Vec<&str> = result.specs.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["a.spec:/one", "b.spec:/[[...]]"]);
    assert!(result.errors.is_empty());
}

#[test]
fn deeply_nested_file_is_a_discovery_error() {
    let project = Project::new();
    project.write("a.spec", "spec(\"one\") {}\n");
    project.write(
        "deep.spec",
        &format!("let x = {}1{}\n", "(".repeat(2_000), ")".repeat(2_000)),
    );

    let host = ScriptExecutionHost::new();
    let cache = project.cache();
    let result = Discoverer::new(&project.config, &host, &cache)
        .discover_all(&CancellationToken::new())
        .unwrap();

    let ids: Vec<&str> = result.specs.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["a.spec:/one"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_file, "deep.spec");
    assert!(result.errors[0].message.contains("nested too deeply"), "{}", result.errors[0].message);
}

#[test]
fn nil_body_is_pending_on_both_paths() {
    let project = Project::new();
    let live = project.write("live.spec", "spec(\"later\", nil)\n");
    let fallback = project.write("fallback.spec", "spec(\"later\", nil)\nmissing_fn()\n");
    let cache = project.cache();

    let host = ScriptExecutionHost::new();
    let discoverer = Discoverer::new(&project.config, &host, &cache);
    let live = discoverer.discover_one(&live).unwrap();
    let fallback = discoverer.discover_one(&fallback).unwrap();

    assert!(live[0].is_executable());
    assert!(!fallback[0].is_executable());
    assert!(live[0].is_pending());
    assert!(fallback[0].is_pending());
}
