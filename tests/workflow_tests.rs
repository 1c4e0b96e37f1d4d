//! End-to-end workflows: execution by id, compiled-artifact reuse, and the orchestrator.

use std::fs;
use std::path::PathBuf;

use specrun::{
    CancellationToken, CollectingSink, Executor, Orchestrator, ProjectConfig, ScriptExecutionHost, SinkNode,
    SpecStatus,
};

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
        fs::write(&path, text).unwrap();
        path
    }
}

/// `(kind, id, status, display name)` per node.
fn describe(nodes: &[SinkNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node {
            SinkNode::Spec(spec) => format!("spec {}", spec.id()),
            SinkNode::DiscoveryError(err) => format!("error {}", err.source_file),
            SinkNode::Result { result, .. } => {
                format!("{:?} {} [{}]", result.status, result.id, result.display_name)
            }
        })
        .collect()
}

#[test]
fn deleted_file_group_is_omitted() {
    let project = Project::new();
    project.write("keep.spec", "spec(\"stays\") {}\n");
    let doomed = project.write("doomed.spec", "spec(\"goes\") {}\n");
    fs::remove_file(doomed).unwrap();

    let host = ScriptExecutionHost::new();
    let ids = vec!["doomed.spec:/goes".to_string(), "keep.spec:/stays".to_string()];
    let results = Executor::new(&project.config.root, &host)
        .execute_by_ids(&ids, &CancellationToken::new())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_file, "keep.spec");
    assert_eq!(results[0].results[0].status, SpecStatus::Passed);
}

#[test]
fn repeated_execution_reuses_the_compiled_artifact() {
    let project = Project::new();
    let path = project.write("a.spec", "context(\"A\") { spec(\"x\") {} }\n");

    let host = ScriptExecutionHost::new();
    assert!(host.execute(&path).unwrap().is_some());
    assert!(host.execute(&path).unwrap().is_some());
    assert_eq!(host.compilation_count(), 1);
}

#[test]
fn discover_then_run_compiles_each_file_once() {
    let project = Project::new();
    project.write("a.spec", "spec(\"one\") {}\n");
    project.write("b.spec", "spec(\"two\") {}\n");

    let orchestrator = Orchestrator::new(project.config.clone());
    let cancel = CancellationToken::new();
    orchestrator.discover(&mut CollectingSink::default(), &cancel).unwrap();
    orchestrator.run(None, &mut CollectingSink::default(), &cancel).unwrap();
    assert_eq!(orchestrator.host().compilation_count(), 2);
}

fn mixed_project() -> Project {
    let project = Project::new();
    project.write(
        "calc.spec",
        "context(\"Calc\") {\n  spec(\"adds\") { assert_eq(2 + 2, 4) }\n  spec(\"fails\") { fail(\"nope\") }\n  spec(\"todo\")\n}\n",
    );
    project.write("broken.spec", "context(\"Broken\") {\n  spec(\"uncompiled\") { let = }\n}\n");
    project.write("garbage.spec", "let = = =\n");
    project
}

#[test]
fn discover_publishes_specs_and_errors() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let mut sink = CollectingSink::default();
    let discovery = orchestrator.discover(&mut sink, &CancellationToken::new()).unwrap();

    assert_eq!(discovery.specs.len(), 4);
    insta::assert_debug_snapshot!(describe(&sink.nodes), @r#"
    [
        "spec broken.spec:Broken/uncompiled",
        "spec calc.spec:Calc/adds",
        "spec calc.spec:Calc/fails",
        "spec calc.spec:Calc/todo",
        "error garbage.spec",
    ]
    "#);
}

#[test]
fn run_all_publishes_every_outcome() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let mut sink = CollectingSink::default();
    let summary = orchestrator.run(None, &mut sink, &CancellationToken::new()).unwrap();

    insta::assert_debug_snapshot!(describe(&sink.nodes), @r#"
    [
        "error garbage.spec",
        "Failed broken.spec:Broken/uncompiled [uncompiled]",
        "Passed calc.spec:Calc/adds [adds]",
        "Failed calc.spec:Calc/fails [fails]",
        "Pending calc.spec:Calc/todo [todo]",
    ]
    "#);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.errors, 1);
    assert!(!summary.is_success());
}

#[test]
fn run_by_id_publishes_only_what_was_requested() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let mut sink = CollectingSink::default();
    let ids = vec![
        "calc.spec:Calc/adds".to_string(),
        "broken.spec:Broken/uncompiled".to_string(),
        "calc.spec:Calc/does not exist".to_string(),
    ];
    let summary = orchestrator
        .run(Some(ids.as_slice()), &mut sink, &CancellationToken::new())
        .unwrap();

    insta::assert_debug_snapshot!(describe(&sink.nodes), @r#"
    [
        "Failed broken.spec:Broken/uncompiled [Broken > uncompiled]",
        "Passed calc.spec:Calc/adds [Calc > adds]",
    ]
    "#);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.errors, 0);

    if let SinkNode::Result { result, .. } = &sink.nodes[0] {
        assert!(result.message.as_deref().unwrap().starts_with("compilation failed"));
    } else {
        panic!("expected a result node");
    }
}

#[test]
fn run_by_id_in_an_undiscoverable_file_reports_its_error() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let mut sink = CollectingSink::default();
    let ids = vec![
        "garbage.spec:G/x".to_string(),
        "garbage.spec:G/y".to_string(),
        "calc.spec:Calc/adds".to_string(),
    ];
    let summary = orchestrator
        .run(Some(ids.as_slice()), &mut sink, &CancellationToken::new())
        .unwrap();

    insta::assert_debug_snapshot!(describe(&sink.nodes), @r#"
    [
        "error garbage.spec",
        "Passed calc.spec:Calc/adds [Calc > adds]",
    ]
    "#);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.passed, 1);
    assert!(!summary.is_success());
}

#[test]
fn sink_nodes_serialize_with_a_kind_tag() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let mut sink = CollectingSink::default();
    orchestrator.discover(&mut sink, &CancellationToken::new()).unwrap();

    let first = serde_json::to_value(&sink.nodes[0]).unwrap();
    assert_eq!(first["kind"], "spec");
    assert_eq!(first["source_file"], "broken.spec");
    assert!(first["compilation_error"].is_string());

    let last = serde_json::to_value(sink.nodes.last().unwrap()).unwrap();
    assert_eq!(last["kind"], "discovery_error");
    assert_eq!(last["source_file"], "garbage.spec");
}

#[test]
fn cancelled_run_stops() {
    let project = mixed_project();
    let orchestrator = Orchestrator::new(project.config.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = orchestrator
        .run(None, &mut CollectingSink::default(), &cancel)
        .unwrap_err();
    assert!(matches!(err, specrun::SpecrunError::Cancelled));
}
