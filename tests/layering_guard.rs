//! Layering guardrails for the workspace crates.
//!
//! `specrun_core` is a pure vocabulary crate and `specrun_syntax` a pure frontend: neither may depend on the root
//! `specrun` crate, and the core must stay free of third-party dependencies.

fn dependency_names(manifest: &str) -> Vec<String> {
    let mut in_dependencies = false;
    let mut names = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, _)) = line.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_has_no_dependencies() {
    let deps = dependency_names(include_str!("../crates/specrun_core/Cargo.toml"));
    assert!(deps.is_empty(), "specrun_core must not have dependencies, found {:?}", deps);
}

#[test]
fn syntax_depends_only_on_core_and_ambient_crates() {
    let deps = dependency_names(include_str!("../crates/specrun_syntax/Cargo.toml"));
    assert!(deps.iter().all(|d| d != "specrun"), "specrun_syntax must not depend on the root crate");
    assert!(deps.iter().any(|d| d == "specrun_core"));
}

#[test]
fn root_depends_on_both_workspace_crates() {
    let deps = dependency_names(include_str!("../Cargo.toml"));
    assert!(deps.iter().any(|d| d == "specrun_core"));
    assert!(deps.iter().any(|d| d == "specrun_syntax"));
}
