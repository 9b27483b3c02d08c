//! Layering guardrails for the workspace crates.
//!
//! `cellbook_core` is pure vocabulary and must stay dependency-free. `cellbook_syntax` is the frontend only: it may
//! use `cellbook_core` and the diagnostics stack, but never the runtime's crates (RNG, serialization, collections)
//! and never the root `cellbook` crate.

/// Crate names listed in the `[dependencies]` table of a manifest.
fn main_dependencies(manifest: &str) -> Vec<String> {
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

        // Strip inline comments for robustness.
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some((name, _)) = line_no_comment.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_has_no_dependencies() {
    let deps = main_dependencies(include_str!("../crates/cellbook_core/Cargo.toml"));
    assert!(deps.is_empty(), "cellbook_core must not depend on anything, found {deps:?}");
}

#[test]
fn syntax_does_not_depend_on_the_runtime() {
    let deps = main_dependencies(include_str!("../crates/cellbook_syntax/Cargo.toml"));
    for forbidden in ["cellbook", "rand", "serde", "serde_json", "indexmap", "clap"] {
        assert!(
            !deps.iter().any(|d| d == forbidden),
            "`{forbidden}` must not appear in cellbook_syntax [dependencies]"
        );
    }
    assert!(deps.iter().any(|d| d == "cellbook_core"));
}

#[test]
fn root_depends_on_both_workspace_crates() {
    let deps = main_dependencies(include_str!("../Cargo.toml"));
    for required in ["cellbook_core", "cellbook_syntax"] {
        assert!(deps.iter().any(|d| d == required), "root crate must depend on `{required}`");
    }
}
