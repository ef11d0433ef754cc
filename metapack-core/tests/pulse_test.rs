mod common;

use common::{graph_json, write_manifest};
use metapack_core::graph::ProjectGraph;
use metapack_core::manifest::DependencyKind;
use metapack_core::pulse::{write_pulse, DependencyDiagram, PulseConfig, PulseRenderer};
use metapack_core::Error;
use serde_json::json;
use tempfile::TempDir;

fn row<'a>(document: &'a str, path: &str) -> &'a str {
    let needle = format!("| [{}](", path);
    document
        .lines()
        .find(|line| line.starts_with(&needle))
        .unwrap_or_else(|| panic!("no row for {}", path))
}

fn sample_workspace() -> (TempDir, ProjectGraph) {
    let temp_dir = TempDir::new().unwrap();
    let ws = temp_dir.path();
    write_manifest(
        &ws.join("packages/cli"),
        json!({
            "name": "@diplodoc/cli",
            "dependencies": { "@diplodoc/transform": "^4.0.0", "lodash": "^4.17.0" },
            "devDependencies": { "@diplodoc/lint": "^1.0.0" }
        }),
    );
    write_manifest(
        &ws.join("packages/transform"),
        json!({
            "name": "@diplodoc/transform",
            "devDependencies": { "@diplodoc/utils": "^2.0.0" }
        }),
    );
    write_manifest(&ws.join("packages/utils"), json!({ "name": "@diplodoc/utils" }));
    write_manifest(&ws.join("devops/lint"), json!({ "name": "@diplodoc/lint" }));
    write_manifest(
        &ws.join("extensions/cut/example"),
        json!({ "name": "@diplodoc/cut-example" }),
    );

    let graph = ProjectGraph::parse(&graph_json(
        &[
            ("@diplodoc/cli", "packages/cli"),
            ("@diplodoc/transform", "packages/transform"),
            ("@diplodoc/utils", "packages/utils"),
            ("@diplodoc/lint", "devops/lint"),
            ("@diplodoc/cut-example", "extensions/cut/example"),
        ],
        &[
            ("@diplodoc/cli", "@diplodoc/transform"),
            ("@diplodoc/cli", "@diplodoc/lint"),
            ("@diplodoc/cli", "npm:lodash"),
            ("@diplodoc/transform", "@diplodoc/utils"),
            ("@diplodoc/cut-example", "@diplodoc/transform"),
        ],
    ))
    .unwrap();

    (temp_dir, graph)
}

#[test]
fn test_tables_follow_section_columns() {
    let config = PulseConfig::default();
    let document = PulseRenderer::new(&config, "@diplodoc").render(None);

    assert!(document.starts_with("# Pulse — status of submodules (master)\n"));
    assert!(document.contains(
        "## packages\n\n| Submodule | version | tests | release | security | coverage | infra |\n\
         |-----------|:-------:|:-------:|:-------:|:-------:|:-------:|:-------:|\n"
    ));
    assert!(document.contains(
        "## actions\n\n| Submodule | version | release | security |\n|-----------|:-------:|:-------:|:-------:|\n"
    ));
    assert!(!document.contains("```mermaid"));
    assert!(document.ends_with("|\n"));
}

#[test]
fn test_row_badges() {
    let config = PulseConfig::default();
    let document = PulseRenderer::new(&config, "@diplodoc").render(None);

    let cli = row(&document, "packages/cli");
    assert!(cli.starts_with("| [packages/cli](https://github.com/diplodoc-platform/cli) | "));
    assert!(cli.contains(
        "[![version](https://img.shields.io/npm/v/@diplodoc/cli)](https://github.com/diplodoc-platform/cli/releases)"
    ));
    assert!(cli.contains(
        "[![tests](https://github.com/diplodoc-platform/cli/actions/workflows/tests.yml/badge.svg?branch=master)]"
    ));
    assert!(cli.contains(
        "[![release](https://github.com/diplodoc-platform/cli/actions/workflows/release.yml/badge.svg)]"
    ));
    assert!(cli.contains("sonarcloud.io/api/project_badges/measure?project=diplodoc-platform_cli&metric=coverage"));
    assert!(cli.contains(
        "url=https%3A%2F%2Fraw.githubusercontent.com%2Fdiplodoc-platform%2Fcli%2Fmaster%2Fpackage-lock.json"
    ));
    assert!(cli.contains("&label=infra&prefix=v"));

    let client = row(&document, "packages/client");
    let cells: Vec<&str> = client.split(" | ").collect();
    assert_eq!(cells[5], "-");

    let template = row(&document, "devops/package-template");
    assert_eq!(template.matches(" - |").count(), 3);

    let action = row(&document, "actions/docs-build");
    assert!(action.contains("https://img.shields.io/github/v/release/diplodoc-platform/docs-build-action"));
}

#[test]
fn test_diagram_keeps_namespace_edges_only() {
    let (temp_dir, graph) = sample_workspace();
    let config = PulseConfig::default();

    let diagram = DependencyDiagram::build(&graph, temp_dir.path(), &config, "@diplodoc");
    assert_eq!(diagram.node_count(), 3);

    let mermaid = diagram.render(&config, "@diplodoc");
    assert!(mermaid.starts_with("## Dependency graph (@diplodoc packages)\n"));
    assert!(mermaid.contains("```mermaid\n%%{ init:"));
    assert!(mermaid.contains("flowchart LR\n  cli[\"cli\"]\n  transform[\"transform\"]\n  utils[\"utils\"]\n"));
    assert!(mermaid.contains("  cli --> transform\n"));
    assert!(mermaid.contains("  transform -.-> utils\n"));
    assert!(mermaid.contains("  click cli href \"https://github.com/diplodoc-platform/cli\"\n"));
    assert!(!mermaid.contains("lint"));
    assert!(!mermaid.contains("example"));
    assert!(!mermaid.contains("lodash"));
}

#[test]
fn test_diagram_quotes_unusual_ids() {
    let config = PulseConfig::default();
    let diagram = DependencyDiagram::from_edges(vec![(
        "page.constructor".to_string(),
        "utils".to_string(),
        DependencyKind::Runtime,
    )]);

    let mermaid = diagram.render(&config, "@diplodoc");
    assert!(mermaid.contains("  \"page.constructor\"[\"page.constructor\"]\n"));
}

#[test]
fn test_empty_diagram_is_left_out() {
    let config = PulseConfig::default();
    let diagram = DependencyDiagram::from_edges(Vec::new());
    assert!(diagram.is_empty());

    let document = PulseRenderer::new(&config, "@diplodoc").render(Some(&diagram));
    assert!(!document.contains("Dependency graph"));
}

#[test]
fn test_write_pulse_overwrites_output() {
    let (temp_dir, graph) = sample_workspace();
    let config = PulseConfig::default();
    std::fs::write(temp_dir.path().join("PULSE.md"), "stale").unwrap();

    let diagram = DependencyDiagram::build(&graph, temp_dir.path(), &config, "@diplodoc");
    let path = write_pulse(temp_dir.path(), &config, "@diplodoc", Some(&diagram)).unwrap();

    let written = std::fs::read_to_string(path).unwrap();
    assert!(!written.contains("stale"));
    assert!(written.contains("\n\n---\n\n## Dependency graph"));
    assert!(written.ends_with("```\n\n"));
}

#[test]
fn test_write_pulse_needs_sections() {
    let temp_dir = TempDir::new().unwrap();
    let config = PulseConfig {
        sections: Default::default(),
        ..PulseConfig::default()
    };

    assert!(matches!(
        write_pulse(temp_dir.path(), &config, "@diplodoc", None),
        Err(Error::Config(_))
    ));
}
