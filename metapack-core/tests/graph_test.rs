mod common;

use common::{graph_json, FakeRunner};
use metapack_core::graph::{GraphReader, ProjectGraph, ProjectRoot};
use metapack_core::Error;
use tempfile::TempDir;

#[test]
fn test_parse_edges_keyed_by_source() {
    let graph = ProjectGraph::parse(&graph_json(
        &[("cli", "packages/cli"), ("transform", "packages/transform")],
        &[("cli", "transform")],
    ))
    .unwrap();

    assert_eq!(
        graph.roots(),
        vec![
            ProjectRoot::new("packages/cli"),
            ProjectRoot::new("packages/transform")
        ]
    );
    let edges = graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source, "cli");
    assert_eq!(edges[0].target, "transform");
}

#[test]
fn test_parse_flat_edge_list_and_rootless_nodes() {
    let document = r#"{
        "graph": {
            "nodes": {
                "cli": { "data": { "root": "packages/cli" } },
                "npm:lodash": { "data": {} }
            },
            "dependencies": [
                { "source": "cli", "target": "npm:lodash" }
            ]
        }
    }"#;
    let graph = ProjectGraph::parse(document).unwrap();

    assert_eq!(graph.roots(), vec![ProjectRoot::new("packages/cli")]);
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn test_parse_rejects_documents_without_graph() {
    assert!(matches!(
        ProjectGraph::parse(r#"{"nodes": {}}"#),
        Err(Error::Json { .. })
    ));
    assert!(ProjectGraph::parse("not json").is_err());
}

#[test]
fn test_reader_passes_temp_file_and_cleans_up() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new().with_graph(graph_json(&[("a", "packages/a")], &[]));

    let reader = GraphReader::from_command_line("npx nx graph", temp_dir.path()).unwrap();
    let roots = reader.list_project_roots(&runner).unwrap();
    assert_eq!(roots, vec![ProjectRoot::new("packages/a")]);

    let call = &runner.calls()[0];
    assert_eq!(call.program, "npx");
    assert_eq!(&call.args[..2], &["nx", "graph"]);
    let file = call.args[2].strip_prefix("--file=").unwrap();
    assert!(file.ends_with(".json"));
    assert!(file.starts_with(temp_dir.path().to_str().unwrap()));
    assert_eq!(call.cwd.as_deref(), Some(temp_dir.path()));

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_reader_fails_when_tool_fails() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new().failing_on("nx graph");

    let reader = GraphReader::from_command_line("npx nx graph", temp_dir.path()).unwrap();
    let result = reader.list_project_roots(&runner);

    match result {
        Err(Error::GraphQuery(message)) => assert!(message.contains("npx exploded")),
        other => panic!("expected GraphQuery, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_reader_fails_on_malformed_output() {
    let temp_dir = TempDir::new().unwrap();
    let runner = FakeRunner::new().with_graph("{\"graph\": ");

    let reader = GraphReader::from_command_line("npx nx graph", temp_dir.path()).unwrap();
    assert!(matches!(
        reader.query(&runner),
        Err(Error::GraphQuery(message)) if message.contains("project graph")
    ));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_reader_fails_on_empty_output() {
    let temp_dir = TempDir::new().unwrap();
    // No graph configured: the tool "succeeds" but writes nothing.
    let runner = FakeRunner::new();

    let reader = GraphReader::from_command_line("npx nx graph", temp_dir.path()).unwrap();
    assert!(matches!(
        reader.query(&runner),
        Err(Error::GraphQuery(_))
    ));
}

#[test]
fn test_project_root_resolves_inside_workspace() {
    let root = ProjectRoot::new("extensions/cut");
    assert_eq!(
        root.resolve(std::path::Path::new("/ws")),
        std::path::PathBuf::from("/ws/extensions/cut")
    );
    assert_eq!(root.to_string(), "extensions/cut");
}
