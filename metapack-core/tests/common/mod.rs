#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use metapack_core::error::Result;
use metapack_core::shell::{CommandOutput, CommandRunner, CommandSpec};

/// Records every command and answers the ones the tools care about.
///
/// A `--file=<path>` argument gets the configured graph document written to
/// it; `git status` answers with the configured porcelain output.
#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<CommandSpec>>,
    graph: Option<String>,
    git_status: String,
    fail_on: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn with_git_status(mut self, status: &str) -> Self {
        self.git_status = status.to_string();
        self
    }

    /// Fails every command whose line contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());

        if let Some(needle) = &self.fail_on {
            if spec.to_string().contains(needle.as_str()) {
                return Ok(CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: String::new(),
                    stderr: format!("{} exploded", spec.program),
                });
            }
        }

        if let Some(file) = spec.args.iter().find_map(|a| a.strip_prefix("--file=")) {
            if let Some(graph) = &self.graph {
                fs::write(file, graph)?;
            }
            return Ok(CommandOutput::ok(""));
        }

        if spec.program == "git" && spec.args.first().map(String::as_str) == Some("status") {
            return Ok(CommandOutput::ok(self.git_status.clone()));
        }

        Ok(CommandOutput::ok(""))
    }
}

pub fn write_manifest(dir: &Path, manifest: serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("package.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
}

/// A graph document with `(id, root)` nodes and `(source, target)` edges.
pub fn graph_json(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> String {
    let nodes: serde_json::Map<String, serde_json::Value> = nodes
        .iter()
        .map(|(id, root)| {
            (
                id.to_string(),
                serde_json::json!({ "name": id, "type": "lib", "data": { "root": root } }),
            )
        })
        .collect();

    let mut dependencies = serde_json::Map::new();
    for (source, target) in edges {
        dependencies
            .entry(source.to_string())
            .or_insert_with(|| serde_json::json!([]))
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "source": source, "target": target, "type": "static" }));
    }

    serde_json::json!({ "graph": { "nodes": nodes, "dependencies": dependencies } }).to_string()
}
