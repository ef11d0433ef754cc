//! Project graph reader backed by the external build-graph tool.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::shell::{CommandRunner, CommandSpec};

/// Root directory of one sub-project, relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Absolute (or cwd-relative) location of this root inside `workspace`.
    pub fn resolve(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.0)
    }
}

impl fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Deserialize)]
struct GraphDocument {
    graph: ProjectGraph,
}

/// The `graph` object of the graph tool's output document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectGraph {
    #[serde(default)]
    pub nodes: IndexMap<String, GraphNode>,
    #[serde(default)]
    dependencies: Dependencies,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphNode {
    #[serde(default)]
    pub data: NodeData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub root: Option<String>,
}

/// A dependency edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Edges come either as a flat list or keyed by source project.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Dependencies {
    List(Vec<Edge>),
    BySource(IndexMap<String, Vec<Edge>>),
}

impl Default for Dependencies {
    fn default() -> Self {
        Dependencies::List(Vec::new())
    }
}

impl ProjectGraph {
    /// Parses a full graph document (`{"graph": {...}}`).
    pub fn parse(content: &str) -> Result<Self> {
        let document: GraphDocument =
            serde_json::from_str(content).map_err(|e| Error::json(e, "project graph"))?;
        Ok(document.graph)
    }

    /// Root of every node that declares one, in document order.
    pub fn roots(&self) -> Vec<ProjectRoot> {
        self.nodes
            .values()
            .filter_map(|node| node.data.root.as_deref())
            .map(ProjectRoot::new)
            .collect()
    }

    /// All edges, flattened when they are keyed by source.
    pub fn edges(&self) -> Vec<&Edge> {
        match &self.dependencies {
            Dependencies::List(edges) => edges.iter().collect(),
            Dependencies::BySource(map) => map.values().flatten().collect(),
        }
    }
}

/// Runs the graph tool and reads its output back from a temporary file.
pub struct GraphReader {
    command: CommandSpec,
    workspace_dir: PathBuf,
}

impl GraphReader {
    pub fn new(command: CommandSpec, workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workspace_dir: workspace_dir.into(),
        }
    }

    pub fn from_command_line(command: &str, workspace_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(CommandSpec::parse(command)?, workspace_dir))
    }

    /// Queries the full project graph.
    ///
    /// # Errors
    ///
    /// Every failure is an [`Error::GraphQuery`] carrying the underlying
    /// message, including the tool's captured output when it exits non-zero.
    pub fn query<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<ProjectGraph> {
        // Removed on drop, whether or not the query succeeds.
        let file = tempfile::Builder::new()
            .prefix("graph-")
            .suffix(".json")
            .tempfile_in(&self.workspace_dir)?;

        let spec = self
            .command
            .clone()
            .arg(format!("--file={}", file.path().display()))
            .current_dir(&self.workspace_dir);
        runner
            .run_checked(&spec)
            .map_err(|e| Error::GraphQuery(e.to_string()))?;

        let content = std::fs::read_to_string(file.path())?;
        if content.trim().is_empty() {
            return Err(Error::GraphQuery(format!("`{}` wrote an empty graph", spec)));
        }

        let graph = ProjectGraph::parse(&content).map_err(|e| Error::GraphQuery(e.to_string()))?;
        debug!(nodes = graph.nodes.len(), edges = graph.edges().len(), "project graph loaded");
        Ok(graph)
    }

    /// Lists the root directory of every sub-project.
    pub fn list_project_roots<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
    ) -> Result<Vec<ProjectRoot>> {
        let roots = self.query(runner)?.roots();
        info!(count = roots.len(), "found project roots");
        Ok(roots)
    }
}
