//! Status dashboard: per-submodule badge tables plus a mermaid dependency graph.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::ProjectGraph;
use crate::manifest::{DependencyKind, PackageManifest};

/// Cell value that suppresses a badge.
const DASH: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Version,
    Tests,
    Release,
    Security,
    Coverage,
    Infra,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Version => "version",
            Column::Tests => "tests",
            Column::Release => "release",
            Column::Security => "security",
            Column::Coverage => "coverage",
            Column::Infra => "infra",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionBadge {
    Npm,
    GithubRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    Sonar,
}

/// One downstream repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub path: String,
    pub repo: String,
    #[serde(default)]
    pub npm: Option<String>,
    #[serde(default)]
    pub coverage: Option<Coverage>,
    /// Columns rendered as `-` for this row.
    #[serde(default)]
    pub skip: Vec<Column>,
}

impl Row {
    fn new(path: &str, repo: &str) -> Self {
        Self {
            path: path.to_string(),
            repo: repo.to_string(),
            npm: None,
            coverage: None,
            skip: Vec::new(),
        }
    }

    fn npm(path: &str, repo: &str, npm: &str) -> Self {
        Self {
            npm: Some(npm.to_string()),
            ..Self::new(path, repo)
        }
    }

    fn sonar(mut self) -> Self {
        self.coverage = Some(Coverage::Sonar);
        self
    }

    fn skip(mut self, columns: &[Column]) -> Self {
        self.skip.extend_from_slice(columns);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub columns: Vec<Column>,
    pub version_badge: VersionBadge,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// GitHub organization hosting every repository.
    pub org: String,
    pub branch: String,
    /// Output file, relative to the workspace root.
    pub output: String,
    /// Package whose lockfile version the `infra` column reports.
    pub lint_package: String,
    /// Short ids left out of the dependency graph.
    pub hidden: Vec<String>,
    /// Leave `*-example` packages out of the dependency graph.
    pub hide_examples: bool,
    pub sections: IndexMap<String, Section>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            org: "diplodoc-platform".to_string(),
            branch: "master".to_string(),
            output: "PULSE.md".to_string(),
            lint_package: "@diplodoc/lint".to_string(),
            hidden: vec!["lint".to_string(), "tsconfig".to_string()],
            hide_examples: true,
            sections: default_sections(),
        }
    }
}

fn default_sections() -> IndexMap<String, Section> {
    use Column::*;

    let full = vec![Version, Tests, Release, Security, Coverage, Infra];
    let packages = [
        "cli",
        "client",
        "components",
        "directive",
        "liquid",
        "sentenizer",
        "transform",
        "translation",
        "utils",
        "yfmlint",
    ]
    .iter()
    .map(|name| {
        let row = Row::npm(
            &format!("packages/{}", name),
            name,
            &format!("@diplodoc/{}", name),
        );
        // client and components have no coverage reporting yet.
        if matches!(*name, "client" | "components") {
            row
        } else {
            row.sonar()
        }
    })
    .collect();

    let extensions = [
        "algolia",
        "color",
        "cut",
        "file",
        "folding-headings",
        "html",
        "latex",
        "mermaid",
        "openapi",
        "page-constructor",
        "quote-link",
        "search",
        "tabs",
    ]
    .iter()
    .map(|name| {
        let repo = format!("{}-extension", name);
        Row::npm(
            &format!("extensions/{}", name),
            &repo,
            &format!("@diplodoc/{}", repo),
        )
        .sonar()
    })
    .collect();

    let devops = vec![
        Row::npm("devops/babel-preset", "babel-preset", "@diplodoc/babel-preset").skip(&[Tests]),
        Row::npm("devops/lint", "lint", "@diplodoc/lint"),
        Row::new("devops/package-template", "package-template").skip(&[Version, Tests, Release]),
        Row::npm("devops/testpack", "testpack", "@diplodoc/testpack"),
        Row::npm("devops/tsconfig", "tsconfig", "@diplodoc/tsconfig").skip(&[Tests]),
    ];

    let actions = ["docs-build", "docs-clean", "docs-message", "docs-release", "docs-upload"]
        .iter()
        .map(|name| Row::new(&format!("actions/{}", name), &format!("{}-action", name)))
        .collect();

    let mut sections = IndexMap::new();
    sections.insert(
        "packages".to_string(),
        Section {
            columns: full.clone(),
            version_badge: VersionBadge::Npm,
            rows: packages,
        },
    );
    sections.insert(
        "extensions".to_string(),
        Section {
            columns: full,
            version_badge: VersionBadge::Npm,
            rows: extensions,
        },
    );
    sections.insert(
        "devops".to_string(),
        Section {
            columns: vec![Version, Tests, Release, Security],
            version_badge: VersionBadge::Npm,
            rows: devops,
        },
    );
    sections.insert(
        "actions".to_string(),
        Section {
            columns: vec![Version, Release, Security],
            version_badge: VersionBadge::GithubRelease,
            rows: actions,
        },
    );
    sections
}

fn link(href: &str, text: &str) -> String {
    format!("[{}]({})", text, href)
}

fn badge(image: &str, href: &str, alt: &str) -> String {
    link(href, &format!("![{}]({})", alt, image))
}

/// Renders the markdown dashboard.
pub struct PulseRenderer<'a> {
    config: &'a PulseConfig,
    namespace: &'a str,
}

impl<'a> PulseRenderer<'a> {
    pub fn new(config: &'a PulseConfig, namespace: &'a str) -> Self {
        Self { config, namespace }
    }

    fn repo_url(&self, repo: &str) -> String {
        format!("https://github.com/{}/{}", self.config.org, repo)
    }

    fn workflow_badge(&self, repo: &str, workflow: &str, alt: &str, on_branch: bool) -> String {
        let page = format!("{}/actions/workflows/{}.yml", self.repo_url(repo), workflow);
        let image = if on_branch {
            format!("{}/badge.svg?branch={}", page, self.config.branch)
        } else {
            format!("{}/badge.svg", page)
        };
        badge(&image, &page, alt)
    }

    fn infra_badge(&self, repo: &str) -> String {
        let lockfile = format!(
            "https://raw.githubusercontent.com/{}/{}/{}/package-lock.json",
            self.config.org, repo, self.config.branch
        );
        let query = format!(
            "$['packages']['node_modules/{}'].version",
            self.config.lint_package
        );
        let params = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("url", &lockfile)
            .append_pair("query", &query)
            .append_pair("label", "infra")
            .append_pair("prefix", "v")
            .finish();
        badge(
            &format!("https://img.shields.io/badge/dynamic/json?{}", params),
            &format!("{}/releases", self.repo_url("lint")),
            "lint",
        )
    }

    fn cell(&self, row: &Row, column: Column, section: &Section) -> String {
        if row.skip.contains(&column) {
            return DASH.to_string();
        }

        let repo = row.repo.as_str();
        let releases = format!("{}/releases", self.repo_url(repo));
        match column {
            Column::Version => match (section.version_badge, row.npm.as_deref()) {
                (VersionBadge::GithubRelease, _) => badge(
                    &format!(
                        "https://img.shields.io/github/v/release/{}/{}",
                        self.config.org, repo
                    ),
                    &releases,
                    "version",
                ),
                (VersionBadge::Npm, Some(npm)) => badge(
                    &format!("https://img.shields.io/npm/v/{}", npm),
                    &releases,
                    "version",
                ),
                (VersionBadge::Npm, None) => DASH.to_string(),
            },
            Column::Tests => self.workflow_badge(repo, "tests", "tests", true),
            Column::Release => self.workflow_badge(repo, "release", "release", false),
            Column::Security => self.workflow_badge(repo, "security", "security", true),
            Column::Coverage => match row.coverage {
                Some(Coverage::Sonar) => {
                    let project = format!("{}_{}", self.config.org, repo);
                    badge(
                        &format!(
                            "https://sonarcloud.io/api/project_badges/measure?project={}&metric=coverage",
                            project
                        ),
                        &format!("https://sonarcloud.io/summary/overall?id={}", project),
                        "Coverage",
                    )
                }
                None => DASH.to_string(),
            },
            Column::Infra => self.infra_badge(repo),
        }
    }

    fn table_header(columns: &[Column]) -> String {
        let mut heads = vec!["Submodule"];
        heads.extend(columns.iter().map(Column::as_str));
        let separator: Vec<&str> = (0..heads.len())
            .map(|i| if i == 0 { "-----------" } else { ":-------:" })
            .collect();
        format!("| {} |\n|{}|", heads.join(" | "), separator.join("|"))
    }

    fn table_row(&self, row: &Row, section: &Section) -> String {
        let mut cells = vec![link(&self.repo_url(&row.repo), &row.path)];
        cells.extend(section.columns.iter().map(|c| self.cell(row, *c, section)));
        format!("| {} |", cells.join(" | "))
    }

    fn render_section(&self, name: &str, section: &Section, is_last: bool) -> String {
        let mut lines = vec![
            format!("## {}", name),
            String::new(),
            Self::table_header(&section.columns),
        ];
        lines.extend(section.rows.iter().map(|row| self.table_row(row, section)));
        if !is_last {
            lines.push("---".to_string());
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn header(&self) -> String {
        let branch = &self.config.branch;
        format!(
            "# Pulse — status of submodules ({branch})\n\
             \n\
             Status badges for workflows created from [{lint}](devops/lint) scaffolding (`lint init` / `lint update`).  \n\
             Branch: **{branch}**. Release badge reflects last run (event: `release: published` or `workflow_dispatch`).\n\
             \n\
             Workflows: [tests](.github/workflows/tests.yml) · [release](.github/workflows/release.yml) · [security](.github/workflows/security.yml)\n\
             \n\
             **Version:** npm latest for packages/extensions/devops (link → GitHub Releases); GitHub release for actions.\n\
             \n\
             ---\n",
            branch = branch,
            lint = self.config.lint_package,
        )
    }

    /// Full document: header, one table per section, optional dependency graph.
    pub fn render(&self, diagram: Option<&DependencyDiagram>) -> String {
        let count = self.config.sections.len();
        let body: Vec<String> = self
            .config
            .sections
            .iter()
            .enumerate()
            .map(|(i, (name, section))| self.render_section(name, section, i + 1 == count))
            .collect();

        let mut out = format!("{}\n{}", self.header(), body.join("\n").trim_end());
        if let Some(diagram) = diagram.filter(|d| !d.is_empty()) {
            out.push_str("\n\n---\n\n");
            out.push_str(&diagram.render(self.config, self.namespace));
        }
        out.push('\n');
        out
    }
}

/// Short id of a namespaced package: `@diplodoc/foo-extension` → `foo-extension`.
fn short_id<'s>(name: &'s str, prefix: &str) -> &'s str {
    name.strip_prefix(prefix).unwrap_or(name)
}

/// Dependency edges between namespace packages.
///
/// Nodes are short ids inserted in sorted order; edges keep graph order and
/// carry the kind of the source's declaration.
#[derive(Debug, Default)]
pub struct DependencyDiagram {
    graph: DiGraph<String, DependencyKind>,
}

impl DependencyDiagram {
    /// Joins the project graph with each project's manifest under `workspace`.
    pub fn build(
        project_graph: &ProjectGraph,
        workspace: &Path,
        config: &PulseConfig,
        namespace: &str,
    ) -> Self {
        let prefix = format!("{}/", namespace.trim_end_matches('/'));

        let mut package_of: HashMap<&str, String> = HashMap::new();
        let mut manifests: HashMap<&str, PackageManifest> = HashMap::new();
        for (id, node) in &project_graph.nodes {
            let Some(root) = node.data.root.as_deref() else {
                continue;
            };
            match PackageManifest::read(&workspace.join(root)) {
                Ok(manifest) => {
                    if !manifest.name.is_empty() {
                        package_of.insert(id, manifest.name.clone());
                    }
                    manifests.insert(id, manifest);
                }
                Err(e) => {
                    debug!(id = %id, error = %e, "no manifest for graph node");
                    if id.starts_with(&prefix) {
                        package_of.insert(id, id.clone());
                    }
                }
            }
        }

        let hidden = |short: &str| {
            config.hidden.iter().any(|h| h == short)
                || (config.hide_examples && short.ends_with("-example"))
        };

        let mut edges = Vec::new();
        for edge in project_graph.edges() {
            let (Some(source), Some(target)) = (
                package_of.get(edge.source.as_str()),
                package_of.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if !source.starts_with(&prefix) || !target.starts_with(&prefix) {
                continue;
            }

            let from = short_id(source, &prefix);
            let to = short_id(target, &prefix);
            if hidden(from) || hidden(to) {
                continue;
            }

            let is_dev = manifests
                .get(edge.source.as_str())
                .is_some_and(|m| m.dev_dependencies.contains_key(target.as_str()));
            let kind = if is_dev {
                DependencyKind::Development
            } else {
                DependencyKind::Runtime
            };
            edges.push((from.to_string(), to.to_string(), kind));
        }

        Self::from_edges(edges)
    }

    pub fn from_edges(edges: Vec<(String, String, DependencyKind)>) -> Self {
        let visible: BTreeSet<&str> = edges
            .iter()
            .flat_map(|(from, to, _)| [from.as_str(), to.as_str()])
            .collect();

        let mut graph = DiGraph::new();
        let index: HashMap<&str, NodeIndex> = visible
            .iter()
            .map(|id| (*id, graph.add_node(id.to_string())))
            .collect();

        for (from, to, kind) in &edges {
            graph.add_edge(index[from.as_str()], index[to.as_str()], *kind);
        }

        Self { graph }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Mermaid flowchart wrapped in its markdown section.
    pub fn render(&self, config: &PulseConfig, namespace: &str) -> String {
        let prefix = format!("{}/", namespace.trim_end_matches('/'));
        let plain_id = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").ok();
        let mermaid_id = |id: &str| match &plain_id {
            Some(re) if re.is_match(id) => id.to_string(),
            _ => format!("\"{}\"", id),
        };

        let repo_of: HashMap<&str, &str> = config
            .sections
            .values()
            .flat_map(|s| s.rows.iter())
            .filter_map(|row| Some((short_id(row.npm.as_deref()?, &prefix), row.repo.as_str())))
            .collect();

        let mut lines = vec![
            r#"%%{ init: { "flowchart": { "curve": "stepAfter", "defaultRenderer": "elk" } } }%%"#
                .to_string(),
            "flowchart LR".to_string(),
        ];
        for node in self.graph.node_indices() {
            let id = &self.graph[node];
            lines.push(format!("  {}[\"{}\"]", mermaid_id(id), id));
        }
        for edge in self.graph.edge_references() {
            let arrow = match edge.weight() {
                DependencyKind::Development => "-.->",
                DependencyKind::Runtime => "-->",
            };
            lines.push(format!(
                "  {} {} {}",
                self.graph[edge.source()],
                arrow,
                self.graph[edge.target()]
            ));
        }
        for node in self.graph.node_indices() {
            let id = &self.graph[node];
            if let Some(repo) = repo_of.get(id.as_str()) {
                lines.push(format!(
                    "  click {} href \"https://github.com/{}/{}\"",
                    mermaid_id(id),
                    config.org,
                    repo
                ));
            }
        }

        [
            format!("## Dependency graph ({} packages)", namespace.trim_end_matches('/')),
            String::new(),
            "Generated from Nx project graph (`nx graph --file`). **Orientation:** top to bottom (`flowchart TB`).".to_string(),
            String::new(),
            "```mermaid".to_string(),
            lines.join("\n"),
            "```".to_string(),
            String::new(),
        ]
        .join("\n")
    }
}

/// Renders the dashboard and writes it to the configured output file.
pub fn write_pulse(
    workspace: &Path,
    config: &PulseConfig,
    namespace: &str,
    diagram: Option<&DependencyDiagram>,
) -> Result<std::path::PathBuf> {
    if config.sections.is_empty() {
        return Err(Error::Config("pulse needs at least one section".to_string()));
    }

    let document = PulseRenderer::new(config, namespace).render(diagram);
    let path = workspace.join(&config.output);
    std::fs::write(&path, document)?;
    Ok(path)
}
