//! Bulk dependency version bumps across sub-projects.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::ProjectRoot;
use crate::manifest::{DependencyKind, PackageManifest, LOCKFILE, MANIFEST_FILE};
use crate::shell::{CommandRunner, CommandSpec};

pub const DEFAULT_TARGET: &str = "latest";

/// A requested dependency: `name[@version]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub version: String,
}

impl DependencySpec {
    /// Parses `name`, `name@version`, `@scope/name` or `@scope/name@version`.
    ///
    /// The version separator is the first `@` after the first character that
    /// is followed by at least one more character.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let split = input
            .char_indices()
            .skip(1)
            .find(|&(idx, c)| c == '@' && idx + 1 < input.len());

        let (name, version) = match split {
            Some((idx, _)) => (&input[..idx], &input[idx + 1..]),
            None => (input, DEFAULT_TARGET),
        };

        if name.is_empty()
            || name == "@"
            || input.ends_with('@')
            || input.contains(char::is_whitespace)
        {
            return Err(Error::InvalidSpecifier(input.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl FromStr for DependencySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// One pinned dependency of one project that should move to a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpdateTask {
    pub project: String,
    pub root: ProjectRoot,
    pub name: String,
    pub kind: DependencyKind,
    pub previous: String,
    pub target: String,
}

impl DependencyUpdateTask {
    fn summary(&self) -> String {
        format!("{}: {} -> {}", self.name, self.previous, self.target)
    }

    fn install_arg(&self) -> String {
        format!("{}@{}", self.name, self.target)
    }

    fn commit_fragment(&self) -> String {
        format!("{}[{}->{}]", self.name, self.previous, self.target)
    }
}

/// Tasks sharing one project and one dependency kind; installed together.
#[derive(Debug, Clone)]
pub struct UpdateGroup {
    pub project: String,
    pub root: ProjectRoot,
    pub kind: DependencyKind,
    pub tasks: Vec<DependencyUpdateTask>,
}

impl UpdateGroup {
    pub fn commit_message(&self) -> String {
        let changes: Vec<String> = self.tasks.iter().map(|t| t.commit_fragment()).collect();
        format!("deps: {}", changes.join(", "))
    }

    fn install_commands(&self, workspace: &Path) -> [CommandSpec; 2] {
        let cwd = self.root.resolve(workspace);
        let base = CommandSpec::new("npm")
            .arg("i")
            .args(self.tasks.iter().map(|t| t.install_arg()))
            .arg(self.kind.save_flag())
            .current_dir(&cwd);

        [base.clone().arg("--no-workspaces"), base]
    }
}

/// All update groups of one project.
#[derive(Debug, Clone)]
pub struct ProjectUpdates {
    pub project: String,
    pub groups: Vec<UpdateGroup>,
}

/// Update tasks grouped by project, then by dependency kind, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub projects: Vec<ProjectUpdates>,
}

impl UpdatePlan {
    /// Collects every pinned occurrence of the requested dependencies.
    pub fn build(manifests: &[(ProjectRoot, PackageManifest)], specs: &[DependencySpec]) -> Self {
        let mut tasks = Vec::new();

        for (root, manifest) in manifests {
            for spec in specs {
                for kind in DependencyKind::ALL {
                    if let Some(previous) = manifest.pinned_version(kind, &spec.name) {
                        tasks.push(DependencyUpdateTask {
                            project: manifest.name.clone(),
                            root: root.clone(),
                            name: spec.name.clone(),
                            kind,
                            previous: previous.to_string(),
                            target: spec.version.clone(),
                        });
                    }
                }
            }
        }

        Self::from_tasks(tasks)
    }

    pub fn from_tasks(tasks: Vec<DependencyUpdateTask>) -> Self {
        type KindMap = IndexMap<DependencyKind, Vec<DependencyUpdateTask>>;
        let mut by_project: IndexMap<(String, ProjectRoot), KindMap> = IndexMap::new();

        for task in tasks {
            by_project
                .entry((task.project.clone(), task.root.clone()))
                .or_default()
                .entry(task.kind)
                .or_default()
                .push(task);
        }

        let projects = by_project
            .into_iter()
            .map(|((project, root), kinds)| ProjectUpdates {
                groups: kinds
                    .into_iter()
                    .map(|(kind, tasks)| UpdateGroup {
                        project: project.clone(),
                        root: root.clone(),
                        kind,
                        tasks,
                    })
                    .collect(),
                project,
            })
            .collect();

        Self { projects }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &UpdateGroup> {
        self.projects.iter().flat_map(|p| p.groups.iter())
    }

    pub fn task_count(&self) -> usize {
        self.groups().map(|g| g.tasks.len()).sum()
    }

    fn project_header(project: &ProjectUpdates) -> String {
        format!("[{}]:", project.project)
    }

    fn group_lines(group: &UpdateGroup) -> Vec<String> {
        let mut lines = vec![format!("  {}:", group.kind)];
        lines.extend(group.tasks.iter().map(|t| format!("    {}", t.summary())));
        lines
    }
}

/// Reads the manifest of every root.
pub fn load_manifests(
    workspace: &Path,
    roots: &[ProjectRoot],
) -> Result<Vec<(ProjectRoot, PackageManifest)>> {
    roots
        .iter()
        .map(|root| Ok((root.clone(), PackageManifest::read(&root.resolve(workspace))?)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Print the plan without installing or committing.
    pub dry_run: bool,
    /// Commit manifest and lockfile per group when the install changed them.
    pub commit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub groups_installed: usize,
    pub commits: Vec<String>,
}

/// Applies an [`UpdatePlan`] through the package manager and version control.
pub struct DependencyUpdater<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    workspace_dir: PathBuf,
    options: UpdateOptions,
}

impl<'a, R: CommandRunner + ?Sized> DependencyUpdater<'a, R> {
    pub fn new(runner: &'a R, workspace_dir: impl Into<PathBuf>, options: UpdateOptions) -> Self {
        Self {
            runner,
            workspace_dir: workspace_dir.into(),
            options,
        }
    }

    /// Prints the summary of each group and applies it before moving on.
    ///
    /// The first failing command aborts the run. Groups applied before it
    /// stay applied.
    pub fn apply(&self, plan: &UpdatePlan, out: &mut dyn Write) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        for project in &plan.projects {
            writeln!(out, "{}", UpdatePlan::project_header(project))?;

            for group in &project.groups {
                for line in UpdatePlan::group_lines(group) {
                    writeln!(out, "{}", line)?;
                }

                if self.options.dry_run {
                    continue;
                }

                self.install(group)?;
                report.groups_installed += 1;

                if self.options.commit {
                    if let Some(message) = self.commit(group)? {
                        report.commits.push(message);
                    }
                }
            }
        }

        Ok(report)
    }

    fn install(&self, group: &UpdateGroup) -> Result<()> {
        info!(project = %group.project, kind = %group.kind, "installing updates");
        for command in group.install_commands(&self.workspace_dir) {
            self.runner.run_checked(&command)?;
        }
        Ok(())
    }

    /// Commits the group when the install left the manifest or lockfile dirty.
    fn commit(&self, group: &UpdateGroup) -> Result<Option<String>> {
        let cwd = group.root.resolve(&self.workspace_dir);

        let status = self
            .runner
            .run_checked(&CommandSpec::new("git").args(["status", "-s"]).current_dir(&cwd))?;
        let dirty = status.stdout.contains(MANIFEST_FILE) || status.stdout.contains(LOCKFILE);
        if !dirty {
            debug!(project = %group.project, "install left no changes, skipping commit");
            return Ok(None);
        }

        let message = group.commit_message();
        self.runner.run_checked(
            &CommandSpec::new("git")
                .args(["add", MANIFEST_FILE, LOCKFILE])
                .current_dir(&cwd),
        )?;
        self.runner.run_checked(
            &CommandSpec::new("git")
                .args(["commit", "-m", message.as_str()])
                .current_dir(&cwd),
        )?;
        info!(project = %group.project, message = %message, "committed");

        Ok(Some(message))
    }
}
