//! Deletes and reinstalls `node_modules` across the workspace.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::graph::ProjectRoot;
use crate::shell::{CommandRunner, CommandSpec};

pub const INSTALL_DIR: &str = "node_modules";

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetOptions {
    /// Install once as a unified workspace instead of per project.
    pub metapackage: bool,
    /// Keep existing installs; only run the install phase.
    pub quick: bool,
    /// Log the plan without touching anything.
    pub dry_run: bool,
}

/// What a reset deletes and runs, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPlan {
    pub removals: Vec<PathBuf>,
    pub installs: Vec<CommandSpec>,
}

impl ResetPlan {
    pub fn new(workspace: &Path, roots: &[ProjectRoot], options: ResetOptions) -> Self {
        let removals = if options.quick {
            Vec::new()
        } else {
            roots
                .iter()
                .map(|root| root.resolve(workspace).join(INSTALL_DIR))
                .chain(std::iter::once(workspace.join(INSTALL_DIR)))
                .collect()
        };

        let installs = if options.metapackage {
            vec![CommandSpec::new("npm").arg("i").current_dir(workspace)]
        } else {
            roots
                .iter()
                .map(|root| root.resolve(workspace))
                .chain(std::iter::once(workspace.to_path_buf()))
                .map(|dir| {
                    CommandSpec::new("npm")
                        .args(["i", "--no-workspaces"])
                        .current_dir(dir)
                })
                .collect()
        };

        Self { removals, installs }
    }
}

/// Runs a reset. Safe from any prior state; the first failure aborts.
pub struct WorkspaceReset<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    options: ResetOptions,
}

impl<'a, R: CommandRunner + ?Sized> WorkspaceReset<'a, R> {
    pub fn new(runner: &'a R, options: ResetOptions) -> Self {
        Self { runner, options }
    }

    /// Executes `plan`, calling `on_step` after each removal or install.
    pub fn execute<F>(&self, plan: &ResetPlan, mut on_step: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        for dir in &plan.removals {
            let label = format!("rm -rf {}", dir.display());
            if self.options.dry_run {
                info!("[dry-run] {}", label);
            } else {
                remove_install_dir(dir)?;
            }
            on_step(&label);
        }

        for command in &plan.installs {
            let label = match &command.cwd {
                Some(cwd) => format!("{} ({})", command, cwd.display()),
                None => command.to_string(),
            };
            if self.options.dry_run {
                info!("[dry-run] {}", label);
            } else {
                self.runner.run_checked(command)?;
            }
            on_step(&label);
        }

        Ok(())
    }
}

/// Removes a dependency directory; a missing one is already reset.
fn remove_install_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Removes a namespace's scope directory from every project's install tree,
/// so freshly built local packages are resolved instead of installed copies.
pub fn unlink_namespace(workspace: &Path, roots: &[ProjectRoot], namespace: &str) -> Result<()> {
    for root in roots {
        remove_install_dir(&root.resolve(workspace).join(INSTALL_DIR).join(namespace))?;
    }
    Ok(())
}
