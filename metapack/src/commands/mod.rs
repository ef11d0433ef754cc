//! Command implementations for the CLI.

mod deps;
mod projects;
mod pulse;
mod reset;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use metapack_core::{GraphReader, ProjectRoot, SystemRunner, WorkspaceConfig, CONFIG_FILE};

pub use deps::cmd_deps_update;
pub use projects::cmd_projects;
pub use pulse::cmd_pulse;
pub use reset::cmd_reset;
pub use watch::cmd_watch;

/// The checkout every command operates on, with its configuration.
pub struct Workspace {
    pub dir: PathBuf,
    pub config: WorkspaceConfig,
    pub runner: SystemRunner,
}

impl Workspace {
    pub fn load(dir: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(|| dir.join(CONFIG_FILE));
        let config = WorkspaceConfig::load(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        Ok(Self {
            dir,
            config,
            runner: SystemRunner,
        })
    }

    fn graph_reader(&self) -> Result<GraphReader> {
        Ok(GraphReader::from_command_line(
            &self.config.graph.command,
            &self.dir,
        )?)
    }

    fn project_roots(&self) -> Result<Vec<ProjectRoot>> {
        let roots = self
            .graph_reader()?
            .list_project_roots(&self.runner)
            .context("Failed to read the project graph")?;
        Ok(roots)
    }
}
