//! Workspace configuration as defined in `metapack.toml`.
//!
//! Every field is optional. A missing file yields the defaults, which match
//! the `@diplodoc` metapackage layout.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pulse::PulseConfig;
use crate::shell::CommandSpec;

pub const CONFIG_FILE: &str = "metapack.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Package scope shared by every sub-project, e.g. `@diplodoc`.
    pub namespace: String,
    pub graph: GraphConfig,
    pub watch: WatchConfig,
    pub pulse: PulseConfig,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            namespace: "@diplodoc".to_string(),
            graph: GraphConfig::default(),
            watch: WatchConfig::default(),
            pulse: PulseConfig::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Loads the configuration, falling back to defaults when `path` is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Toml { error, .. } => Error::Toml {
                error,
                context: path.display().to_string(),
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.namespace.trim().is_empty() {
            return Err(Error::Config("namespace cannot be empty".to_string()));
        }
        Ok(config)
    }

    /// Prefix every namespaced package name starts with, e.g. `@diplodoc/`.
    pub fn namespace_prefix(&self) -> String {
        format!("{}/", self.namespace.trim_end_matches('/'))
    }
}

/// How the project graph is queried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Graph command; `--file=<path>` is appended.
    pub command: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            command: "npx nx graph".to_string(),
        }
    }
}

/// Dev loop settings. Command templates accept `{project}`, `{input}`,
/// `{output}` and `{namespace}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub project: String,
    pub docs_input: String,
    pub docs_output: String,
    pub server_dir: String,
    pub build_command: String,
    pub docs_command: String,
    pub server_command: String,
    pub watch_command: String,
    pub markers: Markers,
    /// Progress lines containing this (after expansion) are echoed.
    pub progress_prefix: String,
    /// Stderr lines containing any of these are dropped.
    pub ignored_stderr: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            project: "@diplodoc/testpack".to_string(),
            docs_input: "devops/testpack/docs/input".to_string(),
            docs_output: "devops/testpack/docs/output".to_string(),
            server_dir: "devops/testpack".to_string(),
            build_command: "nx build {project} --parallel=5 --verbose".to_string(),
            docs_command: "docs -i {input} -o {output}".to_string(),
            server_command: "npm start".to_string(),
            watch_command:
                "nx watch -d -p {project} -- nx build {project} --parallel=5 --verbose"
                    .to_string(),
            markers: Markers::default(),
            progress_prefix: "> nx run {namespace}".to_string(),
            ignored_stderr: vec!["npm warn config ignoring workspace config".to_string()],
        }
    }
}

impl WatchConfig {
    pub fn expand(&self, template: &str, namespace: &str) -> String {
        template
            .replace("{project}", &self.project)
            .replace("{input}", &self.docs_input)
            .replace("{output}", &self.docs_output)
            .replace("{namespace}", namespace)
    }

    pub fn command(&self, template: &str, namespace: &str) -> Result<CommandSpec> {
        CommandSpec::parse(&self.expand(template, namespace))
    }
}

/// Readiness markers: substrings matched against streamed output lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub docs_ready: String,
    pub server_ready: String,
    pub rebuild_complete: String,
    /// Marks an intermediate target that did not change.
    pub unchanged: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            docs_ready: "Build time:".to_string(),
            server_ready: "Documentations served".to_string(),
            rebuild_complete: "Successfully ran target build".to_string(),
            unchanged: "left as is".to_string(),
        }
    }
}
