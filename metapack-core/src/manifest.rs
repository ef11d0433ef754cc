//! Package manifest (`package.json`) access.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "package.json";
pub const LOCKFILE: &str = "package-lock.json";

/// Version specifier that leaves a dependency unpinned.
pub const WILDCARD: &str = "*";

/// Which dependency map of a manifest an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    Runtime,
    Development,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 2] = [DependencyKind::Runtime, DependencyKind::Development];

    /// Manifest key of the map.
    #[inline]
    pub fn key(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "dependencies",
            DependencyKind::Development => "devDependencies",
        }
    }

    /// npm flag that saves into this map.
    #[inline]
    pub fn save_flag(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "--save",
            DependencyKind::Development => "--save-dev",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,
}

impl PackageManifest {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::json(e, MANIFEST_FILE))
    }

    /// Reads `<dir>/package.json`.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ManifestNotFound(path.clone()),
            _ => Error::Io(e),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::json(e, path.display().to_string()))
    }

    #[inline]
    pub fn dependencies_of(&self, kind: DependencyKind) -> &IndexMap<String, String> {
        match kind {
            DependencyKind::Runtime => &self.dependencies,
            DependencyKind::Development => &self.dev_dependencies,
        }
    }

    /// Concrete version `name` is pinned to under `kind`, if any.
    ///
    /// A `*` specifier counts as unpinned.
    pub fn pinned_version(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.dependencies_of(kind)
            .get(name)
            .map(String::as_str)
            .filter(|version| !version.is_empty() && *version != WILDCARD)
    }
}
