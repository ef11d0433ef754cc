//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::Role;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {context}: {error}")]
    Json {
        error: serde_json::Error,
        context: String,
    },

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Invalid dependency specifier: '{0}'. Expected name[@version].")]
    InvalidSpecifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest not found: {0}. Expected 'package.json' in project root.")]
    ManifestNotFound(PathBuf),

    #[error("Command `{command}` failed with {status}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Project graph query failed: {0}")]
    GraphQuery(String),

    #[error("{role} failed: {message}\n{output}")]
    RoleFailed {
        role: Role,
        message: String,
        output: String,
    },
}

impl Error {
    pub(crate) fn json(error: serde_json::Error, context: impl Into<String>) -> Self {
        Error::Json {
            error,
            context: context.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "metapack.toml".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
