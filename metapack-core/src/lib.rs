//! Core library for the metapackage workspace tooling.
//!
//! Everything that touches the outside world goes through a
//! [`CommandRunner`] for one-shot commands or a [`RoleHandle`] for the
//! long-running processes of the dev loop.

pub mod config;
pub mod deps;
pub mod devloop;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod observer;
pub mod process;
pub mod pulse;
pub mod reset;
pub mod shell;

pub use config::{GraphConfig, Markers, WatchConfig, WorkspaceConfig, CONFIG_FILE};
pub use deps::{
    load_manifests, DependencySpec, DependencyUpdateTask, DependencyUpdater, UpdateGroup,
    UpdateOptions, UpdatePlan, UpdateReport,
};
pub use devloop::{DevLoop, DevLoopPlan, Signal};
pub use error::{Error, Result};
pub use graph::{GraphReader, ProjectGraph, ProjectRoot};
pub use manifest::{DependencyKind, PackageManifest};
pub use observer::{Dispatch, LineAction, LineObserver, LinePattern};
pub use process::{LineEvent, Role, RoleHandle, RoleState, Stream, SupervisedProcess};
pub use pulse::{write_pulse, DependencyDiagram, PulseConfig, PulseRenderer};
pub use reset::{ResetOptions, ResetPlan, WorkspaceReset};
pub use shell::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
