//! Build → docs → serve development loop for one package.
//!
//! The loop builds the package once, builds its documentation, starts the
//! documentation server and then runs the build watcher. Every completed
//! rebuild restarts the docs role; the server keeps running and serves the
//! refreshed output directory.
//!
//! All roles are owned by [`DevLoop`] and driven from a single dispatch loop,
//! so docs restarts never overlap: a rebuild line that arrives mid-restart
//! waits in the watcher's channel until the restart has finished.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{Markers, WorkspaceConfig};
use crate::error::{Error, Result};
use crate::graph::ProjectRoot;
use crate::observer::{Dispatch, LineObserver, LinePattern};
use crate::process::{LineEvent, Role, RoleHandle, RoleState, Stream};
use crate::reset::unlink_namespace;
use crate::shell::CommandSpec;

/// Signals raised by observed output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A change-triggered build finished.
    Rebuilt,
}

/// Fully resolved commands and matching rules for one dev loop.
#[derive(Debug, Clone)]
pub struct DevLoopPlan {
    pub namespace: String,
    pub project: String,
    pub build: CommandSpec,
    pub docs: CommandSpec,
    pub server: CommandSpec,
    pub watch: CommandSpec,
    pub markers: Markers,
    pub progress_prefix: String,
    pub ignored_stderr: Vec<String>,
}

impl DevLoopPlan {
    pub fn from_config(workspace: &Path, config: &WorkspaceConfig) -> Result<Self> {
        let watch = &config.watch;
        let namespace = config.namespace.as_str();

        Ok(Self {
            namespace: namespace.to_string(),
            project: watch.project.clone(),
            build: watch.command(&watch.build_command, namespace)?.current_dir(workspace),
            docs: watch.command(&watch.docs_command, namespace)?.current_dir(workspace),
            server: watch
                .command(&watch.server_command, namespace)?
                .current_dir(workspace.join(&watch.server_dir)),
            watch: watch.command(&watch.watch_command, namespace)?.current_dir(workspace),
            markers: watch.markers.clone(),
            progress_prefix: watch.expand(&watch.progress_prefix, namespace),
            ignored_stderr: watch.ignored_stderr.clone(),
        })
    }
}

struct Observers {
    build: LineObserver<Signal>,
    docs: LineObserver<Signal>,
    server: LineObserver<Signal>,
    stderr: LineObserver<Signal>,
}

impl Observers {
    fn new(plan: &DevLoopPlan) -> Self {
        let markers = &plan.markers;
        let progress = || LinePattern::contains(plan.progress_prefix.clone());
        let unchanged = || LinePattern::contains(markers.unchanged.clone());

        let build = LineObserver::quiet()
            .suppress(unchanged())
            .echo(progress())
            .echo(LinePattern::contains(markers.rebuild_complete.clone()))
            .emit(
                LinePattern::contains(markers.rebuild_complete.clone()),
                Signal::Rebuilt,
            );

        let docs = LineObserver::quiet()
            .suppress(unchanged())
            .echo(progress())
            .echo(LinePattern::contains(markers.docs_ready.clone()));

        let server =
            LineObserver::quiet().echo(LinePattern::contains(markers.server_ready.clone()));

        let stderr = plan
            .ignored_stderr
            .iter()
            .fold(LineObserver::verbose().suppress(unchanged()), |observer, noise| {
                observer.suppress(LinePattern::contains(noise.clone()))
            });

        Self {
            build,
            docs,
            server,
            stderr,
        }
    }

    fn dispatch(&self, event: &LineEvent) -> Dispatch<Signal> {
        let by_role = match event.role {
            Role::Build => &self.build,
            Role::Docs => &self.docs,
            Role::Server => &self.server,
        };
        match event.stream {
            Stream::Stdout => by_role.observe(&event.text),
            Stream::Stderr => Dispatch {
                echo: self.stderr.observe(&event.text).echo,
                signals: by_role.observe(&event.text).signals,
            },
        }
    }
}

/// Writes a line if the observers let it through.
fn echo_line(out: &mut dyn Write, observers: &Observers, event: &LineEvent) -> Dispatch<Signal> {
    let dispatch = observers.dispatch(event);
    if dispatch.echo {
        // Console write failures must not take the loop down.
        let _ = writeln!(out, "{}", event.text);
    }
    dispatch
}

pub struct DevLoop {
    workspace: PathBuf,
    plan: DevLoopPlan,
    observers: Observers,
    build: RoleHandle,
    docs: RoleHandle,
    server: RoleHandle,
    out: Box<dyn Write + Send>,
}

impl DevLoop {
    pub fn new(workspace: impl Into<PathBuf>, plan: DevLoopPlan, out: Box<dyn Write + Send>) -> Self {
        Self {
            workspace: workspace.into(),
            observers: Observers::new(&plan),
            build: RoleHandle::new(Role::Build, plan.watch.clone()),
            docs: RoleHandle::new(Role::Docs, plan.docs.clone()),
            server: RoleHandle::new(Role::Server, plan.server.clone()),
            plan,
            out,
        }
    }

    pub fn role(&self, role: Role) -> &RoleHandle {
        match role {
            Role::Build => &self.build,
            Role::Docs => &self.docs,
            Role::Server => &self.server,
        }
    }

    fn announce(&mut self, message: &str) {
        info!("{}", message);
        let _ = writeln!(self.out, "{}", message);
    }

    /// Runs the loop until `shutdown` resolves or a role fails.
    ///
    /// # Errors
    ///
    /// Returns the first role failure. The failing role's captured output is
    /// part of the error; every child still running is killed first.
    pub async fn run_until<F>(&mut self, roots: &[ProjectRoot], shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        unlink_namespace(&self.workspace, roots, &self.plan.namespace)?;

        if let Err(e) = self.start_environment().await {
            self.stop_all().await;
            return Err(e);
        }

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("interrupted, stopping dev loop");
                    break Ok(());
                }
                event = self.build.next_line() => match event {
                    Some(event) => {
                        let dispatch = echo_line(self.out.as_mut(), &self.observers, &event);
                        if dispatch.signals.contains(&Signal::Rebuilt) {
                            if let Err(e) = self.restart_docs().await {
                                break Err(e);
                            }
                        }
                    }
                    None => break Err(self.exited(Role::Build).await),
                },
                event = self.docs.next_line(), if self.docs.is_streaming() => match event {
                    Some(event) => {
                        echo_line(self.out.as_mut(), &self.observers, &event);
                    }
                    None => {
                        // A docs build finishing on its own is the normal case.
                        match self.docs.wait_exit().await {
                            Ok(status) if status.success() => {}
                            Ok(status) => {
                                break Err(self.docs.failure(format!("exited with {}", status)));
                            }
                            Err(e) => break Err(e),
                        }
                    }
                },
                event = self.server.next_line() => match event {
                    Some(event) => {
                        echo_line(self.out.as_mut(), &self.observers, &event);
                    }
                    None => break Err(self.exited(Role::Server).await),
                },
            }
        };

        self.stop_all().await;
        result
    }

    async fn start_environment(&mut self) -> Result<()> {
        self.announce(&format!("Build {}", self.plan.project));
        let mut initial = RoleHandle::new(Role::Build, self.plan.build.clone());
        initial.start().await?;
        let (out, observers) = (self.out.as_mut(), &self.observers);
        initial
            .run_to_completion(|event| {
                echo_line(&mut *out, observers, event);
            })
            .await?;

        self.announce("Build documentation");
        self.start_docs().await?;

        self.announce("Start documentation server");
        self.server.start().await?;
        let (out, observers) = (self.out.as_mut(), &self.observers);
        self.server
            .wait_ready(&self.plan.markers.server_ready, |event| {
                echo_line(&mut *out, observers, event);
            })
            .await?;

        self.announce("Start watching");
        self.build.start().await?;
        self.build.mark_running();
        Ok(())
    }

    async fn start_docs(&mut self) -> Result<()> {
        self.docs.start().await?;
        let (out, observers) = (self.out.as_mut(), &self.observers);
        self.docs
            .wait_ready(&self.plan.markers.docs_ready, |event| {
                echo_line(&mut *out, observers, event);
            })
            .await
    }

    /// Kills the current docs process and builds fresh docs.
    async fn restart_docs(&mut self) -> Result<()> {
        info!("rebuild finished, regenerating documentation");
        self.start_docs().await
    }

    async fn exited(&mut self, role: Role) -> Error {
        let handle = match role {
            Role::Build => &mut self.build,
            Role::Docs => &mut self.docs,
            Role::Server => &mut self.server,
        };
        let message = match handle.wait_exit().await {
            Ok(status) => format!("exited unexpectedly with {}", status),
            Err(e) => format!("exited unexpectedly ({})", e),
        };
        warn!(role = %role, "{}", message);
        handle.failure(message)
    }

    async fn stop_all(&mut self) {
        for handle in [&mut self.build, &mut self.docs, &mut self.server] {
            if handle.state() != RoleState::NotStarted {
                handle.kill().await;
            }
        }
    }
}
