//! Long-running child processes supervised per role.

use std::collections::VecDeque;
use std::fmt;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::shell::CommandSpec;

/// Lines kept per process for failure diagnostics.
const TRANSCRIPT_LINES: usize = 500;

/// Logical job of a child process in the dev loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Build,
    Docs,
    Server,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Build => "build",
            Role::Docs => "docs",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    NotStarted,
    Starting,
    Running,
    Restarting,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One line of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    pub role: Role,
    pub stream: Stream,
    pub text: String,
}

fn forward_lines<R>(reader: R, role: Role, stream: Stream, tx: mpsc::UnboundedSender<LineEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    if tx.send(LineEvent { role, stream, text }).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(role = %role, error = %e, "output stream closed");
                    break;
                }
            }
        }
    });
}

/// A spawned child whose stdout and stderr arrive as [`LineEvent`]s.
///
/// Lines of one stream keep their order; the two streams interleave freely.
pub struct SupervisedProcess {
    role: Role,
    child: Child,
    lines: mpsc::UnboundedReceiver<LineEvent>,
    open: bool,
    transcript: VecDeque<String>,
}

impl SupervisedProcess {
    /// Spawns `spec`. Must be called inside a tokio runtime.
    pub fn spawn(role: Role, spec: &CommandSpec) -> Result<Self> {
        let mut child = spec
            .to_tokio()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: spec.to_string(),
                source,
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, role, Stream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, role, Stream::Stderr, tx);
        }

        debug!(role = %role, command = %spec, pid = ?child.id(), "spawned");
        Ok(Self {
            role,
            child,
            lines: rx,
            open: true,
            transcript: VecDeque::new(),
        })
    }

    /// Next output line, or `None` once both streams are closed.
    pub async fn next_line(&mut self) -> Option<LineEvent> {
        if !self.open {
            return None;
        }
        match self.lines.recv().await {
            Some(event) => {
                if self.transcript.len() == TRANSCRIPT_LINES {
                    self.transcript.pop_front();
                }
                self.transcript.push_back(event.text.clone());
                Some(event)
            }
            None => {
                self.open = false;
                None
            }
        }
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.open
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Captured output, most recent lines last.
    pub fn transcript(&self) -> String {
        self.transcript
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Kills the child and reaps it. Failures are logged, not returned.
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(role = %self.role, error = %e, "kill failed, process already gone");
        }
    }
}

/// Owned record of one role: its command, state, and at most one live process.
pub struct RoleHandle {
    role: Role,
    spec: CommandSpec,
    state: RoleState,
    process: Option<SupervisedProcess>,
    starts: usize,
}

impl RoleHandle {
    pub fn new(role: Role, spec: CommandSpec) -> Self {
        Self {
            role,
            spec,
            state: RoleState::NotStarted,
            process: None,
            starts: 0,
        }
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn state(&self) -> RoleState {
        self.state
    }

    /// How many processes this role has launched.
    #[inline]
    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(SupervisedProcess::id)
    }

    pub fn is_streaming(&self) -> bool {
        self.process.as_ref().is_some_and(SupervisedProcess::is_streaming)
    }

    pub fn transcript(&self) -> String {
        self.process
            .as_ref()
            .map(SupervisedProcess::transcript)
            .unwrap_or_default()
    }

    /// Launches the role's process, killing any previous one first.
    pub async fn start(&mut self) -> Result<()> {
        if self.process.is_some() {
            debug!(role = %self.role, "restarting");
            self.state = RoleState::Restarting;
            self.discard().await;
        }

        self.state = RoleState::Starting;
        self.process = Some(SupervisedProcess::spawn(self.role, &self.spec)?);
        self.starts += 1;
        Ok(())
    }

    /// Marks a started role usable without waiting for a marker.
    pub fn mark_running(&mut self) {
        if self.process.is_some() {
            self.state = RoleState::Running;
        }
    }

    async fn discard(&mut self) {
        if let Some(mut old) = self.process.take() {
            old.kill().await;
        }
    }

    pub async fn next_line(&mut self) -> Option<LineEvent> {
        match self.process.as_mut() {
            Some(process) => process.next_line().await,
            None => None,
        }
    }

    /// Consumes output until a line containing `marker` appears, then marks
    /// the role running. Every consumed line is handed to `on_line`.
    ///
    /// # Errors
    ///
    /// Fails if the process closes its output before printing the marker.
    pub async fn wait_ready<F>(&mut self, marker: &str, mut on_line: F) -> Result<()>
    where
        F: FnMut(&LineEvent),
    {
        while let Some(event) = self.next_line().await {
            on_line(&event);
            if event.text.contains(marker) {
                self.state = RoleState::Running;
                return Ok(());
            }
        }

        let status = self.wait_exit().await?;
        Err(self.failure(format!(
            "exited with {} before printing '{}'",
            status, marker
        )))
    }

    /// Consumes output until the process exits; fails on a non-zero exit.
    pub async fn run_to_completion<F>(&mut self, mut on_line: F) -> Result<()>
    where
        F: FnMut(&LineEvent),
    {
        while let Some(event) = self.next_line().await {
            on_line(&event);
        }

        let status = self.wait_exit().await?;
        if status.success() {
            self.state = RoleState::Running;
            Ok(())
        } else {
            Err(self.failure(format!("exited with {}", status)))
        }
    }

    /// Exit status of a process whose output has closed.
    pub async fn wait_exit(&mut self) -> Result<ExitStatus> {
        match self.process.as_mut() {
            Some(process) => process.wait().await,
            None => Err(self.failure("not started".to_string())),
        }
    }

    /// Error describing this role's failure, carrying its captured output.
    pub fn failure(&self, message: String) -> Error {
        Error::RoleFailed {
            role: self.role,
            message,
            output: self.transcript(),
        }
    }

    /// Kills the live process, if any. The role stays killed.
    pub async fn kill(&mut self) {
        if self.process.is_some() {
            warn!(role = %self.role, "stopping");
        }
        self.discard().await;
        self.state = RoleState::Killed;
    }
}
