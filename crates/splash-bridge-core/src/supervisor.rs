use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tracing::{debug, info, warn};

use crate::error::LaunchError;
use crate::process::{ProcessError, ProcessId, ProcessManager, ProcessStatus, TerminationResult};
use crate::window::WindowHandle;

/// Exit state of a display session, shared between the exit watcher, the bridge and teardown
#[derive(Debug, Default)]
pub struct SessionLifetime {
    status: OnceLock<ProcessStatus>,
    termination_requested: AtomicBool,
}

impl SessionLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_exited(&self) -> bool {
        self.status.get().is_some()
    }

    pub fn status(&self) -> ProcessStatus {
        self.status.get().cloned().unwrap_or(ProcessStatus::Running)
    }

    /// Record the exit status. Only the first call has an effect.
    pub fn mark_exited(&self, status: ProcessStatus) -> bool {
        self.status.set(status).is_ok()
    }

    pub fn termination_requested(&self) -> bool {
        self.termination_requested.load(Ordering::Acquire)
    }
}

/// Standard streams of the display process
pub struct SessionStdio {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// The running display process. Owned by whoever launched it.
pub struct DisplaySession {
    pid: ProcessId,
    executable: PathBuf,
    window: WindowHandle,
    stdio: Option<SessionStdio>,
    lifetime: Arc<SessionLifetime>,
}

impl DisplaySession {
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn lifetime(&self) -> &Arc<SessionLifetime> {
        &self.lifetime
    }

    pub fn has_exited(&self) -> bool {
        self.lifetime.has_exited()
    }

    /// Hand the streams to the bridge. Only succeeds once.
    pub fn take_stdio(&mut self) -> Option<SessionStdio> {
        self.stdio.take()
    }

    /// Lightweight view used to terminate the session from elsewhere
    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            pid: self.pid,
            lifetime: self.lifetime.clone(),
        }
    }
}

/// Identifies a launched session without owning its streams
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub pid: ProcessId,
    pub lifetime: Arc<SessionLifetime>,
}

/// Launches the display process and tracks its lifetime
pub struct ProcessSupervisor<M> {
    manager: Arc<M>,
}

impl<M: ProcessManager + 'static> ProcessSupervisor<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    /// Start `executable` with the decimal window handle as its only argument.
    ///
    /// `on_exit` runs exactly once when the process ends, whatever the reason. Must be
    /// called from within a tokio runtime.
    pub async fn launch<F>(
        &self,
        executable: &Path,
        window: WindowHandle,
        on_exit: F,
    ) -> Result<DisplaySession, LaunchError>
    where
        F: FnOnce(&ProcessStatus) + Send + 'static,
    {
        let metadata = std::fs::metadata(executable).map_err(|source| {
            LaunchError::ExecutableNotFound {
                path: executable.to_path_buf(),
                source,
            }
        })?;
        if !metadata.is_file() {
            return Err(LaunchError::NotAFile(executable.to_path_buf()));
        }

        debug!(path = %executable.display(), %window, "Starting GUI process");

        let args = vec![window.to_string()];
        let mut child = self
            .manager
            .spawn_process(executable, &args)
            .await
            .map_err(|e| LaunchError::Spawn {
                path: executable.to_path_buf(),
                source: match e {
                    ProcessError::SpawnFailed(source) => source,
                    other => std::io::Error::other(other.to_string()),
                },
            })?;

        let stdio = match Self::take_stdio(&mut child) {
            Ok(stdio) => stdio,
            Err(e) => {
                // Never leave a process running that we cannot talk to
                let _ = child.start_kill();
                return Err(e);
            }
        };

        let Some(pid) = child.id().map(ProcessId::from) else {
            return Err(LaunchError::Spawn {
                path: executable.to_path_buf(),
                source: std::io::Error::other("process exited before it could be tracked"),
            });
        };

        info!(pid = %pid, path = %executable.display(), "Spawned GUI process");

        let lifetime = Arc::new(SessionLifetime::new());
        tokio::spawn(Self::watch_exit(child, pid, lifetime.clone(), on_exit));

        Ok(DisplaySession {
            pid,
            executable: executable.to_path_buf(),
            window,
            stdio: Some(stdio),
            lifetime,
        })
    }

    fn take_stdio(child: &mut Child) -> Result<SessionStdio, LaunchError> {
        Ok(SessionStdio {
            stdin: child
                .stdin
                .take()
                .ok_or(LaunchError::StdioUnavailable("input"))?,
            stdout: child
                .stdout
                .take()
                .ok_or(LaunchError::StdioUnavailable("output"))?,
            stderr: child
                .stderr
                .take()
                .ok_or(LaunchError::StdioUnavailable("error"))?,
        })
    }

    async fn watch_exit<F>(
        mut child: Child,
        pid: ProcessId,
        lifetime: Arc<SessionLifetime>,
        on_exit: F,
    ) where
        F: FnOnce(&ProcessStatus) + Send + 'static,
    {
        let status = match child.wait().await {
            Ok(status) => {
                if status.success() {
                    info!(pid = %pid, "GUI process exited");
                } else {
                    warn!(pid = %pid, %status, "GUI process exited with non-zero status");
                }
                ProcessStatus::Exited(status)
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Error waiting for GUI process");
                ProcessStatus::Failed(e.to_string())
            }
        };

        lifetime.mark_exited(status.clone());
        on_exit(&status);
    }

    /// Request termination of a session. Repeated calls and already-exited processes
    /// are no-ops.
    pub fn terminate(&self, ticket: &SessionTicket) -> TerminationResult {
        if ticket.lifetime.has_exited() {
            return TerminationResult::ProcessNotFound;
        }
        if ticket
            .lifetime
            .termination_requested
            .swap(true, Ordering::AcqRel)
        {
            return TerminationResult::Success;
        }

        debug!(pid = %ticket.pid, "Closing GUI process");
        let result = self.manager.force_kill(ticket.pid);
        match &result {
            TerminationResult::Success => {}
            TerminationResult::ProcessNotFound => {
                debug!(pid = %ticket.pid, "GUI process already gone");
            }
            other => {
                warn!(pid = %ticket.pid, result = ?other, "Failed to terminate GUI process");
            }
        }
        result
    }

    /// Whether the session's process is still running
    pub fn is_running(&self, ticket: &SessionTicket) -> bool {
        !ticket.lifetime.has_exited() && self.manager.is_alive(ticket.pid)
    }
}
