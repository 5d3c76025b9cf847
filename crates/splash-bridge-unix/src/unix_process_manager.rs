use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use splash_bridge_core::{
    ProcessError, ProcessId, ProcessLifecycle, ProcessManager, ProcessTermination,
    TerminationResult,
};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Unix process manager: tokio spawn with piped stdio, signals for termination
#[derive(Debug, Default)]
pub struct UnixProcessManager;

fn nix_pid(pid: ProcessId) -> Option<NixPid> {
    // Pids that do not fit in pid_t would address process groups or every process
    i32::try_from(pid.0)
        .ok()
        .filter(|raw| *raw > 0)
        .map(NixPid::from_raw)
}

#[async_trait]
impl ProcessLifecycle for UnixProcessManager {
    async fn spawn_process(&self, command: &Path, args: &[String]) -> Result<Child, ProcessError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so terminal signals aimed at the host do not hit the GUI first
        cmd.process_group(0);

        let child = cmd.spawn()?;

        if let Some(pid) = child.id() {
            info!(
                "Spawned Unix process: {} (PID: {}) with args: {:?}",
                command.display(),
                pid,
                args
            );
        }

        Ok(child)
    }
}

impl ProcessTermination for UnixProcessManager {
    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        let Some(target) = nix_pid(pid) else {
            return TerminationResult::Failed(format!("PID {pid} is out of range"));
        };

        match signal::kill(target, Signal::SIGKILL) {
            Ok(()) => {
                info!("Sent SIGKILL to process {}", pid.0);
                TerminationResult::Success
            }
            Err(Errno::ESRCH) => {
                debug!("Process {} not found (already terminated)", pid.0);
                TerminationResult::ProcessNotFound
            }
            Err(Errno::EPERM) => {
                warn!("Permission denied to kill process {}", pid.0);
                TerminationResult::AccessDenied
            }
            Err(e) => {
                warn!("Failed to send SIGKILL to process {}: {}", pid.0, e);
                TerminationResult::Failed(format!("SIGKILL failed: {e}"))
            }
        }
    }

    fn is_alive(&self, pid: ProcessId) -> bool {
        // Signal 0 only checks that the process exists
        nix_pid(pid).is_some_and(|target| match signal::kill(target, None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        })
    }
}

impl ProcessManager for UnixProcessManager {
    fn new() -> Self {
        debug!("Initializing Unix process manager");
        Self
    }
}
