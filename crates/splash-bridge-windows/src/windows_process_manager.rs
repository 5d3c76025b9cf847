use async_trait::async_trait;
use splash_bridge_core::{
    ProcessError, ProcessId, ProcessLifecycle, ProcessManager, ProcessTermination,
    TerminationResult,
};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED, ERROR_INVALID_PARAMETER, HANDLE};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE,
    TerminateProcess,
};

/// Keeps a console-subsystem display build from opening its own console window
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Exit code reported for a process that is still running
const STILL_ACTIVE: u32 = 259;

/// Windows process manager: tokio spawn with piped stdio, `TerminateProcess` for kills
#[derive(Debug, Default)]
pub struct WindowsProcessManager;

/// Owned process handle, closed on drop
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(pid: ProcessId, terminate: bool) -> windows::core::Result<Self> {
        let access = if terminate {
            PROCESS_TERMINATE | PROCESS_QUERY_LIMITED_INFORMATION
        } else {
            PROCESS_QUERY_LIMITED_INFORMATION
        };
        // SAFETY: plain handle acquisition, the result is owned by `Self`
        unsafe { OpenProcess(access, false, pid.0) }.map(Self)
    }

    fn still_active(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: `self.0` is a live handle opened with query rights
        unsafe { GetExitCodeProcess(self.0, &mut code) }.is_ok() && code == STILL_ACTIVE
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from `OpenProcess` and is closed exactly once
        let _ = unsafe { CloseHandle(self.0) };
    }
}

#[async_trait]
impl ProcessLifecycle for WindowsProcessManager {
    async fn spawn_process(&self, command: &Path, args: &[String]) -> Result<Child, ProcessError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .creation_flags(CREATE_NO_WINDOW)
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        if let Some(pid) = child.id() {
            info!(
                "Spawned Windows process: {} (PID: {}) with args: {:?}",
                command.display(),
                pid,
                args
            );
        }

        Ok(child)
    }
}

impl ProcessTermination for WindowsProcessManager {
    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        let handle = match ProcessHandle::open(pid, true) {
            Ok(handle) => handle,
            Err(e) if e.code() == ERROR_INVALID_PARAMETER.to_hresult() => {
                debug!("Process {} not found (already terminated)", pid.0);
                return TerminationResult::ProcessNotFound;
            }
            Err(e) if e.code() == E_ACCESSDENIED => {
                warn!("Permission denied to open process {}", pid.0);
                return TerminationResult::AccessDenied;
            }
            Err(e) => {
                warn!("Failed to open process {}: {}", pid.0, e);
                return TerminationResult::Failed(format!("OpenProcess failed: {e}"));
            }
        };

        if !handle.still_active() {
            debug!("Process {} already exited", pid.0);
            return TerminationResult::ProcessNotFound;
        }

        // SAFETY: `handle` was opened with PROCESS_TERMINATE
        match unsafe { TerminateProcess(handle.0, 1) } {
            Ok(()) => {
                info!("Terminated process {}", pid.0);
                TerminationResult::Success
            }
            // Exited between the liveness check and the kill
            Err(_) if !handle.still_active() => TerminationResult::ProcessNotFound,
            Err(e) if e.code() == E_ACCESSDENIED => {
                warn!("Permission denied to terminate process {}", pid.0);
                TerminationResult::AccessDenied
            }
            Err(e) => {
                warn!("Failed to terminate process {}: {}", pid.0, e);
                TerminationResult::Failed(format!("TerminateProcess failed: {e}"))
            }
        }
    }

    fn is_alive(&self, pid: ProcessId) -> bool {
        ProcessHandle::open(pid, false).is_ok_and(|handle| handle.still_active())
    }
}

impl ProcessManager for WindowsProcessManager {
    fn new() -> Self {
        debug!("Initializing Windows process manager");
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cmd_exe() -> std::path::PathBuf {
        let root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        Path::new(&root).join("System32").join("cmd.exe")
    }

    #[tokio::test]
    async fn test_spawn_passes_args_and_pipes() {
        let manager = WindowsProcessManager::new();
        let mut child = manager
            .spawn_process(&cmd_exe(), &["/C".into(), "exit 3".into()])
            .await
            .unwrap();

        assert!(child.stdin.is_some());
        assert!(child.stdout.is_some());
        assert_eq!(child.wait().await.unwrap().code(), Some(3));
    }

    #[tokio::test]
    async fn test_force_kill_running_process() {
        let manager = WindowsProcessManager::new();
        // Blocks reading the piped stdin until killed
        let mut child = manager
            .spawn_process(&cmd_exe(), &["/C".into(), "more".into()])
            .await
            .unwrap();
        let pid = ProcessId(child.id().unwrap());

        assert!(manager.is_alive(pid));
        assert_eq!(manager.force_kill(pid), TerminationResult::Success);

        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
        assert!(!manager.is_alive(pid));
    }

    #[test]
    fn test_current_process_is_alive() {
        let manager = WindowsProcessManager::new();
        assert!(manager.is_alive(ProcessId(std::process::id())));
    }
}
