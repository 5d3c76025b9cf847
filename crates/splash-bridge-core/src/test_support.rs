//! Process manager double shared by the unit tests of this crate.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::process::{Child, Command};

use crate::process::{
    ProcessError, ProcessId, ProcessLifecycle, ProcessManager, ProcessTermination,
    TerminationResult,
};

/// Runs a shell snippet in place of the requested executable and records kills.
pub struct FakeProcessManager {
    script: String,
    kill_for_real: bool,
    spawns: AtomicUsize,
    kills: Mutex<Vec<ProcessId>>,
}

impl Default for FakeProcessManager {
    fn default() -> Self {
        Self {
            script: "exit 0".to_string(),
            kill_for_real: false,
            spawns: AtomicUsize::new(0),
            kills: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProcessManager {
    /// Run `script` for every spawn and really kill processes on request
    pub fn running(script: &str) -> Self {
        Self {
            script: script.to_string(),
            kill_for_real: true,
            ..Default::default()
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> Vec<ProcessId> {
        self.kills.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLifecycle for FakeProcessManager {
    async fn spawn_process(
        &self,
        _command: &Path,
        _args: &[String],
    ) -> Result<Child, ProcessError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);

        #[cfg(unix)]
        let mut cmd = {
            let mut cmd = Command::new("/bin/sh");
            cmd.arg("-c").arg(&self.script);
            cmd
        };
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.script);
            cmd
        };

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd.spawn()?)
    }
}

impl ProcessTermination for FakeProcessManager {
    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        self.kills.lock().unwrap().push(pid);
        if self.kill_for_real {
            #[cfg(unix)]
            let status = std::process::Command::new("kill")
                .args(["-9", &pid.to_string()])
                .status();
            #[cfg(windows)]
            let status = std::process::Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .status();
            return match status {
                Ok(status) if status.success() => TerminationResult::Success,
                Ok(_) => TerminationResult::ProcessNotFound,
                Err(e) => TerminationResult::Failed(e.to_string()),
            };
        }
        TerminationResult::Success
    }

    fn is_alive(&self, _pid: ProcessId) -> bool {
        false
    }
}

impl ProcessManager for FakeProcessManager {
    fn new() -> Self {
        Self::default()
    }
}
