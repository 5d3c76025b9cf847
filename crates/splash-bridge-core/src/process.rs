use async_trait::async_trait;
use std::path::Path;
use tokio::process::Child;

/// Unique identifier for a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a process
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessStatus {
    /// Process is currently running
    Running,
    /// Process exited with status information
    Exited(std::process::ExitStatus),
    /// Waiting on the process failed, its fate is unknown
    Failed(String),
}

/// Result of a process termination operation
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Process was successfully terminated
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Permission denied (insufficient privileges)
    AccessDenied,
    /// Operation failed with specific error message
    Failed(String),
}

impl TerminationResult {
    /// Whether the process is known to be gone after this result
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            TerminationResult::Success | TerminationResult::ProcessNotFound
        )
    }
}

/// Error types for process operations
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),
    #[error("Other error: {0}")]
    Other(String),
}

/// Spawning side of a platform process manager
#[async_trait]
pub trait ProcessLifecycle: Send + Sync {
    /// Spawn `command` with `args`, with stdin, stdout and stderr all piped.
    async fn spawn_process(&self, command: &Path, args: &[String]) -> Result<Child, ProcessError>;
}

/// Termination side of a platform process manager.
///
/// These calls are synchronous so teardown can run from any thread, including ones
/// without an async runtime.
pub trait ProcessTermination: Send + Sync {
    /// Forcibly terminate a single process
    fn force_kill(&self, pid: ProcessId) -> TerminationResult;

    /// Check whether a process with this id still exists
    fn is_alive(&self, pid: ProcessId) -> bool;
}

/// Process manager that combines lifecycle and termination
pub trait ProcessManager: ProcessLifecycle + ProcessTermination {
    /// Create a new process manager instance
    fn new() -> Self
    where
        Self: Sized;
}

/// Factory trait for creating platform-specific process managers
pub trait ProcessManagerFactory {
    /// The type of process manager this factory creates
    type Manager: ProcessManager;

    /// Create a process manager for the current platform
    fn create_process_manager() -> Self::Manager;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_result_settled() {
        assert!(TerminationResult::Success.is_settled());
        assert!(TerminationResult::ProcessNotFound.is_settled());
        assert!(!TerminationResult::AccessDenied.is_settled());
        assert!(!TerminationResult::Failed("boom".into()).is_settled());
    }

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId::from(4242).to_string(), "4242");
    }
}
