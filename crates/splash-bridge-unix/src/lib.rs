//! Unix process management for the splash bridge

#[cfg(unix)]
mod unix_process_manager;

#[cfg(unix)]
pub use unix_process_manager::UnixProcessManager;

/// Unix process manager factory
#[cfg(unix)]
pub struct UnixProcessManagerFactory;

#[cfg(unix)]
impl splash_bridge_core::ProcessManagerFactory for UnixProcessManagerFactory {
    type Manager = UnixProcessManager;

    fn create_process_manager() -> UnixProcessManager {
        use splash_bridge_core::ProcessManager;
        UnixProcessManager::new()
    }

    fn platform_name() -> &'static str {
        "Unix"
    }
}
