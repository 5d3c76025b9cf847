//! Windows process management and window-creation hook for the splash bridge

#[cfg(windows)]
mod win_event_hook;
#[cfg(windows)]
mod windows_process_manager;

#[cfg(windows)]
pub use win_event_hook::WinEventHookSource;
#[cfg(windows)]
pub use windows_process_manager::WindowsProcessManager;

/// Windows-specific process manager factory
#[cfg(windows)]
pub struct WindowsProcessManagerFactory;

#[cfg(windows)]
impl splash_bridge_core::ProcessManagerFactory for WindowsProcessManagerFactory {
    type Manager = WindowsProcessManager;

    fn create_process_manager() -> WindowsProcessManager {
        use splash_bridge_core::ProcessManager;
        WindowsProcessManager::new()
    }

    fn platform_name() -> &'static str {
        "Windows"
    }
}
