use splash_bridge_core::ProcessManagerFactory;

#[cfg(not(any(unix, windows)))]
compile_error!("Unsupported platform: only Unix and Windows are currently supported");

/// Process manager of the platform this crate is built for
#[cfg(unix)]
pub type PlatformProcessManager = splash_bridge_unix::UnixProcessManager;
#[cfg(windows)]
pub type PlatformProcessManager = splash_bridge_windows::WindowsProcessManager;

/// Window-creation source of the platform. Without an OS hook the host announces
/// its windows itself.
#[cfg(windows)]
pub type PlatformWindowSource = splash_bridge_windows::WinEventHookSource;
#[cfg(not(windows))]
pub type PlatformWindowSource = splash_bridge_core::ManualWindowSource;

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformProcessManagerFactory;

impl ProcessManagerFactory for PlatformProcessManagerFactory {
    type Manager = PlatformProcessManager;

    fn create_process_manager() -> Self::Manager {
        #[cfg(unix)]
        return splash_bridge_unix::UnixProcessManagerFactory::create_process_manager();

        #[cfg(windows)]
        return splash_bridge_windows::WindowsProcessManagerFactory::create_process_manager();
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return splash_bridge_unix::UnixProcessManagerFactory::platform_name();

        #[cfg(windows)]
        return splash_bridge_windows::WindowsProcessManagerFactory::platform_name();
    }
}
