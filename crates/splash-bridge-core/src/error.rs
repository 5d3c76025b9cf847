use std::path::PathBuf;
use thiserror::Error;

/// Core error types for splash subsystem operations
#[derive(Error, Debug)]
pub enum SplashError {
    #[error("Failed to register window hook: {0}")]
    HookRegistration(String),

    #[error("Failed to launch display process: {0}")]
    Launch(#[from] LaunchError),

    #[error("Bridge I/O failure: {0}")]
    BridgeIo(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SplashError {
    pub fn hook_registration(message: impl Into<String>) -> Self {
        Self::HookRegistration(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Reasons the display process could not be started
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Executable not found or inaccessible at {}", .path.display())]
    ExecutableNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Display executable path {} is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("Failed to spawn {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Standard {0} of the display process was not captured")]
    StdioUnavailable(&'static str),

    #[error("Could not resolve the display executable location: {0}")]
    Unresolved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SplashError::hook_registration("SetWinEventHook returned null");
        let display = format!("{error}");
        assert!(display.contains("Failed to register window hook"));
        assert!(display.contains("SetWinEventHook"));

        let error = SplashError::from(LaunchError::NotAFile(PathBuf::from("/tmp")));
        assert!(format!("{error}").contains("is not a file"));
    }

    #[test]
    fn test_bridge_io_keeps_source() {
        let error = SplashError::BridgeIo(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(format!("{error}").starts_with("Bridge I/O failure"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_launch_error_mentions_path() {
        let error = LaunchError::ExecutableNotFound {
            path: PathBuf::from("/opt/game/splash-gui"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let debug_str = format!("{error}");
        assert!(debug_str.contains("/opt/game/splash-gui"));
    }
}
