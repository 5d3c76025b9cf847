use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LaunchError, SplashError};

/// File name of the display executable when no explicit path is configured
pub const DEFAULT_DISPLAY_EXECUTABLE: &str = "splash-gui";

/// Window class of the host's main window
pub const DEFAULT_TARGET_WINDOW_CLASS: &str = "UnityWndClass";

/// Why `spawn_splash` returned without starting anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The `enabled` setting is off
    Disabled,
    /// `only_no_console` is set and the host's logging console is enabled
    ConsoleActive,
}

/// Settings consulted once when the splash subsystem starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into), default)]
pub struct SplashConfig {
    /// Display a splash screen with information about load progress on start-up
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Only display the splash screen if the logging console is turned off
    #[serde(default = "default_only_no_console")]
    pub only_no_console: bool,

    /// State of the host's console setting, `None` when the host has no such entry
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub console_enabled: Option<bool>,

    /// Explicit display executable; resolved next to the host executable when absent
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub display_executable: Option<PathBuf>,

    #[serde(default = "default_target_window_class")]
    pub target_window_class: String,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Pause between two drains of the status queue (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            only_no_console: default_only_no_console(),
            console_enabled: None,
            display_executable: None,
            target_window_class: default_target_window_class(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SplashConfig {
    pub fn builder() -> SplashConfigBuilder {
        SplashConfigBuilder::default()
    }

    /// Parse a configuration document, filling in defaults for missing keys
    pub fn from_json_str(json: &str) -> Result<Self, SplashError> {
        let config: SplashConfig = serde_json::from_str(json)
            .map_err(|e| SplashError::configuration(format!("Invalid splash config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), SplashError> {
        if self.target_window_class.is_empty() {
            return Err(SplashError::configuration(
                "target_window_class cannot be empty",
            ));
        }

        if self.window_width == 0 || self.window_height == 0 {
            return Err(SplashError::configuration(
                "window_width and window_height must be non-zero",
            ));
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > 10_000 {
            return Err(SplashError::configuration(
                "poll_interval_ms must be between 1 and 10000",
            ));
        }

        Ok(())
    }

    /// Decide whether the splash screen should be shown at all
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if !self.enabled {
            return Some(SkipReason::Disabled);
        }

        if self.only_no_console && self.console_enabled == Some(true) {
            return Some(SkipReason::ConsoleActive);
        }

        None
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Locate the display executable: the configured path, else the default file name
    /// next to the running host executable.
    pub fn resolve_display_executable(&self) -> Result<PathBuf, LaunchError> {
        if let Some(path) = &self.display_executable {
            return Ok(path.clone());
        }

        let host = std::env::current_exe().map_err(|e| LaunchError::Unresolved(e.to_string()))?;
        let dir = host
            .parent()
            .ok_or_else(|| LaunchError::Unresolved(format!("{} has no parent", host.display())))?;
        Ok(default_executable_in(dir))
    }
}

/// Path of the default display executable inside `dir`
pub fn default_executable_in(dir: &Path) -> PathBuf {
    dir.join(format!(
        "{DEFAULT_DISPLAY_EXECUTABLE}{}",
        std::env::consts::EXE_SUFFIX
    ))
}

// Default value functions for serde
fn default_enabled() -> bool {
    true
}
fn default_only_no_console() -> bool {
    !cfg!(debug_assertions)
}
fn default_target_window_class() -> String {
    DEFAULT_TARGET_WINDOW_CLASS.to_string()
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_poll_interval_ms() -> u64 {
    150
}
