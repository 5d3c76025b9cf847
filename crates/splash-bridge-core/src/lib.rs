//! Platform-independent core of the splash screen bridge: the status queue and its line
//! protocol, the window hook monitor, the display process supervisor, the communication
//! bridge, the log forwarder and the teardown logic tying them together.

pub mod bridge;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod process;
pub mod protocol;
pub mod queue;
pub mod sink;
pub mod state;
pub mod subsystem;
pub mod supervisor;
pub mod teardown;
pub mod window;

#[cfg(test)]
mod test_support;

pub use bridge::{CommunicationBridge, OutboundStats};
pub use config::{SkipReason, SplashConfig, SplashConfigBuilder};
pub use error::{LaunchError, SplashError};
pub use forwarder::StatusForwardLayer;
pub use process::{
    ProcessError, ProcessId, ProcessLifecycle, ProcessManager, ProcessManagerFactory,
    ProcessStatus, ProcessTermination, TerminationResult,
};
pub use protocol::{StatusMessage, decode_line, encode_line};
pub use queue::StatusQueue;
pub use sink::{LogSink, TracingLogSink};
pub use state::SplashState;
pub use subsystem::{SplashSubsystem, StartOutcome};
pub use supervisor::{DisplaySession, ProcessSupervisor, SessionTicket};
pub use window::{
    HookControl, HookRegistration, ManualWindowSource, WindowCreated, WindowEventCallback,
    WindowEventSource, WindowGeometry, WindowHandle,
};
