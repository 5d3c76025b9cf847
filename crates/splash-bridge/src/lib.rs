//! Splash screen bridge for hosts that are not async themselves.
//!
//! [`SplashScreen`] owns a small tokio runtime and one splash subsystem. The host calls
//! [`SplashScreen::spawn_splash`] early during start-up, feeds progress through
//! [`SplashScreen::send_message`] or the [`SplashScreen::log_forwarder`] layer, and calls
//! [`SplashScreen::teardown`] (or drops the screen) once it is done loading.

pub mod logging;
pub mod runner;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing::info;

pub use runner::platform_factory::{
    PlatformProcessManager, PlatformProcessManagerFactory, PlatformWindowSource,
};
pub use splash_bridge_core::*;

const RUNTIME_THREAD_NAME: &str = "splash-bridge";
const RUNTIME_WORKER_THREADS: usize = 2;

/// The splash screen of one host process
pub struct SplashScreen<M = PlatformProcessManager, W = PlatformWindowSource>
where
    M: ProcessManager + 'static,
    W: WindowEventSource,
{
    subsystem: SplashSubsystem<M, W>,
    runtime: Option<Runtime>,
}

impl SplashScreen {
    /// Splash screen using the platform's process manager and window source, relaying
    /// display process output through `tracing`.
    pub fn new(config: SplashConfig) -> Result<Self> {
        info!(
            platform = PlatformProcessManagerFactory::platform_name(),
            "Creating splash screen"
        );
        Self::with_parts(
            config,
            Arc::new(PlatformProcessManagerFactory::create_process_manager()),
            Arc::new(PlatformWindowSource::default()),
            Arc::new(TracingLogSink),
        )
    }
}

impl<M, W> SplashScreen<M, W>
where
    M: ProcessManager + 'static,
    W: WindowEventSource,
{
    /// Splash screen on its own runtime with explicit collaborators
    pub fn with_parts(
        config: SplashConfig,
        manager: Arc<M>,
        source: Arc<W>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(RUNTIME_WORKER_THREADS)
            .thread_name(RUNTIME_THREAD_NAME)
            .enable_all()
            .build()
            .context("Failed to build splash runtime")?;

        let subsystem =
            SplashSubsystem::new(config, manager, source, sink, runtime.handle().clone());
        Ok(Self {
            subsystem,
            runtime: Some(runtime),
        })
    }

    /// Splash screen driven by a runtime the host already has
    pub fn with_runtime(
        config: SplashConfig,
        manager: Arc<M>,
        source: Arc<W>,
        sink: Arc<dyn LogSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            subsystem: SplashSubsystem::new(config, manager, source, sink, runtime),
            runtime: None,
        }
    }

    /// Start watching for the host window. Returns immediately.
    pub fn spawn_splash(&self) -> StartOutcome {
        let outcome = self.subsystem.spawn_splash();
        if matches!(outcome, StartOutcome::Monitoring) {
            info!("Splash screen waiting for host window");
        }
        outcome
    }

    /// Queue a status line. Returns `false` once the splash screen is gone.
    pub fn send_message(&self, text: &str) -> bool {
        self.subsystem.send_message(text)
    }

    /// Layer to add to the host's subscriber so its log records reach the splash screen
    pub fn log_forwarder(&self) -> StatusForwardLayer {
        self.subsystem.log_forwarder()
    }

    /// Close the splash screen. Idempotent.
    pub fn teardown(&self) -> bool {
        self.subsystem.teardown()
    }

    pub fn state(&self) -> SplashState {
        self.subsystem.state()
    }

    pub fn window_source(&self) -> &Arc<W> {
        self.subsystem.window_source()
    }

    pub fn subsystem(&self) -> &SplashSubsystem<M, W> {
        &self.subsystem
    }
}

impl<M, W> Drop for SplashScreen<M, W>
where
    M: ProcessManager + 'static,
    W: WindowEventSource,
{
    fn drop(&mut self) {
        self.subsystem.teardown();
        if let Some(runtime) = self.runtime.take() {
            // Never block the host, which may itself be inside a runtime
            runtime.shutdown_background();
        }
    }
}
