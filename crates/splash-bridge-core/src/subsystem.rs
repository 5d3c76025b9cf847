use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info};

use crate::bridge::CommunicationBridge;
use crate::config::{SkipReason, SplashConfig};
use crate::error::SplashError;
use crate::forwarder::StatusForwardLayer;
use crate::process::{ProcessManager, ProcessStatus};
use crate::queue::StatusQueue;
use crate::sink::{LogSink, LogSlot};
use crate::state::{SplashState, StateCell};
use crate::supervisor::{ProcessSupervisor, SessionTicket};
use crate::teardown::{TeardownController, TeardownStep};
use crate::window::{
    HookRegistration, WindowEventSource, WindowGeometry, WindowHandle, WindowHookMonitor,
};

/// What `spawn_splash` did
#[derive(Debug)]
pub enum StartOutcome {
    /// Settings say no splash screen; nothing was started
    Skipped(SkipReason),
    /// Waiting for the host window to appear
    Monitoring,
    /// A previous call already started the subsystem
    AlreadyStarted,
    /// Start-up failed. Everything started so far has been torn down unless the
    /// error is a configuration problem.
    Failed(SplashError),
}

/// One splash screen for the lifetime of the host.
///
/// Cheap to clone; all clones drive the same subsystem.
pub struct SplashSubsystem<M, W> {
    inner: Arc<Inner<M, W>>,
}

impl<M, W> Clone for SplashSubsystem<M, W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<M, W> {
    config: SplashConfig,
    runtime: Handle,
    owner_pid: u32,
    supervisor: ProcessSupervisor<M>,
    source: Arc<W>,
    queue: Arc<StatusQueue>,
    forwarding: Arc<AtomicBool>,
    log: Arc<LogSlot>,
    state: StateCell,
    hook: OnceLock<Box<dyn HookRegistration>>,
    session: OnceLock<SessionTicket>,
    bridge: OnceLock<CommunicationBridge>,
    teardown: TeardownController,
}

impl<M, W> SplashSubsystem<M, W>
where
    M: ProcessManager + 'static,
    W: WindowEventSource,
{
    /// `runtime` runs the launch and bridge tasks; `sink` receives relayed GUI output.
    pub fn new(
        config: SplashConfig,
        manager: Arc<M>,
        source: Arc<W>,
        sink: Arc<dyn LogSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                runtime,
                owner_pid: std::process::id(),
                supervisor: ProcessSupervisor::new(manager),
                source,
                queue: Arc::new(StatusQueue::new()),
                forwarding: Arc::new(AtomicBool::new(false)),
                log: Arc::new(LogSlot::new(sink)),
                state: StateCell::new(),
                hook: OnceLock::new(),
                session: OnceLock::new(),
                bridge: OnceLock::new(),
                teardown: TeardownController::new(),
            }),
        }
    }

    /// Start watching for the host window. Never blocks and never panics; the display
    /// process is launched in the background once the window shows up.
    pub fn spawn_splash(&self) -> StartOutcome {
        let inner = &self.inner;

        if let Some(reason) = inner.config.skip_reason() {
            debug!(?reason, "Splash screen not started");
            return StartOutcome::Skipped(reason);
        }
        if let Err(e) = inner.config.validate() {
            error!(error = %e, "Failed to start GUI");
            return StartOutcome::Failed(e);
        }

        if !inner
            .state
            .advance(SplashState::Idle, SplashState::Monitoring)
        {
            return match inner.state.get() {
                SplashState::Terminated => StartOutcome::Failed(SplashError::invalid_state(
                    "splash subsystem has already been torn down",
                )),
                _ => StartOutcome::AlreadyStarted,
            };
        }

        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(WindowHookMonitor::new(
            inner.owner_pid,
            inner.config.target_window_class.clone(),
            WindowGeometry {
                width: inner.config.window_width,
                height: inner.config.window_height,
            },
            inner.source.clone(),
            ready_tx,
        ));

        let registration = match monitor.start() {
            Ok(registration) => registration,
            Err(e) => {
                error!(error = %e, "Failed to start GUI");
                inner.teardown();
                return StartOutcome::Failed(e);
            }
        };
        let _ = inner.hook.set(registration);
        if inner.teardown.is_done() {
            // Torn down while registering, the teardown step saw no hook
            if let Some(hook) = inner.hook.get() {
                hook.unregister();
            }
            return StartOutcome::Failed(SplashError::invalid_state(
                "splash subsystem was torn down during start-up",
            ));
        }

        inner.forwarding.store(true, Ordering::Release);
        debug!(
            pid = inner.owner_pid,
            class = %inner.config.target_window_class,
            "Waiting for host window"
        );

        inner
            .runtime
            .spawn(Inner::await_host_window(inner.clone(), ready_rx));
        StartOutcome::Monitoring
    }

    /// Queue a status line for the display process. Returns `false` after teardown.
    pub fn send_message(&self, text: &str) -> bool {
        self.inner.queue.enqueue(text)
    }

    /// Layer that feeds host log records to the display process
    pub fn log_forwarder(&self) -> StatusForwardLayer {
        StatusForwardLayer::new(&self.inner.queue, self.inner.forwarding.clone())
    }

    /// Stop everything. Safe from any thread, any number of times. Returns `true` for
    /// the call that actually performed the teardown.
    pub fn teardown(&self) -> bool {
        self.inner.teardown()
    }

    pub fn state(&self) -> SplashState {
        self.inner.state.get()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.teardown.is_done()
    }

    pub fn config(&self) -> &SplashConfig {
        &self.inner.config
    }

    pub fn queue(&self) -> &Arc<StatusQueue> {
        &self.inner.queue
    }

    pub fn window_source(&self) -> &Arc<W> {
        &self.inner.source
    }

    /// The launched display process, once there is one
    pub fn session(&self) -> Option<SessionTicket> {
        self.inner.session.get().cloned()
    }

    /// True when no bridge was started or all of its tasks have ended
    pub fn bridge_finished(&self) -> bool {
        self.inner
            .bridge
            .get()
            .is_none_or(CommunicationBridge::is_finished)
    }
}

impl<M, W> Inner<M, W>
where
    M: ProcessManager + 'static,
    W: WindowEventSource,
{
    async fn await_host_window(self: Arc<Self>, mut ready: UnboundedReceiver<WindowHandle>) {
        let Some(window) = ready.recv().await else {
            debug!("Window hook closed before the host window appeared");
            return;
        };

        if !self
            .state
            .advance(SplashState::Monitoring, SplashState::Launching)
        {
            return;
        }

        if let Err(e) = self.launch(window).await {
            error!(error = %e, "Failed to start GUI");
            self.teardown();
        }
    }

    async fn launch(self: &Arc<Self>, window: WindowHandle) -> Result<(), SplashError> {
        let executable = self.config.resolve_display_executable()?;
        info!(%window, path = %executable.display(), "Host window ready, starting GUI");

        let on_exit = {
            let inner = Arc::clone(self);
            move |_: &ProcessStatus| {
                inner.teardown();
            }
        };
        let mut session = self.supervisor.launch(&executable, window, on_exit).await?;
        let ticket = session.ticket();
        let _ = self.session.set(ticket.clone());

        if self.teardown.is_done()
            || !self
                .state
                .advance(SplashState::Launching, SplashState::Bridging)
        {
            debug!(pid = %ticket.pid, "Torn down while launching, closing GUI");
            self.supervisor.terminate(&ticket);
            return Ok(());
        }

        let stdio = session
            .take_stdio()
            .ok_or_else(|| SplashError::invalid_state("GUI process streams already taken"))?;
        let on_stop = {
            let inner = Arc::clone(self);
            move || {
                inner.teardown();
            }
        };
        let bridge = CommunicationBridge::start(
            stdio,
            session.lifetime().clone(),
            self.queue.clone(),
            self.log.clone(),
            self.config.poll_interval(),
            on_stop,
        );
        let _ = self.bridge.set(bridge);
        Ok(())
    }

    fn teardown(&self) -> bool {
        let previous = self.state.terminate();

        let steps = [
            TeardownStep::new("log forwarder", || {
                self.forwarding.store(false, Ordering::Release);
                Ok(())
            }),
            TeardownStep::new("window hook", || {
                if let Some(hook) = self.hook.get() {
                    hook.unregister();
                }
                Ok(())
            }),
            TeardownStep::new("status queue", || {
                self.queue.close();
                Ok(())
            }),
            TeardownStep::new("display process", || {
                let Some(ticket) = self.session.get() else {
                    return Ok(());
                };
                let result = self.supervisor.terminate(ticket);
                if result.is_settled() || !self.supervisor.is_running(ticket) {
                    return Ok(());
                }
                anyhow::bail!("could not terminate GUI process {}: {result:?}", ticket.pid)
            }),
            TeardownStep::new("log sink", || {
                self.log.release();
                Ok(())
            }),
        ];

        if !self.teardown.run(&steps) {
            return false;
        }
        debug!(from = %previous, "Splash subsystem torn down");
        true
    }
}
