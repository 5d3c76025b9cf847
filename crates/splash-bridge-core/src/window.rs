use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::SplashError;

/// Opaque OS identifier of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl std::fmt::Display for WindowHandle {
    /// Decimal form, as passed on the display process command line
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WindowHandle {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<isize>().map(WindowHandle)
    }
}

/// Size the host window is brought to once it appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
}

/// A window-creation notification, already resolved to its owner and class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCreated {
    pub handle: WindowHandle,
    pub owner_pid: u32,
    pub class_name: String,
}

/// What the event source should do after delivering an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookControl {
    Continue,
    Unhook,
}

/// Invoked on whichever thread the OS dispatches window events from
pub type WindowEventCallback = Arc<dyn Fn(&WindowCreated) -> HookControl + Send + Sync>;

/// A live window-creation observer
pub trait HookRegistration: Send + Sync {
    /// Stop observing. Safe to call more than once.
    fn unregister(&self);

    fn is_active(&self) -> bool;
}

/// Source of window-creation notifications and control over the host window
pub trait WindowEventSource: Send + Sync + 'static {
    /// Start delivering creation events for windows owned by `owner_pid`
    fn register(
        &self,
        owner_pid: u32,
        callback: WindowEventCallback,
    ) -> Result<Box<dyn HookRegistration>, SplashError>;

    /// Resize and restore a window. Must not block on the window's owning thread.
    fn restore_window(&self, handle: WindowHandle, geometry: WindowGeometry);
}

/// Filters creation events down to the host's main window and fires exactly once.
pub struct WindowHookMonitor<W> {
    owner_pid: u32,
    class_name: String,
    geometry: WindowGeometry,
    source: Arc<W>,
    fired: AtomicBool,
    host_window: OnceLock<WindowHandle>,
    ready: UnboundedSender<WindowHandle>,
}

impl<W: WindowEventSource> WindowHookMonitor<W> {
    pub fn new(
        owner_pid: u32,
        class_name: impl Into<String>,
        geometry: WindowGeometry,
        source: Arc<W>,
        ready: UnboundedSender<WindowHandle>,
    ) -> Self {
        Self {
            owner_pid,
            class_name: class_name.into(),
            geometry,
            source,
            fired: AtomicBool::new(false),
            host_window: OnceLock::new(),
            ready,
        }
    }

    /// Register with the event source. The returned registration is already inactive
    /// once the monitor has fired.
    pub fn start(self: &Arc<Self>) -> Result<Box<dyn HookRegistration>, SplashError> {
        let monitor = Arc::clone(self);
        let callback: WindowEventCallback = Arc::new(move |event| monitor.on_window_created(event));
        self.source.register(self.owner_pid, callback)
    }

    /// Handle one creation event. Only does non-blocking work.
    pub fn on_window_created(&self, event: &WindowCreated) -> HookControl {
        if self.fired.load(Ordering::Acquire) {
            return HookControl::Unhook;
        }
        if event.owner_pid != self.owner_pid || event.class_name != self.class_name {
            return HookControl::Continue;
        }
        if self.fired.swap(true, Ordering::AcqRel) {
            return HookControl::Unhook;
        }

        debug!(handle = %event.handle, class = %self.class_name, "Host window created");
        self.source.restore_window(event.handle, self.geometry);
        let _ = self.host_window.set(event.handle);

        if self.ready.send(event.handle).is_err() {
            warn!("Host window found but nobody is waiting for it anymore");
        }
        HookControl::Unhook
    }

    pub fn host_window(&self) -> Option<WindowHandle> {
        self.host_window.get().copied()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Window source fed by the host itself.
///
/// Used where no OS-level creation hook exists: the host calls [`ManualWindowSource::announce`]
/// when it creates a window.
#[derive(Default)]
pub struct ManualWindowSource {
    slot: Arc<Mutex<Option<ManualHook>>>,
    next_id: AtomicU64,
    restored: Mutex<Vec<(WindowHandle, WindowGeometry)>>,
}

struct ManualHook {
    id: u64,
    owner_pid: u32,
    callback: WindowEventCallback,
}

/// Clear the slot if it still holds hook `id`
fn release_slot(slot: &Mutex<Option<ManualHook>>, id: u64) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.as_ref().is_some_and(|hook| hook.id == id) {
        slot.take();
    }
}

struct ManualRegistration {
    slot: Arc<Mutex<Option<ManualHook>>>,
    id: u64,
}

impl HookRegistration for ManualRegistration {
    fn unregister(&self) {
        release_slot(&self.slot, self.id);
    }

    fn is_active(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|hook| hook.id == self.id)
    }
}

impl ManualWindowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a newly created window. Returns `true` when a registered observer saw it.
    pub fn announce(&self, event: WindowCreated) -> bool {
        let (id, callback) = {
            let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(hook) if hook.owner_pid == event.owner_pid => (hook.id, hook.callback.clone()),
                _ => return false,
            }
        };

        // Callback runs without the slot lock held
        if callback(&event) == HookControl::Unhook {
            release_slot(&self.slot, id);
        }
        true
    }

    pub fn is_registered(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Windows that were asked to restore so far
    pub fn restored_windows(&self) -> Vec<(WindowHandle, WindowGeometry)> {
        self.restored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WindowEventSource for ManualWindowSource {
    fn register(
        &self,
        owner_pid: u32,
        callback: WindowEventCallback,
    ) -> Result<Box<dyn HookRegistration>, SplashError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SplashError::hook_registration(
                "a window observer is already registered",
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *slot = Some(ManualHook {
            id,
            owner_pid,
            callback,
        });
        Ok(Box::new(ManualRegistration {
            slot: self.slot.clone(),
            id,
        }))
    }

    fn restore_window(&self, handle: WindowHandle, geometry: WindowGeometry) {
        debug!(%handle, width = geometry.width, height = geometry.height, "Restoring window");
        self.restored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, geometry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const GEOMETRY: WindowGeometry = WindowGeometry {
        width: 1280,
        height: 720,
    };

    fn created(handle: isize, owner_pid: u32, class_name: &str) -> WindowCreated {
        WindowCreated {
            handle: WindowHandle(handle),
            owner_pid,
            class_name: class_name.to_string(),
        }
    }

    #[test]
    fn test_handle_decimal_form() {
        assert_eq!(WindowHandle(132456).to_string(), "132456");
        assert_eq!("  987 ".parse::<WindowHandle>().unwrap(), WindowHandle(987));
        assert!("0x10".parse::<WindowHandle>().is_err());
    }

    #[test]
    fn test_monitor_fires_once() {
        let source = Arc::new(ManualWindowSource::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(WindowHookMonitor::new(
            42,
            "UnityWndClass",
            GEOMETRY,
            source.clone(),
            tx,
        ));

        assert_eq!(
            monitor.on_window_created(&created(1, 42, "UnityWndClass")),
            HookControl::Unhook
        );
        assert_eq!(
            monitor.on_window_created(&created(2, 42, "UnityWndClass")),
            HookControl::Unhook
        );

        assert_eq!(rx.try_recv().unwrap(), WindowHandle(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(monitor.host_window(), Some(WindowHandle(1)));
        assert_eq!(source.restored_windows(), vec![(WindowHandle(1), GEOMETRY)]);
    }

    #[test]
    fn test_monitor_filters_owner_and_class() {
        let source = Arc::new(ManualWindowSource::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = WindowHookMonitor::new(42, "UnityWndClass", GEOMETRY, source.clone(), tx);

        assert_eq!(
            monitor.on_window_created(&created(1, 7, "UnityWndClass")),
            HookControl::Continue
        );
        assert_eq!(
            monitor.on_window_created(&created(2, 42, "ConsoleWindowClass")),
            HookControl::Continue
        );
        // Class comparison is exact
        assert_eq!(
            monitor.on_window_created(&created(3, 42, "unitywndclass")),
            HookControl::Continue
        );

        assert!(!monitor.has_fired());
        assert!(rx.try_recv().is_err());
        assert!(source.restored_windows().is_empty());
    }

    #[test]
    fn test_manual_source_unhooks_after_match() {
        let source = Arc::new(ManualWindowSource::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(WindowHookMonitor::new(
            42,
            "UnityWndClass",
            GEOMETRY,
            source.clone(),
            tx,
        ));

        let registration = monitor.start().unwrap();
        assert!(registration.is_active());

        assert!(source.announce(created(5, 42, "Splash")));
        assert!(registration.is_active());
        assert!(source.announce(created(6, 42, "UnityWndClass")));
        assert!(!registration.is_active());

        // A later window with the same class reaches nobody
        assert!(!source.announce(created(7, 42, "UnityWndClass")));
        assert_eq!(rx.try_recv().unwrap(), WindowHandle(6));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_single_registration() {
        let source = ManualWindowSource::new();
        let callback: WindowEventCallback = Arc::new(|_| HookControl::Continue);
        let first = source.register(1, callback.clone()).unwrap();
        assert!(source.register(1, callback.clone()).is_err());

        first.unregister();
        first.unregister();
        assert!(!source.is_registered());
        assert!(source.register(1, callback).is_ok());
    }

    #[test]
    fn test_stale_registration_leaves_newer_hook() {
        let source = ManualWindowSource::new();
        let callback: WindowEventCallback = Arc::new(|_| HookControl::Continue);
        let first = source.register(1, callback.clone()).unwrap();
        first.unregister();
        let second = source.register(1, callback).unwrap();

        first.unregister();
        assert!(!first.is_active());
        assert!(second.is_active());
        assert!(source.is_registered());
    }

    #[test]
    fn test_unhook_after_reregistration_keeps_newer_hook() {
        let source = Arc::new(ManualWindowSource::new());
        let slot = Arc::new(Mutex::new(None::<Box<dyn HookRegistration>>));

        // The first observer swaps itself for a second one before asking to unhook
        let first: WindowEventCallback = Arc::new({
            let source = source.clone();
            let slot = slot.clone();
            move |_| {
                let mut slot = slot.lock().unwrap();
                if let Some(previous) = slot.take() {
                    previous.unregister();
                }
                let second: WindowEventCallback = Arc::new(|_| HookControl::Continue);
                *slot = Some(source.register(1, second).unwrap());
                HookControl::Unhook
            }
        });
        *slot.lock().unwrap() = Some(source.register(1, first).unwrap());

        assert!(source.announce(created(1, 1, "UnityWndClass")));
        assert!(source.is_registered());
        assert!(slot.lock().unwrap().as_ref().unwrap().is_active());
    }
}
