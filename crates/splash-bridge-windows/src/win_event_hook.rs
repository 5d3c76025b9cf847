//! Window-creation notifications through `SetWinEventHook`.
//!
//! The hook lives on a dedicated thread that pumps messages; out-of-context events are
//! delivered to that thread. The OS callback carries no user data, so the active
//! registration is kept in a process-wide slot.

use splash_bridge_core::{
    HookControl, HookRegistration, SplashError, WindowCreated, WindowEventCallback,
    WindowEventSource, WindowGeometry, WindowHandle,
};
use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use tracing::{debug, warn};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetClassNameW, GetMessageW, GetWindowThreadProcessId, MSG, PM_NOREMOVE,
    PeekMessageW, PostThreadMessageW, SW_RESTORE, SWP_ASYNCWINDOWPOS, SWP_NOMOVE, SWP_NOZORDER,
    SetWindowPos, ShowWindowAsync, TranslateMessage, WM_QUIT,
};

const EVENT_OBJECT_CREATE: u32 = 0x8000;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const OBJID_WINDOW: i32 = 0;
const CHILDID_SELF: i32 = 0;

/// Longest window class name Windows allows, plus the terminator
const MAX_CLASS_NAME: usize = 257;

struct ActiveHook {
    id: u64,
    owner_pid: u32,
    thread_id: u32,
    callback: WindowEventCallback,
}

static ACTIVE_HOOK: Mutex<Option<ActiveHook>> = Mutex::new(None);
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

fn active_hook() -> std::sync::MutexGuard<'static, Option<ActiveHook>> {
    ACTIVE_HOOK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn post_quit(thread_id: u32) {
    // SAFETY: posting to a thread id has no memory effects; failure means the thread is gone
    if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
        debug!(thread_id, error = %e, "Hook thread already stopped");
    }
}

fn window_class(hwnd: HWND) -> String {
    let mut buf = [0u16; MAX_CLASS_NAME];
    // SAFETY: `buf` is a valid, writable UTF-16 buffer
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    String::from_utf16_lossy(&buf[..len.max(0) as usize])
}

unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    if event != EVENT_OBJECT_CREATE || id_object != OBJID_WINDOW || id_child != CHILDID_SELF {
        return;
    }
    if hwnd.is_invalid() {
        return;
    }

    let (owner_pid, thread_id, callback) = match active_hook().as_ref() {
        Some(hook) => (hook.owner_pid, hook.thread_id, hook.callback.clone()),
        None => return,
    };

    let mut pid = 0u32;
    // SAFETY: `pid` outlives the call
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32)) };
    if pid != owner_pid {
        return;
    }

    let created = WindowCreated {
        handle: WindowHandle(hwnd.0 as isize),
        owner_pid: pid,
        class_name: window_class(hwnd),
    };

    // Unwinding out of an OS callback aborts the process
    match catch_unwind(AssertUnwindSafe(|| callback(&created))) {
        Ok(HookControl::Continue) => {}
        Ok(HookControl::Unhook) => post_quit(thread_id),
        Err(_) => {
            warn!("Window event callback panicked, removing hook");
            post_quit(thread_id);
        }
    }
}

/// Body of the hook thread: install, pump until `WM_QUIT`, uninstall
fn run_hook_thread(
    id: u64,
    owner_pid: u32,
    callback: WindowEventCallback,
    active: Arc<AtomicBool>,
    ready: mpsc::SyncSender<Result<u32, SplashError>>,
) {
    let mut msg = MSG::default();
    // SAFETY: forces creation of this thread's message queue so posted messages are kept
    let _ = unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE) };
    // SAFETY: no preconditions
    let thread_id = unsafe { GetCurrentThreadId() };

    {
        let mut slot = active_hook();
        if slot.is_some() {
            active.store(false, Ordering::Release);
            let _ = ready.send(Err(SplashError::hook_registration(
                "a window event hook is already installed",
            )));
            return;
        }
        *slot = Some(ActiveHook {
            id,
            owner_pid,
            thread_id,
            callback,
        });
    }

    // SAFETY: `win_event_proc` matches WINEVENTPROC and lives for the whole program
    let hook = unsafe {
        SetWinEventHook(
            EVENT_OBJECT_CREATE,
            EVENT_OBJECT_CREATE,
            None,
            Some(win_event_proc),
            owner_pid,
            0,
            WINEVENT_OUTOFCONTEXT,
        )
    };
    if hook.is_invalid() {
        release_slot(id);
        active.store(false, Ordering::Release);
        let _ = ready.send(Err(SplashError::hook_registration(
            "SetWinEventHook returned a null hook",
        )));
        return;
    }

    let _ = ready.send(Ok(thread_id));
    debug!(owner_pid, thread_id, "Window event hook installed");

    // SAFETY: `msg` is a valid MSG for the whole loop
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    // SAFETY: `hook` came from SetWinEventHook on this thread and is unhooked once
    let _ = unsafe { UnhookWinEvent(hook) };
    release_slot(id);
    active.store(false, Ordering::Release);
    debug!(owner_pid, "Window event hook removed");
}

fn release_slot(id: u64) {
    let mut slot = active_hook();
    if slot.as_ref().is_some_and(|hook| hook.id == id) {
        slot.take();
    }
}

struct WinEventRegistration {
    thread_id: u32,
    active: Arc<AtomicBool>,
}

impl HookRegistration for WinEventRegistration {
    fn unregister(&self) {
        if self.active.load(Ordering::Acquire) {
            post_quit(self.thread_id);
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Window source backed by `SetWinEventHook`. Only one registration may exist at a time.
#[derive(Debug, Default)]
pub struct WinEventHookSource;

impl WinEventHookSource {
    pub fn new() -> Self {
        Self
    }
}

impl WindowEventSource for WinEventHookSource {
    fn register(
        &self,
        owner_pid: u32,
        callback: WindowEventCallback,
    ) -> Result<Box<dyn HookRegistration>, SplashError> {
        let id = NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        std::thread::Builder::new()
            .name("splash-win-event-hook".into())
            .spawn({
                let active = active.clone();
                move || run_hook_thread(id, owner_pid, callback, active, ready_tx)
            })
            .map_err(|e| {
                SplashError::hook_registration(format!("failed to start hook thread: {e}"))
            })?;

        let thread_id = ready_rx.recv().map_err(|_| {
            SplashError::hook_registration("hook thread exited before installing the hook")
        })??;

        Ok(Box::new(WinEventRegistration { thread_id, active }))
    }

    fn restore_window(&self, handle: WindowHandle, geometry: WindowGeometry) {
        let hwnd = HWND(handle.0 as *mut c_void);
        let width = i32::try_from(geometry.width).unwrap_or(i32::MAX);
        let height = i32::try_from(geometry.height).unwrap_or(i32::MAX);

        // Both calls are asynchronous so the event thread never waits on the window's owner
        // SAFETY: the handle is only passed through to the OS, which validates it
        unsafe {
            if let Err(e) = SetWindowPos(
                hwnd,
                None,
                0,
                0,
                width,
                height,
                SWP_NOMOVE | SWP_NOZORDER | SWP_ASYNCWINDOWPOS,
            ) {
                warn!(%handle, error = %e, "Failed to resize host window");
            }
            let _ = ShowWindowAsync(hwnd, SW_RESTORE);
        }
        debug!(%handle, width, height, "Restored host window");
    }
}
