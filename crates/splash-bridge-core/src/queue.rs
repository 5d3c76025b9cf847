use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::StatusMessage;

const INITIAL_CAPACITY: usize = 10;

/// Unbounded FIFO of status lines shared by any number of producers and the bridge.
///
/// The internal mutex is only ever held for the duration of a push, a swap or a clear,
/// never across I/O.
pub struct StatusQueue {
    messages: Mutex<VecDeque<StatusMessage>>,
    closed: AtomicBool,
}

impl Default for StatusQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusQueue {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(INITIAL_CAPACITY)),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<StatusMessage>> {
        // A panicking producer cannot leave a VecDeque half-pushed
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message. Returns `false` when the queue has been released.
    pub fn enqueue(&self, message: impl Into<StatusMessage>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let message = message.into();
        let mut messages = self.lock();
        // Re-check under the lock so nothing lands after `close` has cleared
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        messages.push_back(message);
        true
    }

    /// Take every message queued so far, oldest first
    pub fn drain(&self) -> Vec<StatusMessage> {
        let mut messages = self.lock();
        messages.drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clear, give the buffer back and refuse further messages
    pub fn close(&self) {
        let mut messages = self.lock();
        self.closed.store(true, Ordering::Release);
        messages.clear();
        messages.shrink_to_fit();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
