use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::queue::StatusQueue;

/// Records from targets with this prefix are produced by the bridge itself and never forwarded
pub const INTERNAL_TARGET_PREFIX: &str = "splash_bridge";

/// Feeds host log records into the status queue.
///
/// Inert until the subsystem activates it, and again after teardown.
#[derive(Clone)]
pub struct StatusForwardLayer {
    queue: Weak<StatusQueue>,
    active: Arc<AtomicBool>,
}

impl StatusForwardLayer {
    pub(crate) fn new(queue: &Arc<StatusQueue>, active: Arc<AtomicBool>) -> Self {
        Self {
            queue: Arc::downgrade(queue),
            active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<S: Subscriber> Layer<S> for StatusForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.is_active() {
            return;
        }
        let metadata = event.metadata();
        if metadata.target().starts_with(INTERNAL_TARGET_PREFIX) {
            return;
        }
        let Some(queue) = self.queue.upgrade() else {
            return;
        };

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        queue.enqueue(visitor.finish(metadata.level(), metadata.target()));
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: String,
}

impl RecordVisitor {
    fn finish(self, level: &tracing::Level, target: &str) -> String {
        format!("[{level}:{target}] {}{}", self.message, self.fields)
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
