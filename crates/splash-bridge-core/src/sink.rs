use std::sync::{Arc, PoisonError, RwLock};
use tracing::Level;

/// Target used for every line relayed from the display process
pub const GUI_LOG_TARGET: &str = "splash_bridge::gui";

/// The host's logging sink: accepts (level, text) pairs
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, text: &str);
}

/// Emits relayed lines as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: Level, text: &str) {
        match level {
            Level::ERROR => tracing::error!(target: GUI_LOG_TARGET, "{text}"),
            Level::WARN => tracing::warn!(target: GUI_LOG_TARGET, "{text}"),
            Level::INFO => tracing::info!(target: GUI_LOG_TARGET, "{text}"),
            Level::DEBUG => tracing::debug!(target: GUI_LOG_TARGET, "{text}"),
            Level::TRACE => tracing::trace!(target: GUI_LOG_TARGET, "{text}"),
        }
    }
}

/// Last-resort output once no log sink is left
pub fn fallback_report(text: &str) {
    eprintln!("[splash] {text}");
}

/// Most verbose level still reported once the sink is released
const FALLBACK_MAX_LEVEL: Level = Level::WARN;

/// Holds the log sink until teardown releases it
pub struct LogSlot {
    sink: RwLock<Option<Arc<dyn LogSink>>>,
}

impl LogSlot {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink: RwLock::new(Some(sink)),
        }
    }

    /// Forward to the sink. Once released, warnings and errors go to the fallback
    /// channel and everything else is dropped.
    pub fn log(&self, level: Level, text: &str) {
        let sink = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sink {
            Some(sink) => sink.log(level, text),
            None if Self::reaches_fallback(level) => fallback_report(text),
            None => {}
        }
    }

    fn reaches_fallback(level: Level) -> bool {
        level <= FALLBACK_MAX_LEVEL
    }

    pub fn release(&self) {
        self.sink
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_released(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingSink;
    use super::*;

    #[test]
    fn test_slot_forwards_until_released() {
        let sink = Arc::new(RecordingSink::default());
        let slot = LogSlot::new(sink.clone());

        slot.log(Level::DEBUG, "[GUI] hello");
        slot.release();
        slot.log(Level::ERROR, "[GUI] lost to stderr");

        assert!(slot.is_released());
        assert_eq!(sink.lines(), vec![(Level::DEBUG, "[GUI] hello".to_string())]);

        slot.release();
        assert!(slot.is_released());
    }

    #[test]
    fn test_released_slot_reports_only_problems() {
        assert!(LogSlot::reaches_fallback(Level::ERROR));
        assert!(LogSlot::reaches_fallback(Level::WARN));
        assert!(!LogSlot::reaches_fallback(Level::INFO));
        assert!(!LogSlot::reaches_fallback(Level::DEBUG));
        assert!(!LogSlot::reaches_fallback(Level::TRACE));
    }
}
