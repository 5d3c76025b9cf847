use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::sink::fallback_report;

/// One best-effort cleanup action
pub struct TeardownStep<'a> {
    name: &'static str,
    action: Box<dyn Fn() -> anyhow::Result<()> + 'a>,
}

impl<'a> TeardownStep<'a> {
    pub fn new(name: &'static str, action: impl Fn() -> anyhow::Result<()> + 'a) -> Self {
        Self {
            name,
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Runs the cleanup sequence exactly once, whoever asks first.
///
/// Steps are independent: an error or a panic in one is reported on stderr and the
/// remaining steps still run. Never panics itself.
#[derive(Debug, Default)]
pub struct TeardownController {
    done: AtomicBool,
}

impl TeardownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call performed the teardown, `false` if it already happened
    pub fn run(&self, steps: &[TeardownStep<'_>]) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }

        for step in steps {
            match catch_unwind(AssertUnwindSafe(|| (step.action)())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    fallback_report(&format!("Teardown step '{}' failed: {e:#}", step.name))
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    fallback_report(&format!("Teardown step '{}' panicked: {reason}", step.name));
                }
            }
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_runs_once() {
        let controller = TeardownController::new();
        let count = AtomicUsize::new(0);
        let steps = [TeardownStep::new("count", || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })];

        assert!(!controller.is_done());
        assert!(controller.run(&steps));
        assert!(!controller.run(&steps));
        assert!(!controller.run(&[]));
        assert!(controller.is_done());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_steps_do_not_stop_the_rest() {
        let controller = TeardownController::new();
        let reached = AtomicUsize::new(0);
        let steps = [
            TeardownStep::new("error", || anyhow::bail!("queue already gone")),
            TeardownStep::new("panic", || panic!("sink exploded")),
            TeardownStep::new("last", || {
                reached.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];

        assert!(controller.run(&steps));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        assert_eq!(steps[2].name(), "last");
    }

    #[test]
    fn test_concurrent_callers_run_once() {
        let controller = Arc::new(TeardownController::new());
        let count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let controller = controller.clone();
                let count = count.clone();
                std::thread::spawn(move || {
                    let steps = [TeardownStep::new("count", || {
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })];
                    controller.run(&steps)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ran| *ran)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_call_is_noop() {
        let controller = TeardownController::new();
        let inner = AtomicBool::new(true);
        let steps = [TeardownStep::new("reenter", || {
            inner.store(controller.run(&[]), Ordering::SeqCst);
            Ok(())
        })];

        assert!(controller.run(&steps));
        assert!(!inner.load(Ordering::SeqCst));
    }
}
