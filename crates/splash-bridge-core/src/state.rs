use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the splash subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SplashState {
    Idle = 0,
    Monitoring = 1,
    Launching = 2,
    Bridging = 3,
    Terminated = 4,
}

impl SplashState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SplashState::Idle,
            1 => SplashState::Monitoring,
            2 => SplashState::Launching,
            3 => SplashState::Bridging,
            _ => SplashState::Terminated,
        }
    }

    /// The only forward edge out of `self`, if any
    fn successor(self) -> Option<Self> {
        match self {
            SplashState::Idle => Some(SplashState::Monitoring),
            SplashState::Monitoring => Some(SplashState::Launching),
            SplashState::Launching => Some(SplashState::Bridging),
            SplashState::Bridging | SplashState::Terminated => None,
        }
    }
}

impl std::fmt::Display for SplashState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SplashState::Idle => "idle",
            SplashState::Monitoring => "monitoring",
            SplashState::Launching => "launching",
            SplashState::Bridging => "bridging",
            SplashState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Atomic holder of a [`SplashState`]. `Terminated` is absorbing.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl Default for StateCell {
    fn default() -> Self {
        Self(AtomicU8::new(SplashState::Idle as u8))
    }
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> SplashState {
        SplashState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to` if `to` is the next state and the cell still holds `from`
    pub fn advance(&self, from: SplashState, to: SplashState) -> bool {
        if from.successor() != Some(to) {
            return false;
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter `Terminated`. Returns the state that was left.
    pub fn terminate(&self) -> SplashState {
        SplashState::from_u8(self.0.swap(SplashState::Terminated as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), SplashState::Idle);
        assert!(cell.advance(SplashState::Idle, SplashState::Monitoring));
        assert!(cell.advance(SplashState::Monitoring, SplashState::Launching));
        assert!(cell.advance(SplashState::Launching, SplashState::Bridging));
        assert_eq!(cell.get(), SplashState::Bridging);
        assert_eq!(cell.terminate(), SplashState::Bridging);
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        let cell = StateCell::new();
        assert!(!cell.advance(SplashState::Idle, SplashState::Launching));
        assert!(!cell.advance(SplashState::Monitoring, SplashState::Launching));
        assert!(cell.advance(SplashState::Idle, SplashState::Monitoring));
        assert!(!cell.advance(SplashState::Monitoring, SplashState::Idle));
        assert_eq!(cell.get(), SplashState::Monitoring);
    }

    #[test]
    fn test_terminated_is_absorbing() {
        let cell = StateCell::new();
        cell.terminate();
        assert!(!cell.advance(SplashState::Idle, SplashState::Monitoring));
        assert!(!cell.advance(SplashState::Terminated, SplashState::Idle));
        assert_eq!(cell.terminate(), SplashState::Terminated);
        assert_eq!(cell.get(), SplashState::Terminated);
        assert_eq!(cell.get().to_string(), "terminated");
    }
}
