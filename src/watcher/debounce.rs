//! Coalescing of change notifications into read passes.

/// Single in-flight flag plus a coalescing backlog counter.
///
/// A notification that arrives while a pass is running does not queue a pass
/// of its own; any number of them collapses into one owed pass. The backlog
/// must be consumed to zero before the gate reports idle again.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassGate {
    reading: bool,
    pending: u32,
}

impl PassGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change notification.
    ///
    /// Returns `true` when the caller should start a pass now, `false` when a
    /// pass is already running and the notification was folded into the
    /// backlog.
    pub fn notify(&mut self) -> bool {
        if self.reading {
            self.pending = 1;
            false
        } else {
            self.reading = true;
            true
        }
    }

    /// Mark the running pass as complete.
    ///
    /// Returns `true` when another pass is owed. Returns `false` once the
    /// backlog is drained, leaving the gate idle.
    pub fn finish_pass(&mut self) -> bool {
        if self.pending > 0 {
            self.pending -= 1;
            true
        } else {
            self.reading = false;
            false
        }
    }

    /// Forget the running pass and any backlog.
    pub fn reset(&mut self) {
        self.reading = false;
        self.pending = 0;
    }

    /// Whether a pass is in flight.
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    /// Passes owed after the current one.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_notification_starts_pass() {
        let mut gate = PassGate::new();
        assert!(gate.notify());
        assert!(gate.is_reading());
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn test_burst_collapses_into_one_extra_pass() {
        let mut gate = PassGate::new();
        assert!(gate.notify());
        for _ in 0..50 {
            assert!(!gate.notify());
        }
        assert_eq!(gate.pending(), 1);

        assert!(gate.finish_pass());
        assert!(gate.is_reading());
        assert!(!gate.finish_pass());
        assert!(!gate.is_reading());
    }

    #[test]
    fn test_idle_after_single_pass() {
        let mut gate = PassGate::new();
        assert!(gate.notify());
        assert!(!gate.finish_pass());
        assert_eq!(gate, PassGate::new());
    }

    #[test]
    fn test_reset_clears_backlog() {
        let mut gate = PassGate::new();
        gate.notify();
        gate.notify();
        gate.reset();
        assert!(!gate.is_reading());
        assert_eq!(gate.pending(), 0);
        assert!(gate.notify());
    }
}
