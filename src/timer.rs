/// A single logical timer that owns at most one live deadline.
///
/// `start` replaces any running deadline, `cancel` is idempotent, and `poll`
/// reports expiry exactly once per `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneShot {
    deadline_ms: Option<u64>,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: u64, duration_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(duration_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Milliseconds left before the deadline, `None` when not armed
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.deadline_ms.map(|d| d.saturating_sub(now_ms))
    }

    /// Returns true once when the deadline has been reached, then disarms.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}
