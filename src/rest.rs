use crate::config::SessionTimings;
use crate::format::rest_clock;
use crate::session::SessionStore;

/// What changed during one rest tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestTick {
    /// The countdown just crossed the warning threshold
    pub blink_started: bool,
    /// The countdown reached zero; reported once per interval
    pub completed: bool,
}

/// Countdown for a single rest interval.
///
/// Counts down in whole seconds while the session is resting. Pausing or
/// stopping suspends the countdown without resetting it. On reaching zero
/// it signals `complete_rest` to the session exactly once.
#[derive(Debug, Clone)]
pub struct RestTimer {
    interval_ms: u64,
    warning_ms: u64,
    remaining_ms: u64,
    /// Time of the last whole-second step; `None` while suspended
    anchor_ms: Option<u64>,
    running: bool,
    blinking: bool,
    blink_starts: u32,
    completed: bool,
}

impl RestTimer {
    pub fn new(timings: &SessionTimings) -> Self {
        Self {
            interval_ms: timings.rest_interval_ms,
            warning_ms: timings.rest_warning_ms,
            remaining_ms: timings.rest_interval_ms,
            anchor_ms: None,
            running: false,
            blinking: false,
            blink_starts: 0,
            completed: false,
        }
    }

    /// Enters a fresh rest interval.
    pub fn begin(&mut self, now_ms: u64) {
        self.remaining_ms = self.interval_ms;
        self.anchor_ms = Some(now_ms);
        self.running = true;
        self.blinking = false;
        self.blink_starts = 0;
        self.completed = false;
    }

    /// Continues a suspended countdown from `now_ms`.
    pub fn resume(&mut self, now_ms: u64) {
        if self.running && !self.completed {
            self.anchor_ms = Some(now_ms);
        }
    }

    pub fn cancel(&mut self) {
        self.running = false;
        self.anchor_ms = None;
        self.blinking = false;
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn display(&self) -> String {
        rest_clock(self.remaining_ms)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    pub fn blink_starts(&self) -> u32 {
        self.blink_starts
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn on_tick(&mut self, store: &mut SessionStore, now_ms: u64) -> RestTick {
        let mut tick = RestTick::default();
        if !self.running || self.completed {
            return tick;
        }

        let state = store.state();
        if state.is_paused() || state.is_stopped() || !state.is_resting() {
            self.anchor_ms = None;
            return tick;
        }

        let Some(anchor) = self.anchor_ms else {
            // Resuming from a suspension: count from here
            self.anchor_ms = Some(now_ms);
            return tick;
        };

        let steps = now_ms.saturating_sub(anchor) / 1000;
        if steps == 0 {
            return tick;
        }
        self.anchor_ms = Some(anchor + steps * 1000);
        self.remaining_ms = self.remaining_ms.saturating_sub(steps * 1000);

        if !self.blinking && self.remaining_ms <= self.warning_ms {
            self.blinking = true;
            self.blink_starts += 1;
            tick.blink_started = true;
        }

        if self.remaining_ms == 0 {
            self.completed = true;
            self.running = false;
            self.anchor_ms = None;
            if let Err(e) = store.complete_rest() {
                tracing::debug!("Rest completion ignored: {}", e);
            }
            tick.completed = true;
        }

        tick
    }
}
