//! Workout duration tracking and inactivity ceilings.
//!
//! The elapsed timer follows the session through its subscription: it starts
//! counting when the workout starts, freezes on pause, and on resume shifts
//! its start forward by the paused window so pauses never count toward the
//! duration. When the session stops it saves the finished workout through the
//! [`WorkoutRecorder`] and resets.
//!
//! Two ceilings guard against a forgotten session. While working out, the
//! primary ceiling runs; when it expires the session is paused and the final
//! ceiling starts. When that one expires too, the session is stopped and
//! saved. A pause or stop by the user cancels both; a start, resume or
//! completed set restarts the primary ceiling.

use std::sync::mpsc::Receiver;

use crate::config::SessionTimings;
use crate::format::elapsed_clock;
use crate::history::{NewWorkout, WorkoutRecorder};
use crate::session::{SessionEvent, SessionStore, Transition};
use crate::timer::OneShot;

#[derive(Debug)]
pub struct ElapsedTimer {
    workout_type: String,
    user_id: Option<String>,
    timings: SessionTimings,
    events: Receiver<SessionEvent>,
    /// Start of the workout shifted forward by every paused window
    start_ms: Option<u64>,
    /// Wall-clock start, reported in the saved record
    started_at_ms: Option<u64>,
    paused_at_ms: Option<u64>,
    duration_secs: u64,
    ticking: bool,
    primary_inactivity: OneShot,
    final_inactivity: OneShot,
    pending_auto_pause: bool,
}

impl ElapsedTimer {
    pub fn new(
        store: &mut SessionStore,
        workout_type: impl Into<String>,
        user_id: Option<String>,
        timings: SessionTimings,
    ) -> Self {
        Self {
            workout_type: workout_type.into(),
            user_id,
            timings,
            events: store.subscribe(),
            start_ms: None,
            started_at_ms: None,
            paused_at_ms: None,
            duration_secs: 0,
            ticking: false,
            primary_inactivity: OneShot::new(),
            final_inactivity: OneShot::new(),
            pending_auto_pause: false,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn display(&self) -> String {
        elapsed_clock(self.duration_secs)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn primary_inactivity_armed(&self) -> bool {
        self.primary_inactivity.is_armed()
    }

    pub fn final_inactivity_armed(&self) -> bool {
        self.final_inactivity.is_armed()
    }

    /// Time left before an auto-paused workout is stopped
    pub fn auto_stop_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.final_inactivity.remaining_ms(now_ms)
    }

    /// Applies every session transition observed since the last call.
    pub fn sync(&mut self, recorder: &dyn WorkoutRecorder, now_ms: u64) {
        while let Ok(event) = self.events.try_recv() {
            self.on_event(event, recorder, now_ms);
        }
    }

    /// One scheduler tick: refresh the duration, then check both ceilings.
    pub fn on_tick(
        &mut self,
        store: &mut SessionStore,
        recorder: &dyn WorkoutRecorder,
        now_ms: u64,
    ) {
        self.sync(recorder, now_ms);

        if self.ticking {
            self.refresh(now_ms);
        }

        if self.primary_inactivity.poll(now_ms) {
            tracing::info!("Primary inactivity timer ended, pausing workout");
            self.pending_auto_pause = true;
            if let Err(e) = store.pause_workout() {
                tracing::debug!("Inactivity pause ignored: {}", e);
                self.pending_auto_pause = false;
            }
            self.sync(recorder, now_ms);
        }

        if self.final_inactivity.poll(now_ms) {
            tracing::info!("Final inactivity timer ended, stopping workout");
            store.stop_workout();
            self.sync(recorder, now_ms);
        }
    }

    fn on_event(&mut self, event: SessionEvent, recorder: &dyn WorkoutRecorder, now_ms: u64) {
        let SessionEvent {
            transition,
            previous,
            state,
        } = event;

        if previous.workout_started() && !state.workout_started() {
            self.finish(recorder, now_ms);
            return;
        }

        if state.is_paused() && !previous.is_paused() {
            self.pause(now_ms);
            return;
        }

        if state.is_working_out() && !previous.is_working_out() {
            self.resume(now_ms);
            return;
        }

        if state.is_working_out()
            && matches!(transition, Transition::Start | Transition::CompleteSet)
        {
            self.arm_primary(now_ms);
        }
    }

    fn resume(&mut self, now_ms: u64) {
        match (self.start_ms, self.paused_at_ms.take()) {
            (None, _) => {
                tracing::info!("Workout started, starting timer");
                self.start_ms = Some(now_ms);
                self.started_at_ms = Some(now_ms);
                self.duration_secs = 0;
            }
            (Some(start), Some(paused_at)) => {
                let paused_for = now_ms.saturating_sub(paused_at);
                tracing::debug!(paused_for_ms = paused_for, "Resuming timer");
                self.start_ms = Some(start + paused_for);
            }
            (Some(_), None) => {}
        }
        self.ticking = true;
        self.refresh(now_ms);
        self.arm_primary(now_ms);
    }

    fn pause(&mut self, now_ms: u64) {
        if self.ticking {
            self.refresh(now_ms);
        }
        self.ticking = false;
        if self.start_ms.is_some() && self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(now_ms);
        }
        self.primary_inactivity.cancel();

        if std::mem::take(&mut self.pending_auto_pause) {
            tracing::info!(
                ceiling_ms = self.timings.final_inactivity_ms,
                "Starting final inactivity timer"
            );
            self.final_inactivity
                .start(now_ms, self.timings.final_inactivity_ms);
        } else {
            self.final_inactivity.cancel();
        }
    }

    fn finish(&mut self, recorder: &dyn WorkoutRecorder, now_ms: u64) {
        if self.ticking {
            self.refresh(now_ms);
        }
        self.save(recorder, now_ms);
        self.reset();
    }

    fn arm_primary(&mut self, now_ms: u64) {
        self.final_inactivity.cancel();
        self.primary_inactivity
            .start(now_ms, self.timings.primary_inactivity_ms);
    }

    fn refresh(&mut self, now_ms: u64) {
        if let Some(start) = self.start_ms {
            self.duration_secs = now_ms.saturating_sub(start) / 1000;
        }
    }

    fn save(&self, recorder: &dyn WorkoutRecorder, now_ms: u64) {
        let Some(started_at) = self.started_at_ms else {
            return;
        };
        let Some(user_id) = self.user_id.as_deref() else {
            tracing::debug!("No signed-in user, skipping workout save");
            return;
        };

        let result = NewWorkout::from_millis(
            started_at,
            now_ms,
            self.duration_secs,
            self.workout_type.clone(),
        )
        .and_then(|workout| recorder.add_workout(user_id, &workout));

        match result {
            Ok(id) => tracing::info!(%id, duration = self.duration_secs, "Workout data saved"),
            Err(e) => tracing::error!("Error saving workout data: {}", e),
        }
    }

    fn reset(&mut self) {
        self.start_ms = None;
        self.started_at_ms = None;
        self.paused_at_ms = None;
        self.duration_secs = 0;
        self.ticking = false;
        self.pending_auto_pause = false;
        self.primary_inactivity.cancel();
        self.final_inactivity.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryRecorder;
    use crate::kv::MemoryKeyValueStore;
    use crate::session::SessionPhase;

    const T0: u64 = 1_700_000_000_000;

    fn timings() -> SessionTimings {
        SessionTimings {
            primary_inactivity_ms: 30 * 60 * 1000,
            final_inactivity_ms: 30 * 60 * 1000,
            ..SessionTimings::default()
        }
    }

    fn setup() -> (SessionStore, ElapsedTimer, MemoryRecorder) {
        let mut store = SessionStore::mount(MemoryKeyValueStore::new());
        let timer = ElapsedTimer::new(
            &mut store,
            "basic-upper-body",
            Some("u1".to_string()),
            timings(),
        );
        (store, timer, MemoryRecorder::new())
    }

    #[test]
    fn counts_whole_seconds_while_working_out() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);

        timer.on_tick(&mut store, &rec, T0 + 1_999);
        assert_eq!(timer.duration_secs(), 1);

        timer.on_tick(&mut store, &rec, T0 + 65_000);
        assert_eq!(timer.display(), "01:05");
    }

    #[test]
    fn paused_time_is_excluded() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);
        timer.on_tick(&mut store, &rec, T0 + 10_000);

        store.pause_workout().unwrap();
        timer.sync(&rec, T0 + 10_000);
        timer.on_tick(&mut store, &rec, T0 + 25_000);
        assert_eq!(timer.duration_secs(), 10);
        assert!(!timer.is_ticking());

        store.resume_workout().unwrap();
        timer.sync(&rec, T0 + 30_000);
        timer.on_tick(&mut store, &rec, T0 + 35_000);

        assert_eq!(timer.duration_secs(), 15);
    }

    #[test]
    fn stop_saves_record_and_resets() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);
        timer.on_tick(&mut store, &rec, T0 + 42_000);

        store.stop_workout();
        timer.sync(&rec, T0 + 42_500);

        let saved = rec.list_workouts("u1").unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].duration, 42);
        assert_eq!(saved[0].workout_type, "basic-upper-body");
        assert_eq!(saved[0].start_time.timestamp_millis(), T0 as i64);
        assert_eq!(timer.duration_secs(), 0);
        assert!(!timer.primary_inactivity_armed());
    }

    #[test]
    fn stop_without_start_saves_nothing() {
        let (mut store, mut timer, rec) = setup();
        store.stop_workout();
        timer.sync(&rec, T0);
        assert_eq!(rec.save_attempts(), 0);
    }

    #[test]
    fn save_skipped_without_user() {
        let mut store = SessionStore::mount(MemoryKeyValueStore::new());
        let rec = MemoryRecorder::new();
        let mut timer = ElapsedTimer::new(&mut store, "basic-upper-body", None, timings());

        store.start_workout();
        timer.sync(&rec, T0);
        store.stop_workout();
        timer.sync(&rec, T0 + 5_000);

        assert_eq!(rec.save_attempts(), 0);
    }

    #[test]
    fn failed_save_is_swallowed() {
        let (mut store, mut timer, rec) = setup();
        rec.fail_writes(true);
        store.start_workout();
        timer.sync(&rec, T0);
        store.stop_workout();
        timer.sync(&rec, T0 + 5_000);

        assert_eq!(rec.save_attempts(), 1);
        assert!(store.state().is_stopped());
        assert_eq!(timer.duration_secs(), 0);
    }

    #[test]
    fn inactivity_pauses_then_stops() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);

        timer.on_tick(&mut store, &rec, T0 + 30 * 60 * 1000);
        assert_eq!(store.phase(), SessionPhase::Paused { during_rest: false });
        assert!(timer.final_inactivity_armed());
        assert!(!timer.primary_inactivity_armed());
        assert_eq!(rec.save_attempts(), 0);
        assert_eq!(
            timer.auto_stop_remaining_ms(T0 + 50 * 60 * 1000),
            Some(10 * 60 * 1000)
        );

        timer.on_tick(&mut store, &rec, T0 + 60 * 60 * 1000);
        assert!(store.state().is_stopped());
        assert_eq!(rec.save_attempts(), 1);
        let saved = rec.list_workouts("u1").unwrap();
        assert_eq!(saved[0].duration, 30 * 60);
    }

    #[test]
    fn user_resume_cancels_final_ceiling() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);
        timer.on_tick(&mut store, &rec, T0 + 30 * 60 * 1000);
        assert!(timer.final_inactivity_armed());

        store.resume_workout().unwrap();
        timer.sync(&rec, T0 + 31 * 60 * 1000);
        assert!(!timer.final_inactivity_armed());
        assert!(timer.primary_inactivity_armed());

        // The old final deadline must not fire
        timer.on_tick(&mut store, &rec, T0 + 60 * 60 * 1000 + 1);
        assert!(!store.state().is_stopped());
        assert_eq!(store.phase(), SessionPhase::Active);
    }

    #[test]
    fn manual_pause_cancels_both_ceilings() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);

        store.pause_workout().unwrap();
        timer.sync(&rec, T0 + 1_000);

        assert!(!timer.primary_inactivity_armed());
        assert!(!timer.final_inactivity_armed());
        timer.on_tick(&mut store, &rec, T0 + 3 * 60 * 60 * 1000);
        assert!(store.state().is_paused());
    }

    #[test]
    fn completing_a_set_rearms_primary_ceiling() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);

        store.complete_set().unwrap();
        timer.sync(&rec, T0 + 20 * 60 * 1000);

        timer.on_tick(&mut store, &rec, T0 + 30 * 60 * 1000);
        assert_eq!(store.phase(), SessionPhase::Resting);
    }

    #[test]
    fn restart_after_stop_counts_from_zero() {
        let (mut store, mut timer, rec) = setup();
        store.start_workout();
        timer.sync(&rec, T0);
        timer.on_tick(&mut store, &rec, T0 + 90_000);
        store.stop_workout();
        timer.sync(&rec, T0 + 90_000);

        store.start_workout();
        timer.sync(&rec, T0 + 100_000);
        timer.on_tick(&mut store, &rec, T0 + 103_000);

        assert_eq!(timer.duration_secs(), 3);
    }
}
