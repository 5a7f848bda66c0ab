//! Sequencing of a workout plan against the live session.
//!
//! The controller tracks which exercise and set the user is on, owns the rest
//! countdown and the transient GO banner, and derives which parts of the
//! workout screen are visible from the session flags.

use std::sync::mpsc::Receiver;

use crate::config::SessionTimings;
use crate::error::TransitionError;
use crate::plan::{ExerciseSet, WorkoutPlan};
use crate::rest::{RestTick, RestTimer};
use crate::session::{SessionEvent, SessionPhase, SessionState, SessionStore};
use crate::timer::OneShot;

/// Number of exercises shown at once: the current one plus upcoming ones
pub const EXERCISE_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutRunProgress {
    pub current_exercise_index: usize,
    pub current_set_number: u32,
}

impl Default for WorkoutRunProgress {
    fn default() -> Self {
        Self {
            current_exercise_index: 0,
            current_set_number: 1,
        }
    }
}

impl WorkoutRunProgress {
    /// Counts one completed set, moving to the next exercise once every set
    /// of the current one is done. The last exercise is never left.
    pub fn advance(&mut self, plan: &WorkoutPlan) {
        self.current_set_number += 1;
        let Some(exercise) = plan.exercise(self.current_exercise_index) else {
            return;
        };
        if self.current_set_number > exercise.sets_total
            && self.current_exercise_index + 1 < plan.len()
        {
            self.current_exercise_index += 1;
            self.current_set_number = 1;
        }
    }

    pub fn is_finished(&self, plan: &WorkoutPlan) -> bool {
        self.current_exercise_index + 1 >= plan.len()
            && plan
                .exercise(self.current_exercise_index)
                .is_some_and(|e| self.current_set_number > e.sets_total)
    }
}

/// Which parts of the workout screen are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub exercise_list: bool,
    pub rest_timer: bool,
    pub go_banner: bool,
    pub complete_set: bool,
    pub pause_options: bool,
}

#[derive(Debug)]
pub struct WorkoutController {
    plan: WorkoutPlan,
    timings: SessionTimings,
    progress: WorkoutRunProgress,
    events: Receiver<SessionEvent>,
    state: SessionState,
    rest: RestTimer,
    go_banner: OneShot,
    show_exercise_list: bool,
    show_rest_timer: bool,
}

impl WorkoutController {
    pub fn new(store: &mut SessionStore, plan: WorkoutPlan, timings: SessionTimings) -> Self {
        Self {
            plan,
            timings,
            progress: WorkoutRunProgress::default(),
            events: store.subscribe(),
            state: store.state(),
            rest: RestTimer::new(&timings),
            go_banner: OneShot::new(),
            show_exercise_list: true,
            show_rest_timer: false,
        }
    }

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn progress(&self) -> WorkoutRunProgress {
        self.progress
    }

    pub fn rest(&self) -> &RestTimer {
        &self.rest
    }

    pub fn current_exercise(&self) -> Option<&ExerciseSet> {
        self.plan.exercise(self.progress.current_exercise_index)
    }

    /// Current exercise followed by the next few
    pub fn displayed_exercises(&self) -> &[ExerciseSet] {
        self.plan
            .window(self.progress.current_exercise_index, EXERCISE_WINDOW)
    }

    pub fn visibility(&self) -> Visibility {
        let state = self.state;
        let go_banner = self.go_banner.is_armed();

        Visibility {
            exercise_list: self.show_exercise_list && !go_banner,
            rest_timer: self.show_rest_timer && !state.is_stopped(),
            go_banner,
            complete_set: state.workout_started()
                && !state.is_resting()
                && !state.is_paused()
                && !state.is_stopped()
                && !go_banner,
            pause_options: state.is_paused() && state.is_resting(),
        }
    }

    /// User finished the current set: count it and start resting.
    pub fn complete_set(
        &mut self,
        store: &mut SessionStore,
        now_ms: u64,
    ) -> Result<(), TransitionError> {
        self.sync(store, now_ms);
        if self.go_banner.is_armed() {
            tracing::debug!("Complete set ignored while GO banner is shown");
            return Ok(());
        }

        store.complete_set()?;
        self.progress.advance(&self.plan);
        tracing::info!(
            exercise = self.progress.current_exercise_index,
            set = self.progress.current_set_number,
            "Set completed, now resting"
        );
        self.sync(store, now_ms);
        Ok(())
    }

    /// Pause option: resume and keep counting down the rest interval
    pub fn continue_with_rest(
        &mut self,
        store: &mut SessionStore,
        now_ms: u64,
    ) -> Result<(), TransitionError> {
        let phase = store.phase();
        if phase != (SessionPhase::Paused { during_rest: true }) {
            return Err(TransitionError::InvalidTransition {
                operation: "continue rest",
                phase,
            });
        }
        store.resume_workout()?;
        self.show_rest_timer = true;
        self.sync(store, now_ms);
        Ok(())
    }

    /// Pause option: resume and end the rest interval immediately
    pub fn skip_rest(&mut self, store: &mut SessionStore, now_ms: u64) -> Result<(), TransitionError> {
        store.skip_rest()?;
        self.sync(store, now_ms);
        Ok(())
    }

    /// Applies session transitions observed since the last call.
    pub fn sync(&mut self, store: &SessionStore, now_ms: u64) {
        while let Ok(event) = self.events.try_recv() {
            self.on_event(event, now_ms);
        }
        self.state = store.state();
    }

    pub fn on_tick(&mut self, store: &mut SessionStore, now_ms: u64) -> RestTick {
        self.sync(store, now_ms);

        let tick = self.rest.on_tick(store, now_ms);
        if tick.completed {
            self.sync(store, now_ms);
        }

        if self.go_banner.poll(now_ms) {
            self.show_rest_timer = false;
            self.show_exercise_list = true;
        }

        tick
    }

    fn on_event(&mut self, event: SessionEvent, now_ms: u64) {
        let SessionEvent {
            previous, state, ..
        } = event;
        self.state = state;

        if state.is_stopped() {
            self.reset();
            return;
        }

        if state.is_resting() && !previous.is_resting() {
            self.go_banner.cancel();
            self.show_rest_timer = true;
            self.show_exercise_list = false;
            self.rest.begin(now_ms);
            return;
        }

        if previous.is_paused() && !state.is_paused() && state.is_resting() {
            self.rest.resume(now_ms);
            return;
        }

        if previous.is_resting() && !state.is_resting() {
            self.rest.cancel();
            if state.rest_completed {
                self.show_exercise_list = false;
                self.go_banner.start(now_ms, self.timings.go_banner_ms);
            } else {
                self.show_rest_timer = false;
                self.show_exercise_list = true;
            }
        }
    }

    fn reset(&mut self) {
        self.progress = WorkoutRunProgress::default();
        self.rest.cancel();
        self.go_banner.cancel();
        self.show_rest_timer = false;
        self.show_exercise_list = true;
    }
}
