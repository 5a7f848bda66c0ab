//! Workout session state machine.
//!
//! [`SessionStore`] is the single owner of the session lifecycle. Every
//! transition mutates the in-memory [`SessionState`], persists a
//! [`SessionFlags`] snapshot through the [`KeyValueStore`] on a best-effort
//! basis, and notifies subscribers with a [`SessionEvent`].
//!
//! Lifecycle: `Idle -> Active -> Resting -> Active -> ... -> Stopped`, with
//! `Paused` reachable from both `Active` and `Resting`. A stopped session
//! stays `Stopped` until the next `start_workout`.

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, TransitionError};
use crate::kv::{KeyValueStore, COMPLETED_WORKOUT_KEY, SESSION_STATE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    /// Paused; `during_rest` remembers whether a rest interval was running
    Paused { during_rest: bool },
    Resting,
    Stopped,
}

/// Current lifecycle phase plus the rest-completed edge flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub rest_completed: bool,
}

impl SessionState {
    pub fn workout_started(&self) -> bool {
        !matches!(self.phase, SessionPhase::Idle | SessionPhase::Stopped)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, SessionPhase::Paused { .. })
    }

    pub fn is_working_out(&self) -> bool {
        matches!(self.phase, SessionPhase::Active | SessionPhase::Resting)
    }

    pub fn is_resting(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Resting | SessionPhase::Paused { during_rest: true }
        )
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == SessionPhase::Stopped
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags {
            workout_started: self.workout_started(),
            is_paused: self.is_paused(),
            is_stopped: self.is_stopped(),
            is_working_out: self.is_working_out(),
            is_resting: self.is_resting(),
            rest_completed: self.rest_completed,
        }
    }

    /// Maps a stored flag set back onto a phase.
    ///
    /// Illegal combinations collapse onto the closest legal phase: a stop
    /// wins over everything, an unstarted session is idle.
    pub fn from_flags(flags: &SessionFlags) -> Self {
        let phase = if flags.is_stopped {
            SessionPhase::Stopped
        } else if !flags.workout_started {
            SessionPhase::Idle
        } else if flags.is_paused {
            SessionPhase::Paused {
                during_rest: flags.is_resting,
            }
        } else if flags.is_resting {
            SessionPhase::Resting
        } else {
            SessionPhase::Active
        };

        Self {
            phase,
            rest_completed: flags.rest_completed && !flags.is_stopped,
        }
    }
}

/// The six-flag snapshot written to the key-value store.
///
/// All fields are required; a blob missing any of them is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlags {
    pub workout_started: bool,
    pub is_paused: bool,
    pub is_stopped: bool,
    pub is_working_out: bool,
    pub is_resting: bool,
    pub rest_completed: bool,
}

impl SessionFlags {
    /// A session that was started but never stopped, left behind by a crash
    pub fn is_torn(&self) -> bool {
        self.workout_started && !self.is_stopped
    }
}

/// Single-slot archive of the last finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedWorkoutRecord {
    #[serde(flatten)]
    pub flags: SessionFlags,
    pub end_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    Start,
    Pause,
    Resume,
    Stop,
    CompleteSet,
    CompleteRest,
    SkipRest,
    /// A torn session was force-stopped during rehydration
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub transition: Transition,
    pub previous: SessionState,
    pub state: SessionState,
}

/// Owner of the live workout session.
///
/// Constructed once per app lifetime and handed by reference to the timers
/// and the workout controller.
pub struct SessionStore {
    state: SessionState,
    menu_open: bool,
    kv: Box<dyn KeyValueStore>,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .field("menu_open", &self.menu_open)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SessionStore {
    /// Builds the store and performs the one-time rehydration read.
    ///
    /// Never fails: unreadable or malformed state yields the idle default, and
    /// a torn session is archived and force-stopped.
    pub fn mount<K: KeyValueStore + 'static>(kv: K) -> Self {
        let mut store = Self {
            state: SessionState::default(),
            menu_open: false,
            kv: Box::new(kv),
            subscribers: Vec::new(),
        };
        store.rehydrate();
        store
    }

    fn rehydrate(&mut self) {
        let raw = match self.kv.get(SESSION_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to load workout state: {}", e);
                return;
            }
        };

        let flags = match serde_json::from_str::<SessionFlags>(&raw) {
            Ok(flags) => flags,
            Err(e) => {
                tracing::warn!("Ignoring malformed workout state: {}", e);
                return;
            }
        };

        if flags.is_torn() {
            tracing::info!(?flags, "Recovering workout that was never stopped");
            self.archive(flags);
            let previous = SessionState::from_flags(&flags);
            self.state = SessionState {
                phase: SessionPhase::Stopped,
                rest_completed: false,
            };
            self.commit(Transition::Recovered, previous);
        } else {
            self.state = SessionState::from_flags(&flags);
            tracing::debug!(state = ?self.state, "Workout state restored");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn flags(&self) -> SessionFlags {
        self.state.flags()
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// Registers a listener that receives every subsequent transition.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn start_workout(&mut self) {
        tracing::info!("Starting workout");
        self.apply(
            Transition::Start,
            SessionState {
                phase: SessionPhase::Active,
                rest_completed: false,
            },
        );
    }

    pub fn pause_workout(&mut self) -> Result<(), TransitionError> {
        let during_rest = match self.state.phase {
            SessionPhase::Active => false,
            SessionPhase::Resting => true,
            phase => return Err(invalid("pause", phase)),
        };
        self.apply(
            Transition::Pause,
            SessionState {
                phase: SessionPhase::Paused { during_rest },
                ..self.state
            },
        );
        Ok(())
    }

    pub fn resume_workout(&mut self) -> Result<(), TransitionError> {
        let phase = match self.state.phase {
            SessionPhase::Paused { during_rest: true } => SessionPhase::Resting,
            SessionPhase::Paused { during_rest: false } => SessionPhase::Active,
            phase => return Err(invalid("resume", phase)),
        };
        self.apply(
            Transition::Resume,
            SessionState {
                phase,
                ..self.state
            },
        );
        Ok(())
    }

    /// Terminates the session from any phase and archives what was running.
    pub fn stop_workout(&mut self) {
        tracing::info!("Stopping workout");
        if self.state.workout_started() {
            self.archive(self.state.flags());
        }
        self.apply(
            Transition::Stop,
            SessionState {
                phase: SessionPhase::Stopped,
                rest_completed: false,
            },
        );
    }

    pub fn complete_set(&mut self) -> Result<(), TransitionError> {
        if self.state.phase != SessionPhase::Active {
            return Err(invalid("complete set", self.state.phase));
        }
        self.apply(
            Transition::CompleteSet,
            SessionState {
                phase: SessionPhase::Resting,
                rest_completed: false,
            },
        );
        Ok(())
    }

    pub fn complete_rest(&mut self) -> Result<(), TransitionError> {
        if self.state.phase != SessionPhase::Resting {
            return Err(invalid("complete rest", self.state.phase));
        }
        self.apply(
            Transition::CompleteRest,
            SessionState {
                phase: SessionPhase::Active,
                rest_completed: true,
            },
        );
        Ok(())
    }

    /// Forced end of a rest interval, allowed while the rest is paused.
    pub fn skip_rest(&mut self) -> Result<(), TransitionError> {
        match self.state.phase {
            SessionPhase::Resting | SessionPhase::Paused { during_rest: true } => {}
            phase => return Err(invalid("skip rest", phase)),
        }
        self.apply(
            Transition::SkipRest,
            SessionState {
                phase: SessionPhase::Active,
                rest_completed: true,
            },
        );
        Ok(())
    }

    /// Flips the menu affordance. Has no effect on the session lifecycle.
    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    /// Last archived session, if one was ever written
    pub fn last_completed(&self) -> Option<CompletedWorkoutRecord> {
        match self.kv.get(COMPLETED_WORKOUT_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to load completed workout: {}", e);
                None
            }
        }
    }

    fn apply(&mut self, transition: Transition, next: SessionState) {
        let previous = self.state;
        self.state = next;
        self.commit(transition, previous);
    }

    fn commit(&mut self, transition: Transition, previous: SessionState) {
        tracing::debug!(%transition, from = ?previous.phase, to = ?self.state.phase, "Session transition");
        self.persist();

        let event = SessionEvent {
            transition,
            previous,
            state: self.state,
        };
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.state.flags())
            .map_err(StoreError::from)
            .and_then(|json| self.kv.set(SESSION_STATE_KEY, &json));

        if let Err(e) = result {
            tracing::warn!("Failed to save workout state: {}", e);
        }
    }

    fn archive(&self, flags: SessionFlags) {
        let record = CompletedWorkoutRecord {
            flags,
            end_time: Utc::now().to_rfc3339(),
        };
        let result = serde_json::to_string(&record)
            .map_err(StoreError::from)
            .and_then(|json| self.kv.set(COMPLETED_WORKOUT_KEY, &json));

        match result {
            Ok(()) => tracing::info!(end_time = %record.end_time, "Workout data saved"),
            Err(e) => tracing::warn!("Failed to save workout data: {}", e),
        }
    }
}

fn invalid(operation: &'static str, phase: SessionPhase) -> TransitionError {
    TransitionError::InvalidTransition { operation, phase }
}
