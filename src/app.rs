use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Config;
use crate::controller::WorkoutController;
use crate::elapsed::ElapsedTimer;
use crate::error::HistoryError;
use crate::history::{WorkoutRecord, WorkoutRecorder};
use crate::kv::KeyValueStore;
use crate::plan::WorkoutKind;
use crate::session::{SessionPhase, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Workout,
    History,
}

/// Everything a key press can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Resume,
    Stop,
    CompleteSet,
    ContinueRest,
    SkipRest,
    ToggleMenu,
    OpenHistory,
    CloseHistory,
    SelectPrevious,
    SelectNext,
    DeleteSelected,
    Quit,
}

/// Entries of the workout menu bar, derived from the session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Start,
    Pause,
    Resume,
    Stop,
    History,
    Menu,
    Quit,
}

impl MenuItem {
    pub fn key_hint(&self) -> (&'static str, &'static str) {
        match self {
            MenuItem::Start => ("s", "Start"),
            MenuItem::Pause => ("p", "Pause"),
            MenuItem::Resume => ("r", "Resume"),
            MenuItem::Stop => ("x", "Stop"),
            MenuItem::History => ("h", "History"),
            MenuItem::Menu => ("m", "Menu"),
            MenuItem::Quit => ("q", "Quit"),
        }
    }
}

pub fn menu_items(phase: SessionPhase) -> Vec<MenuItem> {
    let mut items = match phase {
        SessionPhase::Idle | SessionPhase::Stopped => vec![MenuItem::Start],
        SessionPhase::Paused { .. } => vec![MenuItem::Resume, MenuItem::Stop],
        SessionPhase::Active | SessionPhase::Resting => vec![MenuItem::Pause, MenuItem::Stop],
    };
    items.extend([MenuItem::History, MenuItem::Menu, MenuItem::Quit]);
    items
}

pub fn action_for_key(screen: AppScreen, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match screen {
        AppScreen::Workout => match key.code {
            KeyCode::Char('s') => Some(Action::Start),
            KeyCode::Char('p') => Some(Action::Pause),
            KeyCode::Char('r') => Some(Action::Resume),
            KeyCode::Char('x') => Some(Action::Stop),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Action::CompleteSet),
            KeyCode::Char('c') => Some(Action::ContinueRest),
            KeyCode::Char('k') => Some(Action::SkipRest),
            KeyCode::Char('m') => Some(Action::ToggleMenu),
            KeyCode::Char('h') => Some(Action::OpenHistory),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },
        AppScreen::History => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrevious),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
            KeyCode::Char('d') | KeyCode::Delete => Some(Action::DeleteSelected),
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => Some(Action::CloseHistory),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        },
    }
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub workouts: Vec<WorkoutRecord>,
    pub selected: usize,
    /// Shown inline instead of the list when loading failed
    pub error: Option<String>,
}

/// The running application: one session, its timers, and the history view
pub struct App {
    pub kind: WorkoutKind,
    pub store: SessionStore,
    pub elapsed: ElapsedTimer,
    pub controller: WorkoutController,
    pub screen: AppScreen,
    pub history: HistoryState,
    recorder: Box<dyn WorkoutRecorder>,
    user_id: Option<String>,
}

impl App {
    pub fn new<K, R>(config: &Config, kind: WorkoutKind, kv: K, recorder: R) -> Self
    where
        K: KeyValueStore + 'static,
        R: WorkoutRecorder + 'static,
    {
        let timings = config.timings();
        let mut store = SessionStore::mount(kv);
        let elapsed = ElapsedTimer::new(
            &mut store,
            kind.to_string(),
            config.user_id.clone(),
            timings,
        );
        let controller = WorkoutController::new(&mut store, kind.plan(), timings);

        Self {
            kind,
            store,
            elapsed,
            controller,
            screen: AppScreen::Workout,
            history: HistoryState::default(),
            recorder: Box::new(recorder),
            user_id: config.user_id.clone(),
        }
    }

    /// Applies one user action. Returns `true` when the app should exit.
    pub fn handle(&mut self, action: Action, now_ms: u64) -> bool {
        let result = match action {
            Action::Start => {
                self.store.start_workout();
                Ok(())
            }
            Action::Pause => self.store.pause_workout(),
            Action::Resume => self.store.resume_workout(),
            Action::Stop => {
                self.store.stop_workout();
                Ok(())
            }
            Action::CompleteSet => {
                if self.controller.visibility().complete_set {
                    self.controller.complete_set(&mut self.store, now_ms)
                } else {
                    Ok(())
                }
            }
            Action::ContinueRest => self.controller.continue_with_rest(&mut self.store, now_ms),
            Action::SkipRest => self.controller.skip_rest(&mut self.store, now_ms),
            Action::ToggleMenu => {
                self.store.toggle_menu();
                Ok(())
            }
            Action::OpenHistory => {
                self.open_history();
                Ok(())
            }
            Action::CloseHistory => {
                self.screen = AppScreen::Workout;
                Ok(())
            }
            Action::SelectPrevious => {
                self.history.selected = self.history.selected.saturating_sub(1);
                Ok(())
            }
            Action::SelectNext => {
                if self.history.selected + 1 < self.history.workouts.len() {
                    self.history.selected += 1;
                }
                Ok(())
            }
            Action::DeleteSelected => {
                self.delete_selected();
                Ok(())
            }
            Action::Quit => return true,
        };

        if let Err(e) = result {
            tracing::debug!(?action, "Ignored: {}", e);
        }
        self.sync(now_ms);
        false
    }

    pub fn on_tick(&mut self, now_ms: u64) {
        self.elapsed
            .on_tick(&mut self.store, self.recorder.as_ref(), now_ms);
        self.controller.on_tick(&mut self.store, now_ms);
        // Rest completion from the controller is seen by the elapsed timer too
        self.elapsed.sync(self.recorder.as_ref(), now_ms);
    }

    fn sync(&mut self, now_ms: u64) {
        self.elapsed.sync(self.recorder.as_ref(), now_ms);
        self.controller.sync(&self.store, now_ms);
    }

    pub fn menu(&self) -> Vec<MenuItem> {
        menu_items(self.store.phase())
    }

    fn open_history(&mut self) {
        self.screen = AppScreen::History;
        self.history = HistoryState::default();

        let result = match self.user_id.as_deref() {
            Some(user_id) => self.recorder.list_workouts(user_id),
            None => Err(HistoryError::NotAuthenticated),
        };
        match result {
            Ok(workouts) => self.history.workouts = workouts,
            Err(e) => {
                tracing::error!("Failed to fetch workouts: {}", e);
                self.history.error = Some("Failed to fetch workouts".to_string());
            }
        }
    }

    fn delete_selected(&mut self) {
        let (Some(user_id), Some(workout)) = (
            self.user_id.as_deref(),
            self.history.workouts.get(self.history.selected),
        ) else {
            return;
        };

        let id = workout.id.clone();
        match self.recorder.delete_workout(user_id, &id) {
            Ok(()) => {
                tracing::info!(%id, "Workout deleted");
                self.history.workouts.retain(|w| w.id != id);
                if self.history.selected >= self.history.workouts.len() {
                    self.history.selected = self.history.workouts.len().saturating_sub(1);
                }
            }
            Err(e) => tracing::error!("Error deleting workout: {}", e),
        }
    }
}
