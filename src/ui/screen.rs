use ratatui::Frame;

use setpace::app::{App, AppScreen};

use crate::ui::{history::render_history, WorkoutView};

/// A UI Screen boundary: responsible for rendering one app screen
pub trait Screen {
    fn render(&self, app: &App, now_ms: u64, f: &mut Frame);
}

pub struct WorkoutScreen;

impl Screen for WorkoutScreen {
    fn render(&self, app: &App, now_ms: u64, f: &mut Frame) {
        f.render_widget(WorkoutView::new(app, now_ms), f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &App, now_ms: u64, f: &mut Frame) {
        render_history(app, now_ms, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(screen: AppScreen) -> Box<dyn Screen> {
    match screen {
        AppScreen::Workout => Box::new(WorkoutScreen),
        AppScreen::History => Box::new(HistoryScreen),
    }
}
