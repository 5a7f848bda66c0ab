use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::HumanTime;

use setpace::app::App;
use setpace::format::history_duration;
use setpace::history::WorkoutRecord;

/// Text of one history row: type, duration, date and how long ago
pub fn row_text(record: &WorkoutRecord, now: DateTime<Utc>) -> [String; 4] {
    let ago_secs = (now - record.start_time).num_seconds().max(0);
    [
        record.workout_type.clone(),
        history_duration(record.duration),
        record.start_time.format("%Y-%m-%d").to_string(),
        HumanTime::from_seconds(-ago_secs).to_string(),
    ]
}

pub fn present_row(record: &WorkoutRecord, now: DateTime<Utc>, selected: bool) -> Row<'static> {
    let [kind, duration, date, ago] = row_text(record, now);
    let style = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(kind).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(duration),
        Cell::from(date),
        Cell::from(ago).style(Style::default().fg(Color::Gray)),
    ])
    .style(style)
}

/// Render the workout history screen
pub fn render_history(app: &App, now_ms: u64, f: &mut Frame) {
    let area = f.area();
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms as i64).unwrap_or_default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = Paragraph::new("My Workouts")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let history = &app.history;
    if let Some(error) = &history.error {
        let error = Paragraph::new(error.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red));
        f.render_widget(error, chunks[1]);
    } else if history.workouts.is_empty() {
        let no_data = Paragraph::new("No workouts found.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let header = Row::new(vec!["Workout", "Duration", "Date", "When"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        // Keep the selection in view
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let skip = history
            .selected
            .saturating_sub(table_height.saturating_sub(1));

        let rows: Vec<Row> = history
            .workouts
            .iter()
            .enumerate()
            .skip(skip)
            .take(table_height)
            .map(|(i, record)| present_row(record, now, i == history.selected))
            .collect();

        let widths = [
            Constraint::Length(20),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Min(10),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Workouts"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("(↑/↓) select  (d) delete  (b/esc) back  (q) quit")
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ratatui::{backend::TestBackend, Terminal};
    use setpace::app::Action;
    use setpace::config::Config;
    use setpace::history::{MemoryRecorder, NewWorkout, WorkoutRecorder};
    use setpace::kv::MemoryKeyValueStore;
    use setpace::plan::WorkoutKind;
    use std::rc::Rc;

    const NOW_MS: u64 = 1_700_000_000_000;

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
        terminal.draw(|f| render_history(app, NOW_MS, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn app_with(recorder: Rc<MemoryRecorder>, config: Config) -> App {
        App::new(
            &config,
            WorkoutKind::BasicLowerBody,
            MemoryKeyValueStore::new(),
            recorder,
        )
    }

    #[test]
    fn row_text_formats_fields() {
        let start = Utc.with_ymd_and_hms(2023, 11, 12, 9, 0, 0).unwrap();
        let record = WorkoutRecord {
            id: "x".into(),
            start_time: start,
            end_time: start,
            duration: 3725,
            workout_type: "basic-upper-body".into(),
        };

        let [kind, duration, date, ago] = row_text(&record, start + chrono::Duration::days(2));

        assert_eq!(kind, "basic-upper-body");
        assert_eq!(duration, "1h 2m 5s");
        assert_eq!(date, "2023-11-12");
        assert!(!ago.is_empty());
    }

    #[test]
    fn empty_history_says_so() {
        let mut app = app_with(Rc::new(MemoryRecorder::new()), Config::default());
        app.handle(Action::OpenHistory, NOW_MS);

        assert!(draw(&app).contains("No workouts found."));
    }

    #[test]
    fn lists_saved_workouts() {
        let recorder = Rc::new(MemoryRecorder::new());
        let w = NewWorkout::from_millis(NOW_MS - 7_200_000, NOW_MS - 3_600_000, 0, "basic-lower-body")
            .unwrap();
        recorder.add_workout("local", &w).unwrap();
        let mut app = app_with(recorder, Config::default());
        app.handle(Action::OpenHistory, NOW_MS);

        let rendered = draw(&app);

        assert!(rendered.contains("basic-lower-body"));
        assert!(rendered.contains("Unknown Duration"));
    }

    #[test]
    fn load_error_is_shown_inline() {
        let config = Config {
            user_id: None,
            ..Config::default()
        };
        let mut app = app_with(Rc::new(MemoryRecorder::new()), config);
        app.handle(Action::OpenHistory, NOW_MS);

        assert!(draw(&app).contains("Failed to fetch workouts"));
    }
}
