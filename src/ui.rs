pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use setpace::app::{App, MenuItem};
use setpace::format::rest_clock;
use setpace::session::SessionPhase;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

/// The workout screen: exercise list, rest countdown, GO banner and menu
pub struct WorkoutView<'a> {
    pub app: &'a App,
    pub now_ms: u64,
}

impl<'a> WorkoutView<'a> {
    pub fn new(app: &'a App, now_ms: u64) -> Self {
        Self { app, now_ms }
    }
}

fn status_text(phase: SessionPhase) -> (&'static str, Style) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match phase {
        SessionPhase::Idle => ("Ready when you are", bold.fg(Color::Cyan)),
        SessionPhase::Active => ("Working out", bold.fg(Color::Green)),
        SessionPhase::Resting => ("Resting", bold.fg(Color::Blue)),
        SessionPhase::Paused { .. } => ("PAUSED", bold.fg(Color::Yellow)),
        SessionPhase::Stopped => ("Workout stopped", bold.fg(Color::Magenta)),
    }
}

pub fn menu_line(items: &[MenuItem], open: bool) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    if !open {
        return Line::from(vec![
            Span::styled("(m)", key_style),
            Span::raw(" menu"),
        ]);
    }

    let mut spans = Vec::new();
    for item in items {
        let (key, label) = item.key_hint();
        spans.push(Span::styled(format!("({key})"), key_style));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    Line::from(spans)
}

impl Widget for WorkoutView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let app = self.app;
        let controller = &app.controller;
        let visibility = controller.visibility();
        let progress = controller.progress();
        let plan = controller.plan();

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title + elapsed
                Constraint::Length(1), // status
                Constraint::Length(1),
                Constraint::Min(3),    // body
                Constraint::Length(1), // hints
                Constraint::Length(1), // menu
            ])
            .split(area);

        let header = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(10)])
            .split(chunks[0]);

        Paragraph::new(Span::styled(plan.title, bold_style)).render(header[0], buf);

        let elapsed_style = if app.elapsed.is_ticking() {
            bold_style.fg(Color::Green)
        } else {
            dim_style
        };
        Paragraph::new(Span::styled(app.elapsed.display(), elapsed_style))
            .alignment(Alignment::Right)
            .render(header[1], buf);

        let (status, status_style) = status_text(app.store.phase());
        let mut status_line = vec![Span::styled(status, status_style)];
        if let Some(left) = app.elapsed.auto_stop_remaining_ms(self.now_ms) {
            status_line.push(Span::styled(
                format!("  auto-stop in {}", rest_clock(left)),
                Style::default().fg(Color::Red),
            ));
        }
        Paragraph::new(Line::from(status_line)).render(chunks[1], buf);

        let body = chunks[3];
        if visibility.go_banner {
            Paragraph::new(Span::styled(
                "GO!",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(body, buf);
        } else if visibility.rest_timer {
            let rest = controller.rest();
            let rest_style = if rest.is_blinking() {
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK)
            } else {
                bold_style
            };
            let mut lines = vec![Line::from(Span::styled(rest.display(), rest_style))];
            if let Some(next) = controller.current_exercise() {
                lines.push(Line::from(Span::styled(
                    format!("Next: {}", next.name),
                    dim_style,
                )));
            }
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Rest"))
                .render(body, buf);
        } else if visibility.exercise_list {
            let finished = progress.is_finished(plan);
            let lines: Vec<Line> = controller
                .displayed_exercises()
                .iter()
                .map(|exercise| {
                    if exercise.position == progress.current_exercise_index {
                        let set_info = if finished {
                            "(All sets done)".to_string()
                        } else {
                            format!(
                                "(Set {} of {})",
                                progress.current_set_number.min(exercise.sets_total),
                                exercise.sets_total
                            )
                        };
                        Line::from(vec![
                            Span::styled(format!("> {}", exercise.name), bold_style),
                            Span::raw(format!("  {} reps  ", exercise.reps_target)),
                            Span::styled(set_info, Style::default().fg(Color::Cyan)),
                        ])
                    } else {
                        Line::from(Span::styled(
                            format!("  {}  {}x{}", exercise.name, exercise.sets_total, exercise.reps_target),
                            dim_style,
                        ))
                    }
                })
                .collect();

            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Exercises"))
                .wrap(Wrap { trim: true })
                .render(body, buf);
        }

        let hint = if visibility.pause_options {
            Some("(c) continue with rest  (k) skip rest")
        } else if visibility.complete_set {
            Some("(space) complete set")
        } else {
            None
        };
        if let Some(hint) = hint {
            Paragraph::new(Span::styled(hint, Style::default().add_modifier(Modifier::ITALIC)))
                .alignment(Alignment::Center)
                .render(chunks[4], buf);
        }

        Paragraph::new(menu_line(&app.menu(), app.store.menu_open()))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }
}
