pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

use setpace::{
    app::{action_for_key, App},
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    history::{MemoryRecorder, WorkoutDb},
    kv::FileKeyValueStore,
    plan::WorkoutKind,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
};

use crate::ui::screen::{current_screen, Screen};

/// workout session tracker for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Work through a strength routine set by set, with rest countdowns, inactivity auto-pause and a local workout history."
)]
pub struct Cli {
    /// routine to run (defaults to the configured one)
    #[clap(short = 'w', long, value_enum)]
    workout: Option<WorkoutKind>,

    /// seconds of rest between sets
    #[clap(short = 'r', long)]
    rest_secs: Option<u64>,

    /// seconds without activity before the workout is paused
    #[clap(long)]
    primary_inactivity_secs: Option<u64>,

    /// seconds a workout may stay auto-paused before it is stopped
    #[clap(long)]
    final_inactivity_secs: Option<u64>,

    /// user whose workout history is read and written
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// run without a user; workouts are not saved to history
    #[clap(long, conflicts_with = "user")]
    signed_out: bool,

    /// log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layers command line overrides on top of the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(workout) = self.workout {
            config.default_workout = workout;
        }
        if let Some(secs) = self.rest_secs {
            config.rest_interval_secs = secs;
        }
        if let Some(secs) = self.primary_inactivity_secs {
            config.primary_inactivity_ceiling_secs = secs;
        }
        if let Some(secs) = self.final_inactivity_secs {
            config.final_inactivity_ceiling_secs = secs;
        }
        if let Some(user) = &self.user {
            config.user_id = Some(user.clone());
        }
        if self.signed_out {
            config.user_id = None;
        }
        config
    }
}

fn init_logging(log_level: &str) {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(&cli.log_level);

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        if let Err(e) = config_store.save(&config) {
            tracing::warn!("Failed to save config: {}", e);
        }
    }

    let kind = config.default_workout;
    let kv = FileKeyValueStore::new();
    let mut app = match WorkoutDb::new() {
        Ok(db) => App::new(&config, kind, kv, db),
        Err(e) => {
            tracing::warn!("Workout history unavailable, keeping it in memory: {}", e);
            App::new(&config, kind, kv, MemoryRecorder::new())
        }
    };
    tracing::info!(workout = %kind, "Starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::default(),
        SystemClock,
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B, E, T, C>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T, C>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    E: EventSource,
    T: Ticker,
    C: Clock,
{
    let mut now_ms = runner.clock().now_ms();

    loop {
        terminal.draw(|f| current_screen(app.screen).render(app, now_ms, f))?;

        let (event, at) = runner.step();
        now_ms = at;

        match event {
            AppEvent::Tick => app.on_tick(now_ms),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if let Some(action) = action_for_key(app.screen, key) {
                    if app.handle(action, now_ms) {
                        break;
                    }
                }
                // A steady key stream never times out into a Tick
                app.on_tick(now_ms);
            }
        }
    }

    Ok(())
}
