use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use setpace::app::{action_for_key, App};
use setpace::clock::ManualClock;
use setpace::config::Config;
use setpace::history::{MemoryRecorder, WorkoutRecorder};
use setpace::kv::MemoryKeyValueStore;
use setpace::plan::WorkoutKind;
use setpace::runtime::{AppEvent, FixedTicker, Runner, TestEventSource, TICK_RATE_MS};
use setpace::session::SessionPhase;

const T0: u64 = 1_700_000_000_000;

struct Harness {
    app: App,
    clock: ManualClock,
    tx: Sender<AppEvent>,
    runner: Runner<TestEventSource, FixedTicker, ManualClock>,
    recorder: Rc<MemoryRecorder>,
}

impl Harness {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let clock = ManualClock::new(T0);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
            clock.clone(),
        );
        let recorder = Rc::new(MemoryRecorder::new());
        let app = App::new(
            &Config::default(),
            WorkoutKind::BasicUpperBody,
            MemoryKeyValueStore::new(),
            Rc::clone(&recorder),
        );
        Self {
            app,
            clock,
            tx,
            runner,
            recorder,
        }
    }

    fn press(&mut self, c: char) {
        self.tx
            .send(AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
            .unwrap();
        self.step();
    }

    fn step(&mut self) {
        let (event, now) = self.runner.step();
        match event {
            AppEvent::Tick => self.app.on_tick(now),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if let Some(action) = action_for_key(self.app.screen, key) {
                    self.app.handle(action, now);
                }
            }
        }
    }

    /// Lets `secs` of wall time pass, one scheduler tick at a time
    fn wait_secs(&mut self, secs: u64) {
        for _ in 0..(secs * 1000 / TICK_RATE_MS) {
            self.clock.advance_ms(TICK_RATE_MS);
            self.step();
        }
    }
}

#[test]
fn headless_set_rest_go_cycle() {
    let mut h = Harness::new();

    h.press('s');
    assert_eq!(h.app.store.phase(), SessionPhase::Active);
    assert!(h.app.controller.visibility().complete_set);

    h.wait_secs(30);
    h.press(' ');
    assert_eq!(h.app.store.phase(), SessionPhase::Resting);
    assert!(h.app.controller.visibility().rest_timer);
    assert!(!h.app.controller.visibility().exercise_list);

    h.wait_secs(30);
    assert_eq!(h.app.controller.rest().display(), "1:30");

    h.wait_secs(90);
    assert_eq!(h.app.store.phase(), SessionPhase::Active);
    assert!(h.app.store.state().rest_completed);
    assert!(h.app.controller.visibility().go_banner);

    // GO banner blocks set completion until it clears
    h.press(' ');
    assert_eq!(h.app.controller.progress().current_set_number, 2);

    h.wait_secs(3);
    let visibility = h.app.controller.visibility();
    assert!(!visibility.go_banner);
    assert!(visibility.exercise_list);
    assert!(!visibility.rest_timer);

    h.press(' ');
    assert_eq!(h.app.controller.progress().current_set_number, 3);
    assert_eq!(h.app.store.phase(), SessionPhase::Resting);
}

#[test]
fn headless_pause_excludes_time_and_stop_saves() {
    let mut h = Harness::new();

    h.press('s');
    h.wait_secs(20);
    h.press('p');
    assert_eq!(h.app.store.phase(), SessionPhase::Paused { during_rest: false });

    h.wait_secs(60);
    assert_eq!(h.app.elapsed.duration_secs(), 20);

    h.press('r');
    h.wait_secs(10);
    assert_eq!(h.app.elapsed.duration_secs(), 30);

    h.press('x');
    assert_eq!(h.app.store.phase(), SessionPhase::Stopped);

    let saved = h.recorder.list_workouts("local").unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].duration, 30);
    assert_eq!(saved[0].workout_type, "basic-upper-body");
    assert_eq!(saved[0].start_time.timestamp_millis() as u64, T0);

    let archived = h.app.store.last_completed().unwrap();
    assert!(archived.flags.workout_started);
}

#[test]
fn headless_skip_rest_from_paused_rest() {
    let mut h = Harness::new();

    h.press('s');
    h.press(' ');
    h.wait_secs(5);
    h.press('p');
    assert!(h.app.controller.visibility().pause_options);

    h.press('k');

    assert_eq!(h.app.store.phase(), SessionPhase::Active);
    assert!(h.app.controller.visibility().go_banner);
    assert!(h.app.elapsed.is_ticking());
}

#[test]
fn headless_continue_rest_keeps_countdown() {
    let mut h = Harness::new();

    h.press('s');
    h.press(' ');
    h.wait_secs(20);
    h.press('p');
    h.wait_secs(40);
    assert_eq!(h.app.controller.rest().display(), "1:40");

    h.press('c');
    assert_eq!(h.app.store.phase(), SessionPhase::Resting);
    h.wait_secs(10);

    assert_eq!(h.app.controller.rest().display(), "1:30");
}
