use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use itertools::Itertools;
use rusqlite::{params, Connection};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::HistoryError;

/// A workout about to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkout {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Active seconds, pauses excluded
    pub duration: i64,
    pub workout_type: String,
}

impl NewWorkout {
    /// Builds a record from millisecond timestamps
    pub fn from_millis(
        start_ms: u64,
        end_ms: u64,
        duration: u64,
        workout_type: impl Into<String>,
    ) -> Result<Self, HistoryError> {
        let to_utc = |ms: u64| {
            Utc.timestamp_millis_opt(ms as i64)
                .single()
                .ok_or_else(|| HistoryError::InvalidRecord(format!("timestamp {} out of range", ms)))
        };
        Ok(Self {
            start_time: to_utc(start_ms)?,
            end_time: to_utc(end_ms)?,
            duration: duration as i64,
            workout_type: workout_type.into(),
        })
    }

    /// Documents are keyed by the time they were saved
    pub fn document_id(&self) -> String {
        self.end_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// A saved workout as listed in the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub workout_type: String,
}

/// Per-user workout document store
pub trait WorkoutRecorder {
    /// Saves a workout and returns its document id
    fn add_workout(&self, user_id: &str, workout: &NewWorkout) -> Result<String, HistoryError>;
    /// All workouts of a user, newest start time first
    fn list_workouts(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, HistoryError>;
    fn delete_workout(&self, user_id: &str, id: &str) -> Result<(), HistoryError>;
}

/// SQLite-backed workout history
#[derive(Debug)]
pub struct WorkoutDb {
    conn: Connection,
}

impl WorkoutDb {
    /// Open the database under the state directory, creating it if needed
    pub fn new() -> Result<Self, HistoryError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("setpace_workouts.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS workouts (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration INTEGER NOT NULL,
                workout_type TEXT NOT NULL,
                PRIMARY KEY (user_id, id)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_workouts_start ON workouts(user_id, start_time)",
            [],
        )?;

        Ok(WorkoutDb { conn })
    }
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), rusqlite::types::Type::Text)
        })
}

impl WorkoutRecorder for WorkoutDb {
    fn add_workout(&self, user_id: &str, workout: &NewWorkout) -> Result<String, HistoryError> {
        let id = workout.document_id();
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO workouts
            (user_id, id, start_time, end_time, duration, workout_type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id,
                id,
                workout.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
                workout.end_time.to_rfc3339_opts(SecondsFormat::Millis, true),
                workout.duration,
                workout.workout_type,
            ],
        )?;
        Ok(id)
    }

    fn list_workouts(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, start_time, end_time, duration, workout_type
            FROM workouts
            WHERE user_id = ?1
            ORDER BY start_time DESC
            "#,
        )?;

        let rows = stmt.query_map([user_id], |row| {
            let start: String = row.get(1)?;
            let end: String = row.get(2)?;
            Ok(WorkoutRecord {
                id: row.get(0)?,
                start_time: parse_time(1, &start)?,
                end_time: parse_time(2, &end)?,
                duration: row.get(3)?,
                workout_type: row.get(4)?,
            })
        })?;

        let mut workouts = Vec::new();
        for workout in rows {
            workouts.push(workout?);
        }
        Ok(workouts)
    }

    fn delete_workout(&self, user_id: &str, id: &str) -> Result<(), HistoryError> {
        self.conn.execute(
            "DELETE FROM workouts WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(())
    }
}

/// In-memory history for tests and headless runs
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    workouts: RefCell<Vec<(String, WorkoutRecord)>>,
    fail_writes: Cell<bool>,
    save_attempts: Cell<usize>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `add_workout` fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn save_attempts(&self) -> usize {
        self.save_attempts.get()
    }
}

impl WorkoutRecorder for MemoryRecorder {
    fn add_workout(&self, user_id: &str, workout: &NewWorkout) -> Result<String, HistoryError> {
        self.save_attempts.set(self.save_attempts.get() + 1);
        if self.fail_writes.get() {
            return Err(HistoryError::Io(std::io::Error::other("write refused")));
        }

        let id = workout.document_id();
        let record = WorkoutRecord {
            id: id.clone(),
            start_time: workout.start_time,
            end_time: workout.end_time,
            duration: workout.duration,
            workout_type: workout.workout_type.clone(),
        };
        let mut workouts = self.workouts.borrow_mut();
        workouts.retain(|(user, w)| !(user == user_id && w.id == id));
        workouts.push((user_id.to_string(), record));
        Ok(id)
    }

    fn list_workouts(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, HistoryError> {
        Ok(self
            .workouts
            .borrow()
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, w)| w.clone())
            .sorted_by(|a, b| b.start_time.cmp(&a.start_time))
            .collect())
    }

    fn delete_workout(&self, user_id: &str, id: &str) -> Result<(), HistoryError> {
        self.workouts
            .borrow_mut()
            .retain(|(user, w)| !(user == user_id && w.id == id));
        Ok(())
    }
}

impl<T: WorkoutRecorder + ?Sized> WorkoutRecorder for std::rc::Rc<T> {
    fn add_workout(&self, user_id: &str, workout: &NewWorkout) -> Result<String, HistoryError> {
        (**self).add_workout(user_id, workout)
    }

    fn list_workouts(&self, user_id: &str) -> Result<Vec<WorkoutRecord>, HistoryError> {
        (**self).list_workouts(user_id)
    }

    fn delete_workout(&self, user_id: &str, id: &str) -> Result<(), HistoryError> {
        (**self).delete_workout(user_id, id)
    }
}
