use chrono::{DateTime, Local};
use rusqlite::{params, types::Type, Connection, Row};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app_dirs::AppDirs;
use crate::calibration::CalibrationRun;
use crate::error::Result;
use crate::mode::{Difficulty, TestMode};
use crate::submission::{CalibrationSubmission, ResultSink, ResultSubmission};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    test_mode TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    duration REAL NOT NULL,
    target_size REAL NOT NULL,
    score INTEGER NOT NULL,
    accuracy REAL NOT NULL,
    total_shots INTEGER NOT NULL,
    total_hits INTEGER NOT NULL,
    total_misses INTEGER NOT NULL,
    average_reaction_time REAL NOT NULL,
    kills_per_second REAL NOT NULL,
    consistency REAL NOT NULL,
    streak_best INTEGER NOT NULL,
    flick_distance TEXT,
    tracking_accuracy REAL,
    switch_speed TEXT,
    hit_positions TEXT,
    miss_positions TEXT
);
CREATE INDEX IF NOT EXISTS idx_results_mode ON results(test_mode);
CREATE TABLE IF NOT EXISTS calibration_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    user_id TEXT NOT NULL,
    test_type TEXT NOT NULL,
    dpi INTEGER NOT NULL,
    in_game_sensitivity REAL NOT NULL,
    inches_per_360 REAL NOT NULL,
    accuracy_percentage REAL NOT NULL,
    reaction_time_ms REAL NOT NULL,
    consistency_score REAL NOT NULL,
    path_efficiency REAL NOT NULL,
    movement_smoothness REAL NOT NULL,
    overshoot_rate REAL NOT NULL,
    undershoot_rate REAL NOT NULL,
    correction_rate REAL NOT NULL,
    prediction_accuracy REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_calibration_runs_user ON calibration_runs(user_id);
"#;

/// A stored drill result with its row metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub id: i64,
    pub recorded_at: DateTime<Local>,
    pub result: ResultSubmission,
}

/// Flat CSV row; the per-shot arrays are left out of the export
#[derive(Debug, Serialize)]
struct HistoryRow {
    id: i64,
    recorded_at: String,
    test_mode: String,
    difficulty: String,
    duration: f64,
    target_size: f64,
    score: u64,
    accuracy: f64,
    total_shots: u32,
    total_hits: u32,
    total_misses: u32,
    average_reaction_time: f64,
    kills_per_second: f64,
    consistency: f64,
    streak_best: u32,
    tracking_accuracy: Option<f64>,
}

/// SQLite store for drill results and calibration runs
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database in the state directory, creating it if needed
    pub fn new() -> Result<Self> {
        let path = Self::get_database_path().unwrap_or_else(|| PathBuf::from("reticle_stats.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    pub fn get_database_path() -> Option<PathBuf> {
        AppDirs::db_path()
    }

    fn insert_result(&self, r: &ResultSubmission) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO results
            (recorded_at, test_mode, difficulty, duration, target_size, score, accuracy,
             total_shots, total_hits, total_misses, average_reaction_time, kills_per_second,
             consistency, streak_best, flick_distance, tracking_accuracy, switch_speed,
             hit_positions, miss_positions)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                Local::now().to_rfc3339(),
                r.test_mode.to_string(),
                r.difficulty.to_string(),
                r.duration,
                r.target_size,
                r.score,
                r.accuracy,
                r.total_shots,
                r.total_hits,
                r.total_misses,
                r.average_reaction_time,
                r.kills_per_second,
                r.consistency,
                r.streak_best,
                to_json(&r.flick_distance)?,
                r.tracking_accuracy,
                to_json(&r.switch_speed)?,
                to_json(&r.hit_positions)?,
                to_json(&r.miss_positions)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_calibration(&self, c: &CalibrationSubmission) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO calibration_runs
            (recorded_at, user_id, test_type, dpi, in_game_sensitivity, inches_per_360,
             accuracy_percentage, reaction_time_ms, consistency_score, path_efficiency,
             movement_smoothness, overshoot_rate, undershoot_rate, correction_rate,
             prediction_accuracy)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                Local::now().to_rfc3339(),
                c.user_id,
                c.test_type,
                c.dpi,
                c.in_game_sensitivity,
                c.inches_per_360,
                c.accuracy_percentage,
                c.reaction_time_ms,
                c.consistency_score,
                c.path_efficiency,
                c.movement_smoothness,
                c.overshoot_rate,
                c.undershoot_rate,
                c.correction_rate,
                c.prediction_accuracy,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every calibration run recorded for a user, oldest first
    pub fn calibration_runs(&self, user_id: &str) -> Result<Vec<CalibrationRun>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, test_type, dpi, in_game_sensitivity, inches_per_360,
                   accuracy_percentage, reaction_time_ms, consistency_score, path_efficiency,
                   movement_smoothness, overshoot_rate, undershoot_rate, correction_rate,
                   prediction_accuracy
            FROM calibration_runs
            WHERE user_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(CalibrationSubmission {
                user_id: row.get(0)?,
                test_type: row.get(1)?,
                dpi: row.get(2)?,
                in_game_sensitivity: row.get(3)?,
                inches_per_360: row.get(4)?,
                accuracy_percentage: row.get(5)?,
                reaction_time_ms: row.get(6)?,
                consistency_score: row.get(7)?,
                path_efficiency: row.get(8)?,
                movement_smoothness: row.get(9)?,
                overshoot_rate: row.get(10)?,
                undershoot_rate: row.get(11)?,
                correction_rate: row.get(12)?,
                prediction_accuracy: row.get(13)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?.to_run());
        }
        Ok(runs)
    }

    /// Most recent drill results first
    pub fn recent_results(&self, limit: usize) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, recorded_at, test_mode, difficulty, duration, target_size, score, accuracy,
                   total_shots, total_hits, total_misses, average_reaction_time, kills_per_second,
                   consistency, streak_best, flick_distance, tracking_accuracy, switch_speed,
                   hit_positions, miss_positions
            FROM results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], read_result)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn result_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?)
    }

    /// Write the full result history as CSV; returns the number of rows
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let results = self.recent_results(usize::MAX)?;
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for stored in results.iter().rev() {
            let r = &stored.result;
            writer.serialize(HistoryRow {
                id: stored.id,
                recorded_at: stored.recorded_at.to_rfc3339(),
                test_mode: r.test_mode.to_string(),
                difficulty: r.difficulty.to_string(),
                duration: r.duration,
                target_size: r.target_size,
                score: r.score,
                accuracy: r.accuracy,
                total_shots: r.total_shots,
                total_hits: r.total_hits,
                total_misses: r.total_misses,
                average_reaction_time: r.average_reaction_time,
                kills_per_second: r.kills_per_second,
                consistency: r.consistency,
                streak_best: r.streak_best,
                tracking_accuracy: r.tracking_accuracy,
            })?;
        }
        writer.flush()?;
        info!(rows = results.len(), path = %path.as_ref().display(), "exported result history");
        Ok(results.len())
    }
}

impl ResultSink for StatsDb {
    fn submit_result(&mut self, result: &ResultSubmission) -> Result<i64> {
        result.validate()?;
        self.insert_result(result)
    }

    fn submit_calibration(&mut self, run: &CalibrationSubmission) -> Result<i64> {
        run.validate()?;
        self.insert_calibration(run)
    }
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    Ok(match value {
        Some(v) => Some(serde_json::to_string(v)?),
        None => None,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        serde_json::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn enum_column<T: clap::ValueEnum>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    T::from_str(&text, true).map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, format!("unknown value {text}"), Type::Text)
    })
}

fn read_result(row: &Row) -> rusqlite::Result<StoredResult> {
    let recorded_at: String = row.get(1)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map_err(|_| rusqlite::Error::InvalidColumnType(1, "recorded_at".to_string(), Type::Text))?
        .with_timezone(&Local);
    let test_mode: TestMode = enum_column(row, 2)?;
    let difficulty: Difficulty = enum_column(row, 3)?;

    Ok(StoredResult {
        id: row.get(0)?,
        recorded_at,
        result: ResultSubmission {
            test_mode,
            difficulty,
            duration: row.get(4)?,
            target_size: row.get(5)?,
            score: row.get(6)?,
            accuracy: row.get(7)?,
            total_shots: row.get(8)?,
            total_hits: row.get(9)?,
            total_misses: row.get(10)?,
            average_reaction_time: row.get(11)?,
            kills_per_second: row.get(12)?,
            consistency: row.get(13)?,
            streak_best: row.get(14)?,
            flick_distance: json_column(row, 15)?,
            tracking_accuracy: row.get(16)?,
            switch_speed: json_column(row, 17)?,
            hit_positions: json_column(row, 18)?,
            miss_positions: json_column(row, 19)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReticleError;
    use crate::geometry::Point;
    use assert_matches::assert_matches;

    fn result(mode: TestMode, hits: u32, misses: u32) -> ResultSubmission {
        ResultSubmission {
            test_mode: mode,
            difficulty: Difficulty::Hard,
            duration: 30.0,
            target_size: 45.0,
            score: 1234,
            accuracy: if hits + misses == 0 {
                0.0
            } else {
                hits as f64 / (hits + misses) as f64 * 100.0
            },
            total_shots: hits + misses,
            total_hits: hits,
            total_misses: misses,
            average_reaction_time: 320.0,
            kills_per_second: 0.8,
            consistency: 71.0,
            streak_best: hits,
            flick_distance: Some(vec![210.0, 305.5]),
            tracking_accuracy: None,
            switch_speed: None,
            hit_positions: Some(vec![Point::new(1.0, -2.0)]),
            miss_positions: None,
        }
    }

    fn calibration(user: &str, sensitivity: f64) -> CalibrationSubmission {
        CalibrationSubmission {
            user_id: user.to_string(),
            test_type: "circle-tracking".to_string(),
            dpi: 800,
            in_game_sensitivity: sensitivity,
            inches_per_360: 360.0 / (800.0 * sensitivity),
            accuracy_percentage: 70.0,
            reaction_time_ms: 280.0,
            consistency_score: 65.0,
            path_efficiency: 82.0,
            movement_smoothness: 58.0,
            overshoot_rate: 0.3,
            undershoot_rate: 0.1,
            correction_rate: 0.4,
            prediction_accuracy: 50.0,
        }
    }

    #[test]
    fn test_result_roundtrip_keeps_typed_arrays() {
        let mut db = StatsDb::open_in_memory().unwrap();
        let submitted = result(TestMode::Flick, 3, 1);
        let id = db.submit_result(&submitted).unwrap();

        let stored = db.recent_results(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].result, submitted);
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let mut db = StatsDb::open_in_memory().unwrap();
        let mut bad = result(TestMode::Gridshot, 2, 2);
        bad.total_shots = 5;
        assert_matches!(db.submit_result(&bad), Err(ReticleError::Validation(_)));
        assert_eq!(db.result_count().unwrap(), 0);
    }

    #[test]
    fn test_recent_results_newest_first() {
        let mut db = StatsDb::open_in_memory().unwrap();
        db.submit_result(&result(TestMode::Gridshot, 1, 0)).unwrap();
        db.submit_result(&result(TestMode::Switch, 2, 0)).unwrap();
        db.submit_result(&result(TestMode::Track, 0, 4)).unwrap();

        let recent = db.recent_results(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].result.test_mode, TestMode::Track);
        assert_eq!(recent[1].result.test_mode, TestMode::Switch);
    }

    #[test]
    fn test_calibration_runs_per_user() {
        let mut db = StatsDb::open_in_memory().unwrap();
        db.submit_calibration(&calibration("alice", 0.5)).unwrap();
        db.submit_calibration(&calibration("bob", 0.7)).unwrap();
        db.submit_calibration(&calibration("alice", 0.9)).unwrap();

        let runs = db.calibration_runs("alice").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].sensitivity, 0.5);
        assert_eq!(runs[1].sensitivity, 0.9);
        assert!((runs[0].cm_per_360 - 360.0 / 400.0 * 2.54).abs() < 1e-9);
        assert!(db.calibration_runs("carol").unwrap().is_empty());
    }

    #[test]
    fn test_persisted_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.db");
        {
            let mut db = StatsDb::open(&path).unwrap();
            db.submit_result(&result(TestMode::Gridshot, 5, 1)).unwrap();
        }
        let db = StatsDb::open(&path).unwrap();
        assert_eq!(db.result_count().unwrap(), 1);
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = StatsDb::open_in_memory().unwrap();
        db.submit_result(&result(TestMode::Gridshot, 4, 1)).unwrap();
        db.submit_result(&result(TestMode::Flick, 2, 2)).unwrap();

        let path = dir.path().join("history.csv");
        assert_eq!(db.export_csv(&path).unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("id,recorded_at,test_mode"));
        assert!(lines.next().unwrap().contains("gridshot"));
        assert!(lines.next().unwrap().contains("flick"));
        assert!(lines.next().is_none());
    }
}
