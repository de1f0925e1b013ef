//! SQLite-backed model repository.

use super::traits::{ModelRepository, StatusUpdate};
use crate::config::DatabaseLocation;
use crate::error::{AutoMlError, Result};
use crate::models::{ModelRecord, ModelStatus, NewModelRecord};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "uuid, name, model_path, target_feature, problem_type, time_limit, \
     eval_metric, presets, verbosity, status, best_score, best_model_name, error_message, \
     dataset_filename, created_at, updated_at";

/// SQLite model repository.
///
/// Thread-safe via an internal mutex on the connection; every write runs in
/// its own transaction.
pub struct SqliteModelRepository {
    db_path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteModelRepository {
    /// Create or open a repository at the given database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| AutoMlError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| AutoMlError::Persistence {
            message: format!("Failed to open model database: {}", e),
            source: Some(e),
        })?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;

        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: Some(db_path),
            conn: Mutex::new(conn),
        })
    }

    /// Create a repository that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            db_path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Open the repository described by a configured location.
    pub fn open(location: &DatabaseLocation) -> Result<Self> {
        match location {
            DatabaseLocation::File(path) => Self::new(path.clone()),
            DatabaseLocation::InMemory => Self::in_memory(),
        }
    }

    /// Database file, or `None` for in-memory repositories.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trained_models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                model_path TEXT NOT NULL DEFAULT '',
                target_feature TEXT NOT NULL,
                problem_type TEXT NOT NULL,
                time_limit INTEGER NOT NULL,
                eval_metric TEXT,
                presets TEXT NOT NULL,
                verbosity INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'training',
                best_score REAL,
                best_model_name TEXT,
                error_message TEXT,
                dataset_filename TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trained_models_created
                ON trained_models(created_at);

            CREATE INDEX IF NOT EXISTS idx_trained_models_status
                ON trained_models(status);
            "#,
        )
        .map_err(|e| AutoMlError::Persistence {
            message: format!("Failed to initialize model schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AutoMlError::persistence("Failed to acquire connection lock"))
    }

    fn query_records(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<ModelRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Convert a row to a ModelRecord.
    fn row_to_record(row: &Row) -> rusqlite::Result<ModelRecord> {
        let time_limit: i64 = row.get(5)?;
        let verbosity: i64 = row.get(8)?;

        Ok(ModelRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            model_path: row.get(2)?,
            target_feature: row.get(3)?,
            problem_type: parse_column(row, 4)?,
            time_limit: time_limit.max(0) as u64,
            eval_metric: row.get(6)?,
            presets: row.get(7)?,
            verbosity: verbosity.clamp(0, u8::MAX as i64) as u8,
            status: parse_column(row, 9)?,
            best_score: row.get(10)?,
            best_model_name: row.get(11)?,
            error_message: row.get(12)?,
            dataset_filename: row.get(13)?,
            created_at: parse_timestamp(row, 14)?,
            updated_at: parse_timestamp(row, 15)?,
        })
    }
}

impl ModelRepository for SqliteModelRepository {
    fn create(&self, draft: &NewModelRecord) -> Result<ModelRecord> {
        let mut conn = self.lock()?;

        let id = Uuid::new_v4().to_string();
        // Stored at microsecond precision; keep the returned record identical.
        let now = Utc::now().trunc_subsecs(6);
        let now_str = format_timestamp(&now);

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO trained_models (uuid, name, model_path, target_feature, problem_type,
                                         time_limit, eval_metric, presets, verbosity, status,
                                         dataset_filename, created_at, updated_at)
             VALUES (?1, ?2, '', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                id,
                draft.name,
                draft.target_feature,
                draft.problem_type.as_str(),
                draft.time_limit as i64,
                draft.eval_metric,
                draft.presets,
                draft.verbosity as i64,
                ModelStatus::Training.as_str(),
                draft.dataset_filename,
                now_str,
            ],
        )
        .map_err(|e| AutoMlError::Persistence {
            message: format!("Failed to create model record: {}", e),
            source: Some(e),
        })?;
        tx.commit()?;

        debug!("Created model record {} ({})", id, draft.name);

        Ok(ModelRecord {
            id,
            name: draft.name.clone(),
            model_path: String::new(),
            target_feature: draft.target_feature.clone(),
            problem_type: draft.problem_type,
            time_limit: draft.time_limit,
            eval_metric: draft.eval_metric.clone(),
            presets: draft.presets.clone(),
            verbosity: draft.verbosity,
            status: ModelStatus::Training,
            best_score: None,
            best_model_name: None,
            error_message: None,
            dataset_filename: draft.dataset_filename.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<ModelRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM trained_models WHERE uuid = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![id], Self::row_to_record)
            .optional()?;
        Ok(record)
    }

    fn get_all(&self) -> Result<Vec<ModelRecord>> {
        let sql = format!(
            "SELECT {} FROM trained_models ORDER BY created_at DESC, id DESC",
            SELECT_COLUMNS
        );
        self.query_records(&sql, &[])
    }

    fn update_status(&self, id: &str, status: ModelStatus, update: StatusUpdate) -> Result<bool> {
        if !status.is_terminal() {
            return Err(AutoMlError::validation(
                "status",
                format!("cannot move a training record to '{}'", status),
            ));
        }
        if status == ModelStatus::Completed
            && !update
                .reconcile
                .as_ref()
                .is_some_and(|r| !r.id.is_empty() && !r.model_path.is_empty())
        {
            return Err(AutoMlError::validation(
                "model_path",
                "a completed model needs an identifier and artifact path",
            ));
        }
        if status == ModelStatus::Failed
            && update
                .error_message
                .as_deref()
                .map_or(true, |m| m.trim().is_empty())
        {
            return Err(AutoMlError::validation(
                "error_message",
                "a failed model needs an error message",
            ));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM trained_models WHERE uuid = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let current: ModelStatus = match current {
            None => return Ok(false),
            Some(s) => s.parse()?,
        };
        if !current.can_transition_to(status) {
            warn!(
                "Ignoring {} update for model {}: result already recorded ({})",
                status, id, current
            );
            return Ok(false);
        }

        let (new_id, model_path) = match &update.reconcile {
            Some(r) => (r.id.as_str(), Some(r.model_path.as_str())),
            None => (id, None),
        };
        let now = format_timestamp(&Utc::now());

        tx.execute(
            "UPDATE trained_models SET
                 uuid = ?1,
                 model_path = COALESCE(?2, model_path),
                 status = ?3,
                 best_score = ?4,
                 best_model_name = ?5,
                 error_message = ?6,
                 updated_at = ?7
             WHERE uuid = ?8",
            params![
                new_id,
                model_path,
                status.as_str(),
                update.best_score,
                update.best_model_name,
                update.error_message,
                now,
                id,
            ],
        )
        .map_err(|e| AutoMlError::Persistence {
            message: format!("Failed to update model status: {}", e),
            source: Some(e),
        })?;
        tx.commit()?;

        if new_id != id {
            debug!("Model {} reconciled to {} ({})", id, new_id, status);
        } else {
            debug!("Model {} moved to {}", id, status);
        }
        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows_affected = tx
            .execute("DELETE FROM trained_models WHERE uuid = ?1", params![id])
            .map_err(|e| AutoMlError::Persistence {
                message: format!("Failed to delete model: {}", e),
                source: Some(e),
            })?;
        tx.commit()?;

        if rows_affected > 0 {
            debug!("Deleted model record: {}", id);
        }
        Ok(rows_affected > 0)
    }

    fn find_by_status(&self, status: ModelStatus) -> Result<Vec<ModelRecord>> {
        let sql = format!(
            "SELECT {} FROM trained_models WHERE status = ?1 ORDER BY created_at DESC, id DESC",
            SELECT_COLUMNS
        );
        self.query_records(&sql, &[&status.as_str()])
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM trained_models", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = AutoMlError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: AutoMlError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
