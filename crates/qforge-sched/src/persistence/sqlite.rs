//! SQLite-based persistence.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::StateStore;
use crate::error::{SchedError, SchedResult};
use crate::job::{JobId, JobRecord, Progress, StageOutput};

/// A named schema change, applied at most once per database.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Ledger key; must never change once released.
    pub name: &'static str,
    /// SQL batch to execute.
    pub sql: &'static str,
}

/// Schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_create_jobs",
        sql: r#"
            CREATE TABLE jobs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                percentage INTEGER NOT NULL DEFAULT 0,
                current_step TEXT NOT NULL DEFAULT 'submitted',
                result TEXT,
                compilation_target TEXT NOT NULL DEFAULT 'qasm'
            );
        "#,
    },
    Migration {
        name: "0002_create_stage_outputs",
        sql: r#"
            CREATE TABLE stage_outputs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL REFERENCES jobs(id),
                stage TEXT NOT NULL,
                output TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        name: "0003_index_status_and_outputs",
        sql: r#"
            CREATE INDEX idx_jobs_status ON jobs(status);
            CREATE INDEX idx_stage_outputs_job ON stage_outputs(job_id);
        "#,
    },
];

/// SQLite-based state store.
///
/// The schema is created by [`MIGRATIONS`], tracked in a
/// `schema_migrations` ledger table so reopening a database never reapplies
/// a migration.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> SchedResult<Self> {
        Self::with_migrations(path, MIGRATIONS)
    }

    /// Create a new in-memory SQLite store.
    pub fn in_memory() -> SchedResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, MIGRATIONS)
    }

    /// Open a store and bring it up to date with `migrations`.
    pub fn with_migrations(path: impl AsRef<Path>, migrations: &[Migration]) -> SchedResult<Self> {
        Self::from_connection(Connection::open(path)?, migrations)
    }

    fn from_connection(conn: Connection, migrations: &[Migration]) -> SchedResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations(migrations)?;
        Ok(store)
    }

    fn conn(&self) -> SchedResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SchedError::DatabaseError(e.to_string()))
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> SchedResult<T>
    where
        F: FnOnce(&Connection) -> SchedResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| SchedError::DatabaseError(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| SchedError::Internal(format!("database task failed: {e}")))?
    }

    fn run_migrations(&self, migrations: &[Migration]) -> SchedResult<()> {
        let mut conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            "#,
        )?;

        for migration in migrations {
            let applied = conn
                .query_row(
                    "SELECT 1 FROM schema_migrations WHERE name = ?1",
                    params![migration.name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if applied {
                debug!("Migration {} already applied", migration.name);
                continue;
            }

            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, ?2)",
                params![migration.name, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            info!("Applied migration {}", migration.name);
        }

        Ok(())
    }

    /// Names of applied migrations, in application order.
    pub fn applied_migrations(&self) -> SchedResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

fn parse_time(value: &str) -> SchedResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SchedError::PersistenceError(format!("Invalid timestamp '{value}': {e}")))
}

/// Raw `jobs` row.
struct JobRow {
    id: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    percentage: i64,
    current_step: String,
    result: Option<String>,
    compilation_target: String,
}

impl JobRow {
    fn into_record(self) -> SchedResult<JobRecord> {
        let id = JobId::parse(&self.id)
            .map_err(|e| SchedError::PersistenceError(format!("Invalid job id '{}': {e}", self.id)))?;
        let percentage = u8::try_from(self.percentage)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| {
                SchedError::PersistenceError(format!("Invalid percentage {}", self.percentage))
            })?;

        Ok(JobRecord::from_parts(
            id,
            self.status.parse()?,
            parse_time(&self.created_at)?,
            self.completed_at.as_deref().map(parse_time).transpose()?,
            Progress {
                percentage,
                current_step: self.current_step,
            },
            self.result,
            self.compilation_target,
        ))
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()> {
        let job = job.clone();
        self.blocking(move |conn| {
            conn.execute(
                r#"
                INSERT INTO jobs (id, status, created_at, completed_at, percentage, current_step, result, compilation_target)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    job.id.to_string(),
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                    job.completed_at.map(|t| t.to_rfc3339()),
                    job.progress.percentage,
                    job.progress.current_step,
                    job.result,
                    job.compilation_target(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>> {
        let job_id = *job_id;
        let row = self
            .blocking(move |conn| {
                let row = conn
                    .query_row(
                        r#"
                        SELECT id, status, created_at, completed_at, percentage, current_step, result, compilation_target
                        FROM jobs WHERE id = ?1
                        "#,
                        params![job_id.to_string()],
                        |row| {
                            Ok(JobRow {
                                id: row.get(0)?,
                                status: row.get(1)?,
                                created_at: row.get(2)?,
                                completed_at: row.get(3)?,
                                percentage: row.get(4)?,
                                current_step: row.get(5)?,
                                result: row.get(6)?,
                                compilation_target: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(JobRow::into_record).transpose()
    }

    async fn save_job(&self, job: &JobRecord) -> SchedResult<()> {
        let job = job.clone();
        self.blocking(move |conn| {
            // compilation_target is written once, on insert.
            let updated = conn.execute(
                r#"
                UPDATE jobs
                SET status = ?2, completed_at = ?3, percentage = ?4, current_step = ?5, result = ?6
                WHERE id = ?1
                "#,
                params![
                    job.id.to_string(),
                    job.status.as_str(),
                    job.completed_at.map(|t| t.to_rfc3339()),
                    job.progress.percentage,
                    job.progress.current_step,
                    job.result,
                ],
            )?;

            if updated == 0 {
                return Err(SchedError::JobNotFound(job.id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()> {
        let job_id = *job_id;
        let output = output.clone();
        self.blocking(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM jobs WHERE id = ?1",
                    params![job_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Err(SchedError::JobNotFound(job_id.to_string()));
            }

            conn.execute(
                "INSERT INTO stage_outputs (job_id, stage, output, recorded_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    job_id.to_string(),
                    output.stage,
                    output.output,
                    output.recorded_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        let job_id = *job_id;
        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT stage, output, recorded_at FROM stage_outputs WHERE job_id = ?1 ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![job_id.to_string()], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(stage, output, recorded_at)| {
                Ok(StageOutput {
                    stage,
                    output,
                    recorded_at: parse_time(&recorded_at)?,
                })
            })
            .collect()
    }
}
