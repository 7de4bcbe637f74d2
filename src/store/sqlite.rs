//! SQLite-backed resource store.
//!
//! One connection behind a mutex; every statement is short and
//! synchronous, so handlers call the store directly without a
//! blocking-pool hop. Timestamps are stored as RFC 3339 text so the
//! rows serialize to the same shapes the API emits.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use super::{
    CronJob, JobStatus, LogEntry, LogLevel, Metric, NewTask, StoreError, Task, TaskPatch,
    TaskPriority, TaskStatus,
};
use crate::fixtures;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'todo',
    priority TEXT NOT NULL DEFAULT 'medium',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    assignee TEXT
);
CREATE TABLE IF NOT EXISTS cron_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    schedule TEXT NOT NULL,
    command TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_run TEXT,
    next_run TEXT,
    status TEXT NOT NULL DEFAULT 'idle'
);
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    model TEXT NOT NULL,
    tokens_input INTEGER NOT NULL DEFAULT 0,
    tokens_output INTEGER NOT NULL DEFAULT 0,
    cost REAL NOT NULL DEFAULT 0.0
);
CREATE TABLE IF NOT EXISTS log_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    level TEXT NOT NULL DEFAULT 'INFO',
    source TEXT NOT NULL DEFAULT 'system',
    message TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'offline',
    type TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS agent_relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL REFERENCES agents(id),
    related_agent_id TEXT NOT NULL REFERENCES agents(id)
);
";

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // Use SQLite's documented default of unenforced foreign keys. The
        // bundled library is compiled with SQLITE_DEFAULT_FOREIGN_KEYS=1,
        // which is non-standard; the agent_relations schema is present only
        // for parity (the fixture registry is the authoritative reader), so
        // restore the standard behavior the rest of the code assumes.
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Tasks ─────────────────────────────────────────────────────

    pub fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, priority, created_at, updated_at, assignee
             FROM tasks ORDER BY id",
        )?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn get_task(&self, id: i64) -> Result<Task, StoreError> {
        get_task_inner(&self.conn(), id)
    }

    /// Insert a new task. Both timestamps are set to the same instant.
    pub fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tasks (title, description, status, priority, created_at, updated_at, assignee)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.title,
                new.description,
                new.status.as_str(),
                new.priority.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                new.assignee,
            ],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            created_at: now,
            updated_at: now,
            assignee: new.assignee,
        })
    }

    /// Apply a partial update; absent fields keep their current value.
    /// Always refreshes `updated_at`.
    pub fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, StoreError> {
        let conn = self.conn();
        let mut task = get_task_inner(&conn, id)?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            task.assignee = Some(assignee);
        }
        task.updated_at = Utc::now();

        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4,
             updated_at = ?5, assignee = ?6 WHERE id = ?7",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.updated_at.to_rfc3339(),
                task.assignee,
                id,
            ],
        )?;
        Ok(task)
    }

    /// Delete a task, returning the removed record.
    pub fn delete_task(&self, id: i64) -> Result<Task, StoreError> {
        let conn = self.conn();
        let task = get_task_inner(&conn, id)?;
        conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(task)
    }

    // ── Cron jobs ─────────────────────────────────────────────────

    pub fn list_jobs(&self) -> Result<Vec<CronJob>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, schedule, command, is_active, last_run, next_run, status
             FROM cron_jobs ORDER BY id",
        )?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    pub fn get_job(&self, id: i64) -> Result<CronJob, StoreError> {
        get_job_inner(&self.conn(), id)
    }

    /// Record the start of a manual run: `last_run = now`,
    /// `status = running`.
    pub fn mark_job_running(&self, id: i64) -> Result<CronJob, StoreError> {
        let conn = self.conn();
        let mut job = get_job_inner(&conn, id)?;
        job.last_run = Some(Utc::now());
        job.status = JobStatus::Running;
        conn.execute(
            "UPDATE cron_jobs SET last_run = ?1, status = ?2 WHERE id = ?3",
            params![
                job.last_run.map(|t| t.to_rfc3339()),
                job.status.as_str(),
                id
            ],
        )?;
        Ok(job)
    }

    pub fn set_job_status(&self, id: i64, status: JobStatus) -> Result<CronJob, StoreError> {
        let conn = self.conn();
        let mut job = get_job_inner(&conn, id)?;
        job.status = status;
        conn.execute(
            "UPDATE cron_jobs SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(job)
    }

    /// Flip `is_active`, returning the updated job.
    pub fn toggle_job(&self, id: i64) -> Result<CronJob, StoreError> {
        let conn = self.conn();
        let mut job = get_job_inner(&conn, id)?;
        job.is_active = !job.is_active;
        conn.execute(
            "UPDATE cron_jobs SET is_active = ?1 WHERE id = ?2",
            params![job.is_active, id],
        )?;
        Ok(job)
    }

    pub fn delete_job(&self, id: i64) -> Result<CronJob, StoreError> {
        let conn = self.conn();
        let job = get_job_inner(&conn, id)?;
        conn.execute("DELETE FROM cron_jobs WHERE id = ?1", params![id])?;
        Ok(job)
    }

    // ── Log entries ───────────────────────────────────────────────

    /// Append-only persistence for log entries. The table keeps its
    /// own id sequence; the in-memory buffer id is process-scoped.
    pub fn insert_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO log_entries (timestamp, level, source, message) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.timestamp.to_rfc3339(),
                entry.level.as_str(),
                entry.source,
                entry.message,
            ],
        )?;
        Ok(())
    }

    pub fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, level, source, message FROM log_entries
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], row_to_log)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Metrics ───────────────────────────────────────────────────

    pub fn insert_metric(
        &self,
        date: NaiveDate,
        model: &str,
        tokens_input: i64,
        tokens_output: i64,
        cost: f64,
    ) -> Result<Metric, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO metrics (date, model, tokens_input, tokens_output, cost)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![date.to_string(), model, tokens_input, tokens_output, cost],
        )?;
        Ok(Metric {
            id: conn.last_insert_rowid(),
            date,
            model: model.to_string(),
            tokens_input,
            tokens_output,
            cost,
        })
    }

    pub fn list_metrics(&self) -> Result<Vec<Metric>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, date, model, tokens_input, tokens_output, cost FROM metrics ORDER BY id",
        )?;
        let metrics = stmt
            .query_map([], row_to_metric)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(metrics)
    }

    // ── Seeding ───────────────────────────────────────────────────

    /// Populate empty tables with the demo dataset: five Kanban tasks,
    /// four cron jobs, and the agent fixture rows. Safe to call on
    /// every startup.
    pub fn seed_defaults(&self) -> Result<(), StoreError> {
        let task_count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        if task_count == 0 {
            let demo: [(&str, &str, TaskStatus, TaskPriority); 5] = [
                (
                    "Configure OpenClaw",
                    "Initial installation and configuration",
                    TaskStatus::Done,
                    TaskPriority::High,
                ),
                (
                    "Integrate Gmail",
                    "Connect the Gmail skill",
                    TaskStatus::InProgress,
                    TaskPriority::Medium,
                ),
                (
                    "Build dashboard",
                    "Develop the web dashboard",
                    TaskStatus::InProgress,
                    TaskPriority::High,
                ),
                (
                    "Add WebSocket feed",
                    "Implement real-time log streaming",
                    TaskStatus::Todo,
                    TaskPriority::Medium,
                ),
                (
                    "Documentation",
                    "Write the documentation",
                    TaskStatus::Todo,
                    TaskPriority::Low,
                ),
            ];
            for (title, description, status, priority) in demo {
                self.create_task(NewTask {
                    title: title.to_string(),
                    description: Some(description.to_string()),
                    status,
                    priority,
                    assignee: None,
                })?;
            }
        }

        let job_count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM cron_jobs", [], |row| row.get(0))?;
        if job_count == 0 {
            let demo = [
                ("Morning Check", "0 8 * * *", "openclaw heartbeat", true),
                ("Daily Backup", "0 2 * * *", "openclaw backup", true),
                ("Weekly Report", "0 9 * * 1", "openclaw report weekly", false),
                ("Cleanup Logs", "0 3 * * 0", "openclaw logs cleanup", true),
            ];
            let conn = self.conn();
            for (name, schedule, command, is_active) in demo {
                conn.execute(
                    "INSERT INTO cron_jobs (name, schedule, command, is_active, status)
                     VALUES (?1, ?2, ?3, ?4, 'idle')",
                    params![name, schedule, command, is_active],
                )?;
            }
        }

        let agent_count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
        if agent_count == 0 {
            let conn = self.conn();
            for agent in fixtures::default_agents() {
                conn.execute(
                    "INSERT INTO agents (id, name, status, type) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        agent.id,
                        agent.name,
                        agent.status.as_str(),
                        agent.kind.as_str()
                    ],
                )?;
                for related in &agent.relations {
                    conn.execute(
                        "INSERT INTO agent_relations (agent_id, related_agent_id) VALUES (?1, ?2)",
                        params![agent.id, related],
                    )?;
                }
            }
        }

        Ok(())
    }
}

fn get_task_inner(conn: &Connection, id: i64) -> Result<Task, StoreError> {
    conn.query_row(
        "SELECT id, title, description, status, priority, created_at, updated_at, assignee
         FROM tasks WHERE id = ?1",
        params![id],
        row_to_task,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::not_found("task", id),
        other => other.into(),
    })
}

fn get_job_inner(conn: &Connection, id: i64) -> Result<CronJob, StoreError> {
    conn.query_row(
        "SELECT id, name, schedule, command, is_active, last_run, next_run, status
         FROM cron_jobs WHERE id = ?1",
        params![id],
        row_to_job,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::not_found("cron job", id),
        other => other.into(),
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: TaskStatus::parse_lossy(&row.get::<_, String>(3)?),
        priority: TaskPriority::parse_lossy(&row.get::<_, String>(4)?),
        created_at: parse_ts(&row.get::<_, String>(5)?)?,
        updated_at: parse_ts(&row.get::<_, String>(6)?)?,
        assignee: row.get(7)?,
    })
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<CronJob> {
    Ok(CronJob {
        id: row.get(0)?,
        name: row.get(1)?,
        schedule: row.get(2)?,
        command: row.get(3)?,
        is_active: row.get(4)?,
        last_run: parse_opt_ts(row.get(5)?)?,
        next_run: parse_opt_ts(row.get(6)?)?,
        status: JobStatus::parse_lossy(&row.get::<_, String>(7)?),
    })
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: parse_ts(&row.get::<_, String>(1)?)?,
        level: LogLevel::parse_lossy(&row.get::<_, String>(2)?),
        source: row.get(3)?,
        message: row.get(4)?,
    })
}

fn row_to_metric(row: &Row<'_>) -> rusqlite::Result<Metric> {
    Ok(Metric {
        id: row.get(0)?,
        date: parse_date(&row.get::<_, String>(1)?)?,
        model: row.get(2)?,
        tokens_input: row.get(3)?,
        tokens_output: row.get(4)?,
        cost: row.get(5)?,
    })
}

fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
        })
}

fn parse_opt_ts(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

fn parse_date(value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(dir.path().join("test.db")).expect("open store");
        (store, dir)
    }

    #[test]
    fn create_task_applies_defaults_and_equal_timestamps() {
        let (store, _dir) = test_store();
        let task = store
            .create_task(NewTask {
                title: "X".to_string(),
                description: None,
                status: TaskStatus::default(),
                priority: TaskPriority::default(),
                assignee: None,
            })
            .expect("create task");

        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_at, task.updated_at);

        let fetched = store.get_task(task.id).expect("get task");
        assert_eq!(fetched.title, "X");
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[test]
    fn update_task_patches_fields_and_refreshes_updated_at() {
        let (store, _dir) = test_store();
        let task = store
            .create_task(NewTask {
                title: "Original".to_string(),
                description: Some("desc".to_string()),
                status: TaskStatus::Todo,
                priority: TaskPriority::Low,
                assignee: None,
            })
            .expect("create task");

        let updated = store
            .update_task(
                task.id,
                TaskPatch {
                    status: Some(TaskStatus::Done),
                    ..TaskPatch::default()
                },
            )
            .expect("update task");

        assert_eq!(updated.status, TaskStatus::Done);
        // Untouched fields survive the patch
        assert_eq!(updated.title, "Original");
        assert_eq!(updated.description.as_deref(), Some("desc"));
        assert!(updated.updated_at >= task.updated_at);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let (store, _dir) = test_store();
        let err = store
            .update_task(9999, TaskPatch::default())
            .expect_err("should not find task");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn delete_task_returns_record_then_not_found() {
        let (store, _dir) = test_store();
        let task = store
            .create_task(NewTask {
                title: "Doomed".to_string(),
                description: None,
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                assignee: None,
            })
            .expect("create task");

        let deleted = store.delete_task(task.id).expect("delete task");
        assert_eq!(deleted.title, "Doomed");

        let err = store.delete_task(task.id).expect_err("already deleted");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn job_run_lifecycle() {
        let (store, _dir) = test_store();
        store.seed_defaults().expect("seed");

        let running = store.mark_job_running(1).expect("mark running");
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.last_run.is_some());

        let idle = store.set_job_status(1, JobStatus::Idle).expect("set idle");
        assert_eq!(idle.status, JobStatus::Idle);
        // last_run survives the status change
        assert!(idle.last_run.is_some());
    }

    #[test]
    fn toggle_job_flips_is_active() {
        let (store, _dir) = test_store();
        store.seed_defaults().expect("seed");

        let before = store.get_job(1).expect("get job");
        let after = store.toggle_job(1).expect("toggle");
        assert_eq!(after.is_active, !before.is_active);

        let restored = store.toggle_job(1).expect("toggle back");
        assert_eq!(restored.is_active, before.is_active);
    }

    #[test]
    fn unknown_job_operations_are_not_found() {
        let (store, _dir) = test_store();
        assert!(matches!(
            store.mark_job_running(42),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_job(42),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn seed_defaults_is_idempotent() {
        let (store, _dir) = test_store();
        store.seed_defaults().expect("seed once");
        store.seed_defaults().expect("seed twice");

        assert_eq!(store.list_tasks().expect("tasks").len(), 5);
        assert_eq!(store.list_jobs().expect("jobs").len(), 4);
    }

    #[test]
    fn seeded_job_schedule_is_stored_verbatim() {
        let (store, _dir) = test_store();
        store.seed_defaults().expect("seed");

        let job = store.get_job(1).expect("get job");
        assert_eq!(job.schedule, "0 8 * * *");
        // Never computed by this system
        assert!(job.next_run.is_none());
    }

    #[test]
    fn log_entries_persist_and_list_newest_first() {
        let (store, _dir) = test_store();
        let base = Utc::now();
        for i in 0..3 {
            store
                .insert_log(&LogEntry {
                    id: i + 1,
                    timestamp: base + chrono::Duration::seconds(i),
                    level: LogLevel::Info,
                    source: "system".to_string(),
                    message: format!("entry {i}"),
                })
                .expect("insert log");
        }

        let recent = store.recent_logs(2).expect("recent logs");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "entry 2");
        assert_eq!(recent[1].message, "entry 1");
    }

    #[test]
    fn metric_roundtrip() {
        let (store, _dir) = test_store();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
        let metric = store
            .insert_metric(date, "Claude 4 Sonnet", 1200, 340, 1.25)
            .expect("insert metric");
        assert_eq!(metric.model, "Claude 4 Sonnet");

        let metrics = store.list_metrics().expect("list metrics");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].date, date);
        assert_eq!(metrics[0].tokens_input, 1200);
    }
}
