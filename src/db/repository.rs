//! Database repository for batch run history

use super::migrations::INIT_SCHEMA;
use super::models::{BatchRunItemRecord, BatchRunRecord};
use crate::batch::{ItemStatus, RunSummary};
use crate::jobs::BatchJob;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database connection and operations
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::query(INIT_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        Ok(())
    }

    // ========================================================================
    // Run history
    // ========================================================================

    /// Store a finished run and its items; returns the new run id
    pub async fn record_run(
        &self,
        job: BatchJob,
        summary: &RunSummary,
    ) -> Result<String, DatabaseError> {
        let run_id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO batch_runs (id, job, started_at, finished_at, total, succeeded, failed, skipped, cancelled)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run_id)
        .bind(job.as_str())
        .bind(summary.started_at.to_rfc3339())
        .bind(summary.finished_at.to_rfc3339())
        .bind(summary.total as i64)
        .bind(summary.succeeded as i64)
        .bind(summary.failed as i64)
        .bind(summary.skipped as i64)
        .bind(summary.cancelled)
        .execute(&mut *tx)
        .await?;

        for (position, entry) in summary.progress.items.iter().enumerate() {
            let (reason, metrics) = match &entry.status {
                ItemStatus::Success { metrics } => (None, Some(serde_json::to_string(metrics)?)),
                ItemStatus::Failure { reason } => (Some(reason.clone()), None),
                ItemStatus::Pending | ItemStatus::Running => (None, None),
            };

            sqlx::query(
                r#"
                INSERT INTO batch_run_items (run_id, position, item_id, label, source_ref, status, reason, metrics)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&run_id)
            .bind(position as i64)
            .bind(&entry.item.id)
            .bind(&entry.item.label)
            .bind(&entry.item.source_ref)
            .bind(entry.status.as_str())
            .bind(reason)
            .bind(metrics)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(%run_id, job = %job, items = summary.total, "batch run recorded");
        Ok(run_id)
    }

    /// Most recent runs first, optionally restricted to one job
    pub async fn recent_runs(
        &self,
        job: Option<BatchJob>,
        limit: i64,
    ) -> Result<Vec<BatchRunRecord>, DatabaseError> {
        let job = job.map(|j| j.as_str());
        let runs = sqlx::query_as::<_, BatchRunRecord>(
            r#"
            SELECT * FROM batch_runs
            WHERE (? IS NULL OR job = ?)
            ORDER BY finished_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(job)
        .bind(job)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<BatchRunRecord, DatabaseError> {
        sqlx::query_as::<_, BatchRunRecord>("SELECT * FROM batch_runs WHERE id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Run not found: {}", run_id)))
    }

    pub async fn run_items(&self, run_id: &str) -> Result<Vec<BatchRunItemRecord>, DatabaseError> {
        let items = sqlx::query_as::<_, BatchRunItemRecord>(
            "SELECT * FROM batch_run_items WHERE run_id = ? ORDER BY position ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Ids whose most recent attempt in any recorded run of `job` succeeded.
    ///
    /// Items left Pending (cancelled runs) do not count as an attempt, so an
    /// earlier success still stands for them.
    pub async fn succeeded_item_ids(&self, job: BatchJob) -> Result<HashSet<String>, DatabaseError> {
        let ids: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT item_id FROM (
                SELECT i.item_id, i.status,
                       ROW_NUMBER() OVER (
                           PARTITION BY i.item_id
                           ORDER BY r.finished_at DESC, r.rowid DESC
                       ) AS attempt
                FROM batch_run_items i
                JOIN batch_runs r ON r.id = i.run_id
                WHERE r.job = ? AND i.status IN ('success', 'failure')
            )
            WHERE attempt = 1 AND status = 'success'
            "#,
        )
        .bind(job.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
