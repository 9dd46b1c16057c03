//! Database models

use serde::{Deserialize, Serialize};

use crate::batch::Metrics;

/// Batch run record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BatchRunRecord {
    pub id: String,
    pub job: String,
    pub started_at: String,
    pub finished_at: String,
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub skipped: i64,
    pub cancelled: bool,
}

/// One item of a stored run
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BatchRunItemRecord {
    pub run_id: String,
    pub position: i64,
    pub item_id: String,
    pub label: String,
    pub source_ref: String,
    pub status: String,
    pub reason: Option<String>,
    /// JSON object of counters, only for successful items
    pub metrics: Option<String>,
}

impl BatchRunItemRecord {
    pub fn metrics(&self) -> Metrics {
        self.metrics
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
