//! Hierarchy extraction over unprocessed contests

use async_trait::async_trait;

use super::JobSource;
use crate::api::{AdminApiClient, ApiError, ContestRecord};
use crate::batch::{ItemError, ItemExecutor, Metrics, WorkItem};

/// Contests with an edital URL and no extracted hierarchy, in backend order
pub struct UnprocessedContests {
    client: AdminApiClient,
}

impl UnprocessedContests {
    pub fn new(client: AdminApiClient) -> Self {
        Self { client }
    }
}

pub(crate) fn contest_item(record: &ContestRecord) -> WorkItem {
    let label = if record.name.trim().is_empty() {
        record.id.clone()
    } else {
        record.name.clone()
    };
    WorkItem::new(
        record.id.clone(),
        label,
        record.edital_url().unwrap_or_default(),
    )
}

#[async_trait]
impl JobSource for UnprocessedContests {
    async fn load(&self) -> Result<Vec<WorkItem>, ApiError> {
        let records = self.client.list_unprocessed_contests().await?;
        let total = records.len();
        let items: Vec<WorkItem> = records
            .iter()
            .filter(|r| r.edital_url().is_some())
            .map(contest_item)
            .collect();

        if items.len() < total {
            tracing::warn!(
                skipped = total - items.len(),
                "contests without edital_url left out of the batch"
            );
        }
        Ok(items)
    }
}

/// Calls `process-hierarquia` for one contest
pub struct HierarchyExecutor {
    client: AdminApiClient,
}

impl HierarchyExecutor {
    pub fn new(client: AdminApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ItemExecutor for HierarchyExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<Metrics, ItemError> {
        if item.source_ref.trim().is_empty() {
            return Err(ItemError::terminal("missing edital URL"));
        }
        let counts = self
            .client
            .process_hierarchy(&item.id, &item.source_ref)
            .await?;

        let mut metrics = Metrics::new();
        metrics.insert("materias".to_string(), counts.materias);
        metrics.insert("topicos".to_string(), counts.topicos);
        metrics.insert("subtopicos".to_string(), counts.subtopicos);
        Ok(metrics)
    }
}
