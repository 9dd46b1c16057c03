//! Bulk drop generation, one contest at a time

use async_trait::async_trait;
use std::collections::HashMap;

use super::hierarchy::contest_item;
use super::JobSource;
use crate::api::{AdminApiClient, ApiError, DropsBatchRequest};
use crate::batch::{ItemError, ItemExecutor, Metrics, WorkItem};

/// Which contests a drops batch covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContestSelection {
    /// Every contest, in backend order
    All,
    /// These contest ids, in this order
    Ids(Vec<String>),
}

pub struct ContestsForDrops {
    client: AdminApiClient,
    selection: ContestSelection,
}

impl ContestsForDrops {
    pub fn new(client: AdminApiClient, selection: ContestSelection) -> Self {
        Self { client, selection }
    }
}

#[async_trait]
impl JobSource for ContestsForDrops {
    async fn load(&self) -> Result<Vec<WorkItem>, ApiError> {
        let records = self.client.list_contests().await?;
        match &self.selection {
            ContestSelection::All => Ok(records.iter().map(contest_item).collect()),
            ContestSelection::Ids(ids) => {
                let by_id: HashMap<&str, _> =
                    records.iter().map(|r| (r.id.as_str(), r)).collect();
                // Caller order wins; unknown ids still go to the backend, which decides
                Ok(ids
                    .iter()
                    .map(|id| match by_id.get(id.as_str()) {
                        Some(record) => contest_item(record),
                        None => {
                            tracing::warn!(%id, "contest not in listing, keeping it anyway");
                            WorkItem::new(id.clone(), id.clone(), "")
                        }
                    })
                    .collect())
            }
        }
    }
}

/// Calls `gerar-drops-lote` for one contest
pub struct DropsExecutor {
    client: AdminApiClient,
    request: DropsBatchRequest,
}

impl DropsExecutor {
    pub fn new(client: AdminApiClient, limit: u32, prioritize_by_incidence: bool) -> Self {
        Self {
            client,
            request: DropsBatchRequest {
                limite: limit,
                priorizar_por_incidencia: prioritize_by_incidence,
            },
        }
    }
}

#[async_trait]
impl ItemExecutor for DropsExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<Metrics, ItemError> {
        let response = self
            .client
            .generate_drops_batch(&item.id, self.request)
            .await?;

        let mut metrics = Metrics::new();
        metrics.insert(
            "subtopicos_processados".to_string(),
            response.subtopicos_processados,
        );
        Ok(metrics)
    }
}
