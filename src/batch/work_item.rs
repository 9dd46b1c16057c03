//! Work items and their per-run outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric counters reported by a successful item (e.g. `materias: 12`)
pub type Metrics = BTreeMap<String, i64>;

/// One unit of batch work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque identifier, stable across a run
    pub id: String,
    /// Human-readable name for display
    pub label: String,
    /// Remote resource the executor acts on (e.g. an edital URL)
    pub source_ref: String,
}

impl WorkItem {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            source_ref: source_ref.into(),
        }
    }
}

/// Outcome of processing one [`WorkItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ItemResult {
    Success { metrics: Metrics },
    Failure { reason: String },
}

impl ItemResult {
    pub fn success(metrics: Metrics) -> Self {
        Self::Success { metrics }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Lifecycle of an item inside a run: Pending → Running → Success | Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Running,
    Success { metrics: Metrics },
    Failure { reason: String },
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failure { .. })
    }

    /// Short lowercase name, used for storage and plain output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
        }
    }
}

impl From<ItemResult> for ItemStatus {
    fn from(result: ItemResult) -> Self {
        match result {
            ItemResult::Success { metrics } => Self::Success { metrics },
            ItemResult::Failure { reason } => Self::Failure { reason },
        }
    }
}

/// Render metrics as `k=v, k=v` in key order
pub fn format_metrics(metrics: &Metrics) -> String {
    metrics
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_into_status() {
        let mut metrics = Metrics::new();
        metrics.insert("topicos".to_string(), 4);

        let status: ItemStatus = ItemResult::success(metrics.clone()).into();
        assert_eq!(status, ItemStatus::Success { metrics });
        assert!(status.is_terminal());

        let status: ItemStatus = ItemResult::failure("boom").into();
        assert_eq!(status.as_str(), "failure");
        assert!(!ItemStatus::Running.is_terminal());
        assert!(!ItemStatus::Pending.is_terminal());
    }

    #[test]
    fn test_format_metrics_is_ordered() {
        let mut metrics = Metrics::new();
        metrics.insert("topicos".to_string(), 2);
        metrics.insert("materias".to_string(), 1);
        assert_eq!(format_metrics(&metrics), "materias=1, topicos=2");
    }
}
