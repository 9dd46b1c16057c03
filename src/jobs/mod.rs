//! Batch jobs offered by the admin client
//!
//! Each job pairs a [`JobSource`] (which items to process) with an
//! [`ItemExecutor`](crate::batch::ItemExecutor) (what to do with one item).

mod drops;
mod hierarchy;

pub use drops::{ContestSelection, ContestsForDrops, DropsExecutor};
pub use hierarchy::{HierarchyExecutor, UnprocessedContests};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::batch::WorkItem;

/// Resolves the items of a batch run
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn load(&self) -> Result<Vec<WorkItem>, ApiError>;
}

/// Kind of batch, also the key under which runs are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchJob {
    /// Extract the hierarchy of every unprocessed contest
    Hierarchy,
    /// Generate drops for a set of contests
    Drops,
}

impl BatchJob {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hierarchy => "hierarchy",
            Self::Drops => "drops",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Hierarchy => "Processamento de hierarquia",
            Self::Drops => "Geração de drops em lote",
        }
    }
}

impl std::fmt::Display for BatchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchJob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hierarchy" | "hierarquia" => Ok(Self::Hierarchy),
            "drops" => Ok(Self::Drops),
            other => Err(format!("Unknown batch job: {}", other)),
        }
    }
}
