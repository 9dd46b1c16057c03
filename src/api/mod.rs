//! Backend access: one client, typed endpoints, classified errors

mod client;
mod error;
pub mod types;

pub use client::{AdminApiClient, Credential};
pub use error::{ApiError, UNKNOWN_ERROR};
pub use types::{
    ContestRecord, DropsBatchRequest, DropsBatchResponse, HierarchyCounts, QueueJob, QueueState,
    SystemStats,
};
