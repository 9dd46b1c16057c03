//! Database module for SQLite persistence of batch run history

mod migrations;
mod models;
mod repository;

pub use models::{BatchRunItemRecord, BatchRunRecord};
pub use repository::{Database, DatabaseError};
