//! Scraper fleet snapshot as reported by `GET /admin/scrapers/status`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::types::{lenient_timestamp, null_as_default};

/// Newest log lines kept from a snapshot
pub const MAX_LOG_LINES: usize = 200;

/// State of one scraper unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Running,
    Completed,
    Error,
    /// Also any state this client does not know about
    #[default]
    #[serde(other)]
    Idle,
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Aggregate state of the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalState {
    Running,
    Completed,
    #[default]
    #[serde(other)]
    Idle,
}

impl std::fmt::Display for GlobalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One scraper (one banca) in the fleet.
///
/// `null` in any field reads as its default; a `lastRun` that does not parse
/// reads as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    #[serde(rename = "banca", default, deserialize_with = "null_as_default")]
    pub unit_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: UnitState,
    #[serde(rename = "progress", default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,
    #[serde(rename = "found", default, deserialize_with = "null_as_default")]
    pub found_count: i64,
    #[serde(rename = "saved", default, deserialize_with = "null_as_default")]
    pub saved_count: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "lastRun", default, deserialize_with = "lenient_timestamp")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Full fleet snapshot. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FleetStatus {
    #[serde(rename = "scrapers", default, deserialize_with = "null_as_default")]
    pub units: Vec<UnitStatus>,
    #[serde(rename = "globalStatus", default, deserialize_with = "null_as_default")]
    pub global_status: GlobalState,
    #[serde(rename = "logs", default, deserialize_with = "null_as_default")]
    pub recent_log_lines: Vec<String>,
}

impl FleetStatus {
    /// Clamp progress into `[0, 100]` and keep only the newest [`MAX_LOG_LINES`]
    pub fn normalized(mut self) -> Self {
        for unit in &mut self.units {
            unit.progress_percent = unit.progress_percent.clamp(0.0, 100.0);
        }
        let excess = self.recent_log_lines.len().saturating_sub(MAX_LOG_LINES);
        if excess > 0 {
            self.recent_log_lines.drain(..excess);
        }
        self
    }

    pub fn running_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == UnitState::Running)
            .count()
    }

    pub fn failed_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == UnitState::Error)
            .count()
    }

    pub fn total_saved(&self) -> i64 {
        self.units.iter().map(|u| u.saved_count).sum()
    }

    pub fn total_found(&self) -> i64 {
        self.units.iter().map(|u| u.found_count).sum()
    }
}
