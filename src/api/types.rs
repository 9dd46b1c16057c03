//! Wire types for the admin endpoints used by batch jobs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Contest record as listed by `GET /admin/contests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub edital_url: Option<String>,
}

impl ContestRecord {
    /// Edital URL, if present and not blank
    pub fn edital_url(&self) -> Option<&str> {
        self.edital_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// The backend wraps lists in `{ "data": [...] }`; some deployments send the bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContestList {
    Wrapped {
        #[serde(default)]
        data: Vec<ContestRecord>,
    },
    Bare(Vec<ContestRecord>),
}

impl ContestList {
    pub(crate) fn into_records(self) -> Vec<ContestRecord> {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(records) => records,
        }
    }
}

/// Body of `POST /admin/contests/{id}/process-hierarquia`
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyRequest<'a> {
    #[serde(rename = "editalUrl")]
    pub edital_url: &'a str,
}

/// Counts of extracted nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyCounts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub materias: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topicos: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtopicos: i64,
}

/// Body of `POST /admin/concursos/{id}/gerar-drops-lote`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DropsBatchRequest {
    pub limite: u32,
    pub priorizar_por_incidencia: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropsBatchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtopicos_processados: i64,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Health counters from `GET /admin/stats`; every field is optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub api_status: Option<String>,
    #[serde(default)]
    pub db_status: Option<String>,
    #[serde(default)]
    pub active_jobs: Option<i64>,
    #[serde(default)]
    pub failed_jobs: Option<i64>,
}

/// Newer backends nest the counters under `system`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatsEnvelope {
    Nested { system: SystemStats },
    Flat(SystemStats),
}

impl StatsEnvelope {
    pub(crate) fn into_stats(self) -> SystemStats {
        match self {
            Self::Nested { system } => system,
            Self::Flat(stats) => stats,
        }
    }
}

/// Bucket of the backend job queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    #[default]
    Failed,
    Active,
    Waiting,
    Completed,
}

impl QueueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
        }
    }

    /// Only failed jobs can be sent back to the queue
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failed" => Ok(Self::Failed),
            "active" => Ok(Self::Active),
            "waiting" => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "unknown queue state '{}' (expected failed, active, waiting or completed)",
                other
            )),
        }
    }
}

/// One job as listed by `GET /admin/queues/jobs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(rename = "attemptsMade", default, deserialize_with = "null_as_default")]
    pub attempts_made: i64,
    #[serde(rename = "failedReason", default)]
    pub failed_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueJobList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) data: Vec<QueueJob>,
}

/// `null` reads as the type's default, same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339, a naive `YYYY-MM-DD HH:MM:SS` (taken as UTC) or epoch
/// milliseconds. Anything else reads as `None` instead of failing the whole payload.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => parse_timestamp(s.trim()),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
