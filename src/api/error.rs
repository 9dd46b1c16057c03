//! Errors raised by the admin API client

use thiserror::Error;

use crate::batch::{FailureKind, ItemError};

/// Reason used when an error response carries no readable message
pub const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No bearer token configured; the request was not sent
    #[error("missing API token")]
    MissingCredential,

    #[error("connection error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// Non-2xx response; `message` is the backend's own text when it sent one
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("client error: {0}")]
    Client(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_builder() {
            Self::Client(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }

    /// Build an `Http` error from a failed response body
    ///
    /// Looks for `message`, then `error`; anything unreadable becomes [`UNKNOWN_ERROR`].
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error"].iter().find_map(|key| {
                    value
                        .get(*key)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        Self::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transient errors are worth retrying; everything else is final
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) | Self::Timeout => FailureKind::Transient,
            Self::Http { status, .. } if *status == 408 || *status == 429 || *status >= 500 => {
                FailureKind::Transient
            }
            _ => FailureKind::Terminal,
        }
    }
}

impl From<ApiError> for ItemError {
    fn from(error: ApiError) -> Self {
        ItemError {
            kind: error.failure_kind(),
            reason: error.to_string(),
        }
    }
}
