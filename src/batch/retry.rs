//! Clasificación de fallos y reintentos acotados
//!
//! Un fallo por ítem es:
//! - Transitorio: red, timeout, HTTP 408/429/5xx. Se reintenta con backoff exponencial.
//! - Terminal: rechazo de negocio (4xx) o respuesta ilegible. Nunca se reintenta.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Tipo de fallo detectado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Puede tener éxito si se repite (red, timeout, sobrecarga)
    Transient,
    /// Repetir no cambia el resultado
    Terminal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Terminal => write!(f, "terminal"),
        }
    }
}

/// Error devuelto por un executor para un ítem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ItemError {
    pub kind: FailureKind,
    /// Texto legible que termina en `ItemResult::Failure`
    pub reason: String,
}

impl ItemError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            reason: reason.into(),
        }
    }

    pub fn terminal(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Terminal,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

/// Política de reintentos para fallos transitorios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Reintentos además del primer intento; 0 = sin reintentos
    pub max_retries: u32,
    /// Delay base del backoff exponencial
    pub base_backoff: Duration,
    /// Tope del delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Sin reintentos: cada fallo es definitivo para la corrida
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// ¿Debe reintentarse tras `attempt` intentos fallidos (1-indexed)?
    pub fn should_retry(&self, error: &ItemError, attempt: u32) -> bool {
        error.is_transient() && attempt <= self.max_retries
    }

    /// Calcula el delay antes del reintento número `attempt` (1-indexed)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
