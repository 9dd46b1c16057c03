//! MemoDrops Admin - cliente de administración para el backend de MemoDrops
//!
//! Ejecuta trabajos por lotes de forma secuencial (un concurso a la vez, con
//! una pausa fija entre elementos) y refleja el estado de la flota de scrapers
//! mediante consultas periódicas.
//!
//! # Arquitectura
//!
//! - **Batch runner**: procesa una lista de [`batch::WorkItem`] en orden estricto,
//!   publica el progreso por un canal `watch` y admite cancelación
//! - **Status poller**: consulta `GET /admin/scrapers/status` a intervalo fijo;
//!   una consulta fallida conserva la última instantánea buena
//! - **Jobs**: fuentes de elementos y ejecutores sobre la API REST de administración
//! - **Historial**: cada ejecución terminada se guarda en SQLite
//!
//! # Módulos Principales
//!
//! - [`batch`] - Runner secuencial, progreso y reintentos
//! - [`fleet`] - Instantánea de la flota y poller
//! - [`api`] - Cliente HTTP de la API de administración
//! - [`jobs`] - Lotes de hierarquia y de drops
//! - [`db`] - Historial de ejecuciones
//! - [`ui`] - Vistas de terminal con ratatui y salida `--plain`
//!
//! # Ejemplo de Uso
//!
//! ```rust,no_run
//! use memodrops::api::AdminApiClient;
//! use memodrops::batch::{RunnerConfig, SequentialRunner};
//! use memodrops::config::AppConfig;
//! use memodrops::jobs::{HierarchyExecutor, JobSource, UnprocessedContests};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load(None)?;
//! let client = AdminApiClient::new(&config.api_url, config.credential(), config.request_timeout())?;
//!
//! let items = UnprocessedContests::new(client.clone()).load().await?;
//! let runner = SequentialRunner::new(config.runner_config());
//! let summary = runner.start(items, &HierarchyExecutor::new(client)).await?;
//! println!("{} ok, {} falhas", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod batch;
pub mod config;
pub mod db;
pub mod fleet;
pub mod jobs;
pub mod logging;
pub mod ui;

pub use api::{AdminApiClient, ApiError};
pub use batch::{RunProgress, RunSummary, SequentialRunner, WorkItem};
pub use config::AppConfig;
pub use db::Database;
pub use fleet::{FleetStatus, StatusPoller};
pub use jobs::BatchJob;
