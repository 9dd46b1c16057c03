//! UI module - terminal views using ratatui, plus `--plain` line output

pub mod animations;
mod app;
pub mod batch_view;
pub mod fleet_view;
pub mod plain;
pub mod theme;

pub use app::{key_action, DashboardApp, KeyAction};
pub use theme::Theme;
