//! Scraper fleet monitoring
//!
//! The fleet runs inside the backend; this side only mirrors its latest
//! snapshot by polling and can ask it to start every scraper.

pub mod poller;
pub mod status;

pub use poller::{poll_once, FleetBackend, PollStats, StatusPoller};
pub use status::{FleetStatus, GlobalState, UnitState, UnitStatus, MAX_LOG_LINES};
