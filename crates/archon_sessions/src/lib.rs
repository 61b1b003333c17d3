//! MCP session lifecycle (C8): lazy creation, client_type derivation,
//! request tracking with cost estimation, JWT reconnection, and the idle
//! reaper.

pub mod client_type;
pub mod cost;
pub mod error;
pub mod manager;
pub mod reaper;
pub mod reconnect;

pub use client_type::derive_client_type;
pub use cost::{CostTable, ModelPrice};
pub use error::SessionError;
pub use manager::{ClientInfo, RequestOutcome, SessionManager};
pub use reaper::{DEFAULT_IDLE_THRESHOLD_SECS, IDLE_TIMEOUT_REASON};
pub use reconnect::ReconnectIssuer;
