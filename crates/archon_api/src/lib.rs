//! HTTP surface for Archon Core (spec §4.12, §6): REST endpoints for
//! knowledge ingestion/search, projects/tasks/sprints/reports, MCP
//! session administration, and auth — plus the mounted MCP transport
//! from `archon_mcp`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod principal_ext;
pub mod router;
pub mod state;

pub use auth::AuthLayer;
pub use error::{ApiError, ApiResult};
pub use router::router;
pub use state::ApiState;
