//! Shared wire types and error taxonomy for Archon Core.
//!
//! Every crate in the workspace converges on [`ErrorKind`] at its
//! boundary so the HTTP and MCP surfaces can map errors to a response
//! shape without downcasting each crate's own error enum.

pub mod error;
pub mod ids;
pub mod timestamp;

pub use error::{ErrorKind, ProtocolError};
pub use ids::{
    EmbeddingId, InvitationId, PageId, PermissionGrantId, ProjectId, RequestId, SessionId,
    SourceId, SprintId, SubjectId, TaskId, WorkflowId,
};
pub use timestamp::Timestamp;
