//! Typed storage adapter and migration runner for Archon Core.
//!
//! Backed by Postgres with the `pgvector` extension. Cross-entity
//! invariants (task stage belongs to its project's workflow, at most one
//! active sprint per project, ...) are enforced inside a single
//! transaction by the repository methods below, never left to callers.

pub mod error;
pub mod knowledge_links;
pub mod migrations;
pub mod model;
pub mod pool;
pub mod projects;
pub mod rbac;
pub mod search;
pub mod sessions;
pub mod sources;

pub use error::{BackendError, BackendResult};
pub use pool::{DbConfig, DbPool};
