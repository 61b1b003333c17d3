//! Test infrastructure shared by Archon Core's crates: a migrated
//! Postgres pool plus schema-isolation guards for running integration
//! tests concurrently against a shared database.
//!
//! # Usage
//!
//! ```rust,ignore
//! use archon_test_utils::TestPgPool;
//!
//! #[tokio::test]
//! async fn roundtrips_a_project() {
//!     let pool = TestPgPool::new().await.unwrap();
//!     // pool.inner() is already migrated; exercise archon_db functions directly.
//! }
//! ```

pub mod cleanup;
pub mod pool;

pub use cleanup::SchemaGuard;
pub use pool::TestPgPool;
