//! RAII schema isolation: each guard owns a uniquely-named schema and
//! drops it on cleanup, so tests can run concurrently against a shared
//! database without clobbering each other's rows.

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// Creates a unique schema for one test and drops it on `Drop`, so tests
/// can run concurrently against a shared database.
pub struct SchemaGuard {
    pool: PgPool,
    schema_name: String,
}

impl SchemaGuard {
    pub async fn new(pool: PgPool) -> Result<Self> {
        let schema_name = format!("test_{}", Uuid::new_v4().simple());
        debug!("creating test schema: {}", schema_name);

        sqlx::query(&format!("create schema {schema_name}")).execute(&pool).await?;
        sqlx::query(&format!("set search_path to {schema_name}, public")).execute(&pool).await?;

        Ok(Self { pool, schema_name })
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn cleanup(&self) -> Result<()> {
        debug!("dropping test schema: {}", self.schema_name);
        sqlx::query(&format!("drop schema {} cascade", self.schema_name)).execute(&self.pool).await?;
        Ok(())
    }
}

impl Drop for SchemaGuard {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let schema_name = self.schema_name.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = sqlx::query(&format!("drop schema {schema_name} cascade")).execute(&pool).await {
                    warn!("failed to drop test schema {}: {}", schema_name, e);
                } else {
                    debug!("dropped test schema: {}", schema_name);
                }
            });
        } else {
            warn!("not in async context, cannot drop test schema: {}", self.schema_name);
        }
    }
}
