//! Idle-session reaper (spec §4.8): every 30 seconds, disconnects sessions
//! whose `last_activity_at` is older than the idle threshold.

use std::time::Duration;

use archon_db::sessions::{list_idle_active_sessions, mark_disconnected};
use archon_db::DbPool;

pub const REAP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_THRESHOLD_SECS: i64 = 300;
pub const IDLE_TIMEOUT_REASON: &str = "idle_timeout";

/// Spawns the reaper loop and returns its handle. Dropping the handle does
/// not stop the task; abort it explicitly on shutdown.
pub fn spawn(pool: DbPool, idle_threshold_secs: i64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            ticker.tick().await;
            match list_idle_active_sessions(&pool, idle_threshold_secs).await {
                Ok(idle) => {
                    for session_id in idle {
                        if let Err(e) = mark_disconnected(&pool, session_id, IDLE_TIMEOUT_REASON).await
                        {
                            tracing::warn!(%session_id, error = %e, "reaper failed to disconnect idle session");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reaper failed to list idle sessions");
                }
            }
        }
    })
}
