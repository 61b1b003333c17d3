//! Session/Request storage backing C8.

use archon_protocol::{RequestId, SessionId, SubjectId, Timestamp};
use sqlx::Row;

use crate::error::{from_sqlx, BackendResult};
use crate::model::{
    Request, RequestStatus, Session, SessionHealth, SessionStatus, UserContext, UserStats,
};
use crate::pool::DbPool;

pub async fn put_session(pool: &DbPool, session: &Session) -> BackendResult<()> {
    sqlx::query(
        "insert into sessions (id, client_type, client_version, connected_at, last_activity_at, \
         status, disconnect_reason, disconnected_at, reconnect_token_hash, reconnect_expires_at, \
         reconnect_count, user_id, user_email, user_display_name) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
         on conflict (id) do update set \
           client_type = excluded.client_type, client_version = excluded.client_version, \
           last_activity_at = excluded.last_activity_at, status = excluded.status, \
           disconnect_reason = excluded.disconnect_reason, disconnected_at = excluded.disconnected_at, \
           reconnect_token_hash = excluded.reconnect_token_hash, \
           reconnect_expires_at = excluded.reconnect_expires_at, \
           reconnect_count = excluded.reconnect_count",
    )
    .bind(session.id.as_uuid())
    .bind(&session.client_type)
    .bind(&session.client_version)
    .bind(session.connected_at.as_datetime())
    .bind(session.last_activity_at.as_datetime())
    .bind(session_status_str(session.status))
    .bind(&session.disconnect_reason)
    .bind(session.disconnected_at.map(|t| t.as_datetime()))
    .bind(&session.reconnect_token_hash)
    .bind(session.reconnect_expires_at.map(|t| t.as_datetime()))
    .bind(session.reconnect_count)
    .bind(session.user_context.as_ref().and_then(|u| u.user_id).map(|id| id.as_uuid()))
    .bind(session.user_context.as_ref().and_then(|u| u.email.clone()))
    .bind(session.user_context.as_ref().and_then(|u| u.display_name.clone()))
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_session"))?;
    Ok(())
}

pub async fn get_session(pool: &DbPool, id: SessionId) -> BackendResult<Session> {
    let row = sqlx::query(
        "select id, client_type, client_version, connected_at, last_activity_at, status, \
         disconnect_reason, disconnected_at, reconnect_token_hash, reconnect_expires_at, \
         reconnect_count, user_id, user_email, user_display_name from sessions where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_session {id}")))?;
    row_to_session(&row)
}

/// Sessions whose `last_activity_at` is older than `threshold_secs` and
/// are still `active`; used by the reaper (§4.8).
pub async fn list_idle_active_sessions(
    pool: &DbPool,
    threshold_secs: i64,
) -> BackendResult<Vec<SessionId>> {
    let rows = sqlx::query(
        "select id from sessions where status = 'active' \
         and last_activity_at < now() - make_interval(secs => $1)",
    )
    .bind(threshold_secs as f64)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_idle_active_sessions"))?;
    Ok(rows
        .into_iter()
        .map(|r| SessionId(r.try_get("id").unwrap()))
        .collect())
}

/// All sessions, most recently connected first (`GET /api/mcp/sessions`,
/// `GET /api/mcp/clients`).
pub async fn list_sessions(pool: &DbPool) -> BackendResult<Vec<Session>> {
    let rows = sqlx::query(
        "select id, client_type, client_version, connected_at, last_activity_at, status, \
         disconnect_reason, disconnected_at, reconnect_token_hash, reconnect_expires_at, \
         reconnect_count, user_id, user_email, user_display_name from sessions \
         order by connected_at desc",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_sessions"))?;
    rows.iter().map(row_to_session).collect()
}

pub async fn mark_disconnected(
    pool: &DbPool,
    id: SessionId,
    reason: &str,
) -> BackendResult<()> {
    sqlx::query(
        "update sessions set status = 'disconnected', disconnect_reason = $1, disconnected_at = now() \
         where id = $2",
    )
    .bind(reason)
    .bind(id.as_uuid())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "mark_disconnected"))?;
    Ok(())
}

/// Idempotent on `request.id`: a retried record_request with the same id
/// is a no-op on the second call.
pub async fn record_request(pool: &DbPool, request: &Request) -> BackendResult<()> {
    sqlx::query(
        "insert into requests (id, session_id, method, tool_name, status, duration_ms, \
         prompt_tokens, completion_tokens, total_tokens, estimated_cost, error_message, created_at) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
         on conflict (id) do nothing",
    )
    .bind(request.id.as_uuid())
    .bind(request.session_id.as_uuid())
    .bind(&request.method)
    .bind(&request.tool_name)
    .bind(request_status_str(request.status))
    .bind(request.duration_ms)
    .bind(request.prompt_tokens)
    .bind(request.completion_tokens)
    .bind(request.total_tokens)
    .bind(request.estimated_cost)
    .bind(&request.error_message)
    .bind(request.created_at.as_datetime())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "record_request"))?;
    Ok(())
}

/// Full request history for one session, newest first (`GET
/// /api/mcp/sessions/{id}`).
pub async fn list_requests_for_session(pool: &DbPool, session_id: SessionId) -> BackendResult<Vec<Request>> {
    let rows = sqlx::query(
        "select id, session_id, method, tool_name, status, duration_ms, prompt_tokens, \
         completion_tokens, total_tokens, estimated_cost, error_message, created_at \
         from requests where session_id = $1 order by created_at desc",
    )
    .bind(session_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_requests_for_session"))?;
    rows.iter().map(row_to_request).collect()
}

/// Recent failed/timed-out requests across all sessions (`GET
/// /api/mcp/errors`); `severity` narrows by status, `session_id` further
/// restricts to one session.
pub async fn list_error_requests(
    pool: &DbPool,
    severity: Option<RequestStatus>,
    session_id: Option<SessionId>,
    limit: i64,
) -> BackendResult<Vec<Request>> {
    let rows = sqlx::query(
        "select id, session_id, method, tool_name, status, duration_ms, prompt_tokens, \
         completion_tokens, total_tokens, estimated_cost, error_message, created_at \
         from requests \
         where status in ('error', 'timeout') \
           and ($1::text is null or status = $1) \
           and ($2::uuid is null or session_id = $2) \
         order by created_at desc limit $3",
    )
    .bind(severity.map(request_status_str))
    .bind(session_id.map(|s| s.as_uuid()))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_error_requests"))?;
    rows.iter().map(row_to_request).collect()
}

/// Aggregation backing `archon_mcp_user_stats` (spec §4.8): session and
/// request totals for a single subject, computed across all of their
/// sessions rather than materialized in a view.
pub async fn user_stats(pool: &DbPool, subject_id: SubjectId) -> BackendResult<UserStats> {
    let row = sqlx::query(
        "select \
           count(distinct ses.id) as session_count, \
           count(r.id) as request_count, \
           coalesce(sum(r.total_tokens), 0) as total_tokens, \
           coalesce(sum(r.estimated_cost), 0) as total_cost, \
           min(ses.connected_at) as first_activity_at, \
           max(coalesce(r.created_at, ses.connected_at)) as last_activity_at \
         from sessions ses \
         left join requests r on r.session_id = ses.id \
         where ses.user_id = $1",
    )
    .bind(subject_id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, "user_stats"))?;

    Ok(UserStats {
        subject_id,
        session_count: row.try_get("session_count").unwrap(),
        request_count: row.try_get("request_count").unwrap(),
        total_tokens: row.try_get::<i64, _>("total_tokens").unwrap(),
        total_cost: row.try_get::<f64, _>("total_cost").unwrap(),
        first_activity_at: row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("first_activity_at")
            .unwrap()
            .map(Timestamp::from_datetime),
        last_activity_at: row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("last_activity_at")
            .unwrap()
            .map(Timestamp::from_datetime),
    })
}

/// Fleet-wide session health snapshot (spec §4.8): status breakdown, age
/// buckets (`<5m healthy, 5-10m aging, >10m stale`), and 24-hour connection
/// statistics. Two scans over `sessions`, not a view, since the buckets are
/// relative to `now()` and don't benefit from materialization.
pub async fn session_health(pool: &DbPool) -> BackendResult<SessionHealth> {
    let buckets = sqlx::query(
        "select \
           count(*) filter (where status = 'active') as active_count, \
           count(*) filter (where status = 'disconnected') as disconnected_count, \
           count(*) filter (where status = 'active' and last_activity_at > now() - interval '5 minutes') as healthy_count, \
           count(*) filter (where status = 'active' and last_activity_at <= now() - interval '5 minutes' \
             and last_activity_at > now() - interval '10 minutes') as aging_count, \
           count(*) filter (where status = 'active' and last_activity_at <= now() - interval '10 minutes') as stale_count \
         from sessions",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, "session_health.buckets"))?;

    let last_24h = sqlx::query(
        "select \
           count(*) as sessions_last_24h, \
           count(*) filter (where status = 'disconnected') as disconnects_last_24h, \
           avg(extract(epoch from (coalesce(disconnected_at, now()) - connected_at))) as avg_duration_secs \
         from sessions where connected_at > now() - interval '24 hours'",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, "session_health.last_24h"))?;

    Ok(SessionHealth {
        active_count: buckets.try_get("active_count").unwrap(),
        disconnected_count: buckets.try_get("disconnected_count").unwrap(),
        healthy_count: buckets.try_get("healthy_count").unwrap(),
        aging_count: buckets.try_get("aging_count").unwrap(),
        stale_count: buckets.try_get("stale_count").unwrap(),
        sessions_last_24h: last_24h.try_get("sessions_last_24h").unwrap(),
        disconnects_last_24h: last_24h.try_get("disconnects_last_24h").unwrap(),
        avg_duration_secs: last_24h.try_get("avg_duration_secs").unwrap(),
    })
}

fn session_status_str(s: SessionStatus) -> &'static str {
    match s {
        SessionStatus::Active => "active",
        SessionStatus::Disconnected => "disconnected",
    }
}

fn request_status_str(s: RequestStatus) -> &'static str {
    match s {
        RequestStatus::Success => "success",
        RequestStatus::Error => "error",
        RequestStatus::Timeout => "timeout",
    }
}

fn row_to_request(row: &sqlx::postgres::PgRow) -> BackendResult<Request> {
    let status_raw: String = row.try_get("status").unwrap();
    let status = match status_raw.as_str() {
        "success" => RequestStatus::Success,
        "timeout" => RequestStatus::Timeout,
        _ => RequestStatus::Error,
    };
    Ok(Request {
        id: RequestId(row.try_get("id").unwrap()),
        session_id: SessionId(row.try_get("session_id").unwrap()),
        method: row.try_get("method").unwrap(),
        tool_name: row.try_get("tool_name").unwrap(),
        status,
        duration_ms: row.try_get("duration_ms").unwrap(),
        prompt_tokens: row.try_get("prompt_tokens").unwrap(),
        completion_tokens: row.try_get("completion_tokens").unwrap(),
        total_tokens: row.try_get("total_tokens").unwrap(),
        estimated_cost: row.try_get("estimated_cost").unwrap(),
        error_message: row.try_get("error_message").unwrap(),
        created_at: Timestamp::from_datetime(row.try_get("created_at").unwrap()),
    })
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> BackendResult<Session> {
    let status_raw: String = row.try_get("status").unwrap();
    let status = match status_raw.as_str() {
        "active" => SessionStatus::Active,
        _ => SessionStatus::Disconnected,
    };
    let user_id: Option<uuid::Uuid> = row.try_get("user_id").unwrap();
    let user_email: Option<String> = row.try_get("user_email").unwrap();
    let user_display_name: Option<String> = row.try_get("user_display_name").unwrap();
    let user_context = if user_id.is_some() || user_email.is_some() || user_display_name.is_some() {
        Some(UserContext {
            user_id: user_id.map(Into::into),
            email: user_email,
            display_name: user_display_name,
        })
    } else {
        None
    };

    Ok(Session {
        id: SessionId(row.try_get("id").unwrap()),
        client_type: row.try_get("client_type").unwrap(),
        client_version: row.try_get("client_version").unwrap(),
        connected_at: Timestamp::from_datetime(row.try_get("connected_at").unwrap()),
        last_activity_at: Timestamp::from_datetime(row.try_get("last_activity_at").unwrap()),
        status,
        disconnect_reason: row.try_get("disconnect_reason").unwrap(),
        disconnected_at: row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("disconnected_at")
            .unwrap()
            .map(Timestamp::from_datetime),
        reconnect_token_hash: row.try_get("reconnect_token_hash").unwrap(),
        reconnect_expires_at: row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("reconnect_expires_at")
            .unwrap()
            .map(Timestamp::from_datetime),
        reconnect_count: row.try_get("reconnect_count").unwrap(),
        user_context,
    })
}

