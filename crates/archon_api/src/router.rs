//! Builds the full Axum router: REST routes, the mounted MCP transport,
//! and the auth/CORS/trace middleware stack (spec §4.12, generalizing
//! `at-bridge::http_api::router::api_router_with_auth`).

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthLayer;
use crate::handlers::{admin, auth, documents, health, knowledge, knowledge_links, mcp_sessions, projects, reports, sprints, tasks};
use crate::state::ApiState;

/// `jwt_secret = None` runs in development mode: `AuthLayer` inserts
/// `Principal::ServiceRole` for every request and nothing is enforced.
pub fn router(state: Arc<ApiState>, mcp_dispatcher: Arc<archon_mcp::McpDispatcher>, cors_origins: Vec<String>) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins).allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any)
    };

    let auth_layer = AuthLayer::new(state.jwt_secret.as_ref().map(|s| s.as_str().to_string()));

    let knowledge_routes = Router::new()
        .route("/api/knowledge-items/crawl", post(knowledge::crawl))
        .route("/api/documents/upload", post(knowledge::upload))
        .route("/api/progress/{progress_id}", get(knowledge::get_progress))
        .route("/api/progress/{progress_id}/cancel", post(knowledge::cancel_progress))
        .route("/api/knowledge/search", post(knowledge::search))
        .route("/api/knowledge-links", post(knowledge_links::create).get(knowledge_links::list_for_entity))
        .route("/api/knowledge-links/{link_id}", axum::routing::delete(knowledge_links::delete));

    let project_routes = Router::new()
        .route("/api/projects", post(projects::create).get(projects::list))
        .route("/api/projects/{project_id}", get(projects::get))
        .route("/api/projects/{project_id}/reparent", post(projects::reparent))
        .route("/api/projects/{project_id}/archive", post(projects::archive))
        .route("/api/projects/{project_id}/unarchive", post(projects::unarchive))
        .route("/api/projects/{project_id}/reassign-workflow", post(projects::reassign_workflow))
        .route("/api/workflows/{workflow_id}", get(projects::get_workflow))
        .route("/api/workflows", put(projects::put_workflow))
        .route("/api/projects/{project_id}/documents/upload", post(knowledge::project_upload))
        .route("/api/projects/{project_id}/documents/crawl", post(knowledge::project_crawl))
        .route("/api/projects/{project_id}/documents", get(documents::list))
        .route("/api/projects/{project_id}/documents/{source_id}/promote", post(documents::promote))
        .route("/api/projects/{project_id}/documents/{source_id}", axum::routing::delete(documents::delete))
        .route("/api/projects/{project_id}/tasks", post(tasks::create).get(tasks::list))
        .route("/api/tasks/{task_id}", get(tasks::get))
        .route("/api/tasks/{task_id}/assign", post(tasks::assign))
        .route("/api/projects/{project_id}/tasks/{task_id}/transition", post(tasks::transition))
        .route("/api/projects/{project_id}/tasks/{task_id}/reorder", post(tasks::reorder))
        .route("/api/projects/{project_id}/sprints", post(sprints::create).get(sprints::list))
        .route("/api/projects/{project_id}/sprints/{sprint_id}/start", post(sprints::start))
        .route("/api/projects/{project_id}/sprints/{sprint_id}/complete", post(sprints::complete))
        .route("/api/projects/{project_id}/sprints/{sprint_id}/cancel", post(sprints::cancel))
        .route("/api/projects/{project_id}/reports/health", get(reports::health))
        .route("/api/projects/{project_id}/reports/sprints/{sprint_id}", get(reports::sprint_report))
        .route("/api/projects/{project_id}/reports/task-metrics", get(reports::task_metrics))
        .route("/api/projects/{project_id}/reports/team-performance", get(reports::team_performance));

    let mcp_admin_routes = Router::new()
        .route("/api/mcp/clients", get(mcp_sessions::list_clients))
        .route("/api/mcp/sessions", get(mcp_sessions::list_sessions))
        .route("/api/mcp/sessions/health", get(mcp_sessions::sessions_health))
        .route("/api/mcp/sessions/{id}", get(mcp_sessions::get_session))
        .route("/api/mcp/sessions/{id}/reconnect", post(mcp_sessions::reconnect))
        .route("/api/mcp/sessions/{id}/token", get(mcp_sessions::issue_token))
        .route("/api/mcp/errors", get(mcp_sessions::list_errors));

    let auth_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/users/me", get(auth::me))
        .route("/api/auth/invitations/accept", post(admin::accept_invitation));

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::list_users).put(admin::update_user))
        .route(
            "/api/admin/projects/{project_id}/members",
            get(admin::list_project_members).post(admin::grant_project_member),
        )
        .route("/api/admin/projects/{project_id}/members/{grant_id}", axum::routing::delete(admin::revoke_project_member))
        .route("/api/admin/invitations", post(admin::create_invitation))
        .route("/api/admin/invitations/{invitation_id}", axum::routing::delete(admin::revoke_invitation));

    let authenticated = Router::new()
        .merge(knowledge_routes)
        .merge(project_routes)
        .merge(mcp_admin_routes)
        .merge(auth_routes)
        .merge(admin_routes)
        .route_layer(auth_layer.clone());

    // `/metrics` shares `ApiState` but sits outside the auth layer, same as `/healthz`.
    let state_routes = Router::new().route("/metrics", get(health::metrics)).merge(authenticated).with_state(state);

    let mcp_routes = archon_mcp::router(mcp_dispatcher).route_layer(auth_layer);

    Router::new()
        .route("/healthz", get(health::healthz))
        .merge(state_routes)
        .merge(mcp_routes)
        .layer(TraceLayer::new_for_http().on_request(|_: &axum::http::Request<_>, _: &tracing::Span| {}).on_response(
            |response: &axum::http::Response<_>, latency: Duration, _: &tracing::Span| {
                tracing::info!(status = response.status().as_u16(), latency_ms = latency.as_millis() as u64, "request completed")
            },
        ))
        .layer(cors)
}
