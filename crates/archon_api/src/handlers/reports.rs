//! Reporting endpoints (spec §4.10-4.11): project health, sprint
//! burndown, task metrics, team performance.

use std::sync::Arc;

use archon_protocol::{ProjectId, SprintId};
use archon_rbac::Principal;
use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::error::ApiResult;
use crate::state::ApiState;
use archon_projects::{ProjectHealthReport, SprintReport, TaskMetricsReport, TeamPerformanceReport};

pub async fn health(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<ProjectHealthReport>> {
    Ok(Json(state.reports.project_health(&principal, project_id).await?))
}

pub async fn sprint_report(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, sprint_id)): Path<(ProjectId, SprintId)>,
) -> ApiResult<Json<SprintReport>> {
    Ok(Json(state.reports.sprint_report(&principal, project_id, sprint_id).await?))
}

pub async fn task_metrics(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<TaskMetricsReport>> {
    Ok(Json(state.reports.task_metrics(&principal, project_id).await?))
}

pub async fn team_performance(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<TeamPerformanceReport>> {
    Ok(Json(state.reports.team_performance(&principal, project_id).await?))
}
