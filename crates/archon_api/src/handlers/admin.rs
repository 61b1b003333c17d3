//! Admin endpoints (spec §6): user roster and per-project RBAC grants.
//! Every handler here additionally requires the caller to hold the
//! `project:manage` action at global scope, checked inline rather than
//! through a service, since there's no dedicated admin service crate.

use std::sync::Arc;

use archon_db::model::{Invitation, PermissionGrant, Role, Scope, Subject};
use archon_db::rbac::{delete_grant, list_grants_for_project, list_subjects, put_grant, put_subject};
use archon_protocol::{InvitationId, PermissionGrantId, ProjectId};
use archon_rbac::Principal;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

const ADMIN_RESOURCE: &str = "admin";
const ADMIN_MANAGE: &str = "admin:manage";

/// Invitations are single-use and short-lived; seven days balances
/// "long enough to reach an inbox" against a stale link staying valid.
const INVITATION_TTL_DAYS: i64 = 7;

async fn require_admin(state: &ApiState, principal: &Principal) -> ApiResult<()> {
    if state.rbac.authorize(principal, ADMIN_RESOURCE, ADMIN_MANAGE, Scope::Global).await? {
        Ok(())
    } else {
        Err(ApiError::new(archon_protocol::ErrorKind::Forbidden, "admin access required"))
    }
}

pub async fn list_users(State(state): State<Arc<ApiState>>, Extension(principal): Extension<Principal>) -> ApiResult<Json<Vec<Subject>>> {
    require_admin(&state, &principal).await?;
    Ok(Json(list_subjects(&state.pool).await?))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub subject: Subject,
}

pub async fn update_user(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &principal).await?;
    put_subject(&state.pool, &body.subject).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn list_project_members(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Vec<PermissionGrant>>> {
    require_admin(&state, &principal).await?;
    Ok(Json(list_grants_for_project(&state.pool, project_id).await?))
}

#[derive(Deserialize)]
pub struct GrantMemberRequest {
    pub subject_or_role: String,
    pub resource_type: String,
    pub action: String,
}

pub async fn grant_project_member(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<GrantMemberRequest>,
) -> ApiResult<Json<PermissionGrant>> {
    require_admin(&state, &principal).await?;
    let grant = PermissionGrant {
        id: PermissionGrantId::new(),
        subject_or_role: body.subject_or_role,
        resource_type: body.resource_type,
        action: body.action,
        scope: Scope::Project(project_id),
    };
    put_grant(&state.pool, &grant).await?;
    Ok(Json(grant))
}

pub async fn revoke_project_member(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((_project_id, grant_id)): Path<(ProjectId, PermissionGrantId)>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &principal).await?;
    delete_grant(&state.pool, grant_id).await?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}

#[derive(Deserialize)]
pub struct CreateInvitationRequest {
    pub org_id: String,
    pub email: String,
    #[serde(default = "default_invitation_role")]
    pub role: Role,
}

fn default_invitation_role() -> Role {
    Role::Member
}

#[derive(Serialize)]
pub struct CreateInvitationResponse {
    pub invitation: Invitation,
    /// Returned once, here, at creation time; only its hash is persisted.
    pub token: String,
}

pub async fn create_invitation(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateInvitationRequest>,
) -> ApiResult<Json<CreateInvitationResponse>> {
    require_admin(&state, &principal).await?;
    let issued = archon_rbac::issue_invitation(
        &state.pool,
        &body.org_id,
        &body.email,
        body.role,
        chrono::Duration::days(INVITATION_TTL_DAYS),
    )
    .await?;
    Ok(Json(CreateInvitationResponse { invitation: issued.invitation, token: issued.token }))
}

pub async fn revoke_invitation(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(invitation_id): Path<InvitationId>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &principal).await?;
    archon_rbac::revoke_invitation(&state.pool, invitation_id).await?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}

#[derive(Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

/// Open to any authenticated caller — the invitation token itself, not
/// the bearer's existing role, is what authorizes the subject it names.
pub async fn accept_invitation(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<AcceptInvitationRequest>,
) -> ApiResult<Json<Subject>> {
    let subject = archon_rbac::accept_invitation(&state.pool, &body.token).await?;
    Ok(Json(subject))
}
