//! Storage for permission grants, subjects, and invitations backing C9.
//! Policy *evaluation* lives in `archon_rbac`; this module only persists
//! and fetches the rows it reasons over.

use archon_protocol::{InvitationId, PermissionGrantId, ProjectId, SubjectId};
use sqlx::Row;

use crate::error::{from_sqlx, BackendError, BackendResult};
use crate::model::{Invitation, InvitationStatus, PermissionGrant, Role, Scope, Subject};
use crate::pool::DbPool;

pub async fn get_subject(pool: &DbPool, id: SubjectId) -> BackendResult<Subject> {
    let row = sqlx::query("select id, email, role, active from subjects where id = $1")
        .bind(id.as_uuid())
        .fetch_one(pool)
        .await
        .map_err(|e| from_sqlx(e, &format!("get_subject {id}")))?;
    Ok(Subject {
        id: SubjectId(row.try_get("id").unwrap()),
        email: row.try_get("email").unwrap(),
        role: role_from_str(&row.try_get::<String, _>("role").unwrap()),
        active: row.try_get("active").unwrap(),
    })
}

pub async fn get_subject_by_email(pool: &DbPool, email: &str) -> BackendResult<Option<Subject>> {
    let row = sqlx::query("select id, email, role, active from subjects where email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| from_sqlx(e, "get_subject_by_email"))?;
    Ok(row.map(|row| Subject {
        id: SubjectId(row.try_get("id").unwrap()),
        email: row.try_get("email").unwrap(),
        role: role_from_str(&row.try_get::<String, _>("role").unwrap()),
        active: row.try_get("active").unwrap(),
    }))
}

/// All subjects, for `GET /api/admin/users`.
pub async fn list_subjects(pool: &DbPool) -> BackendResult<Vec<Subject>> {
    let rows = sqlx::query("select id, email, role, active from subjects order by email nulls last")
        .fetch_all(pool)
        .await
        .map_err(|e| from_sqlx(e, "list_subjects"))?;
    Ok(rows
        .into_iter()
        .map(|row| Subject {
            id: SubjectId(row.try_get("id").unwrap()),
            email: row.try_get("email").unwrap(),
            role: role_from_str(&row.try_get::<String, _>("role").unwrap()),
            active: row.try_get("active").unwrap(),
        })
        .collect())
}

/// Upserts a subject, e.g. on first login or an admin role/active change.
pub async fn put_subject(pool: &DbPool, subject: &Subject) -> BackendResult<()> {
    sqlx::query(
        "insert into subjects (id, email, role, active) values ($1,$2,$3,$4) \
         on conflict (id) do update set email = excluded.email, role = excluded.role, \
           active = excluded.active",
    )
    .bind(subject.id.as_uuid())
    .bind(&subject.email)
    .bind(role_str(subject.role))
    .bind(subject.active)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_subject"))?;
    Ok(())
}

/// All grants scoped to a single project, for `GET
/// /api/admin/projects/{id}/members`.
pub async fn list_grants_for_project(pool: &DbPool, project_id: ProjectId) -> BackendResult<Vec<PermissionGrant>> {
    let rows = sqlx::query(
        "select id, subject_or_role, resource_type, action, scope from permission_grants \
         where scope = $1",
    )
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_grants_for_project"))?;
    rows.into_iter().map(row_to_grant).collect()
}

pub async fn delete_grant(pool: &DbPool, id: PermissionGrantId) -> BackendResult<()> {
    sqlx::query("delete from permission_grants where id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "delete_grant"))?;
    Ok(())
}

fn row_to_grant(row: sqlx::postgres::PgRow) -> BackendResult<PermissionGrant> {
    let scope_raw: String = row.try_get("scope").unwrap();
    let scope = if scope_raw == "*" {
        Scope::Global
    } else {
        Scope::Project(ProjectId(
            scope_raw
                .parse()
                .map_err(|_| crate::error::BackendError::InvalidInput(format!("invalid scope {scope_raw}")))?,
        ))
    };
    Ok(PermissionGrant {
        id: row.try_get::<uuid::Uuid, _>("id").unwrap().into(),
        subject_or_role: row.try_get("subject_or_role").unwrap(),
        resource_type: row.try_get("resource_type").unwrap(),
        action: row.try_get("action").unwrap(),
        scope,
    })
}

/// All grants that could apply to `subject_or_role` (either the subject's
/// own id as a string, or one of the roles it holds), for a given
/// resource type and action. Scope matching (`*` vs exact) is left to the
/// caller (`archon_rbac::authorize`).
pub async fn grants_for(
    pool: &DbPool,
    subject_or_role: &[String],
    resource_type: &str,
    action: &str,
) -> BackendResult<Vec<PermissionGrant>> {
    let rows = sqlx::query(
        "select id, subject_or_role, resource_type, action, scope from permission_grants \
         where subject_or_role = any($1) and resource_type = $2 and action = $3",
    )
    .bind(subject_or_role)
    .bind(resource_type)
    .bind(action)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "grants_for"))?;

    rows.into_iter()
        .map(|row| {
            let scope_raw: String = row.try_get("scope").unwrap();
            let scope = if scope_raw == "*" {
                Scope::Global
            } else {
                Scope::Project(ProjectId(
                    scope_raw
                        .parse()
                        .map_err(|_| crate::error::BackendError::InvalidInput(format!(
                            "invalid scope {scope_raw}"
                        )))?,
                ))
            };
            Ok(PermissionGrant {
                id: row.try_get::<uuid::Uuid, _>("id").unwrap().into(),
                subject_or_role: row.try_get("subject_or_role").unwrap(),
                resource_type: row.try_get("resource_type").unwrap(),
                action: row.try_get("action").unwrap(),
                scope,
            })
        })
        .collect()
}

pub async fn put_grant(pool: &DbPool, grant: &PermissionGrant) -> BackendResult<()> {
    let scope_str = match grant.scope {
        Scope::Global => "*".to_string(),
        Scope::Project(p) => p.to_string(),
    };
    sqlx::query(
        "insert into permission_grants (id, subject_or_role, resource_type, action, scope) \
         values ($1,$2,$3,$4,$5)",
    )
    .bind(grant.id.as_uuid())
    .bind(&grant.subject_or_role)
    .bind(&grant.resource_type)
    .bind(&grant.action)
    .bind(scope_str)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_grant"))?;
    Ok(())
}

/// Rejects a second pending invitation for the same `(org_id, email)` via
/// the partial unique index declared in the schema; the conflict surfaces
/// through [`crate::error::from_sqlx`]'s unique-violation classification.
pub async fn put_invitation(pool: &DbPool, invitation: &Invitation) -> BackendResult<()> {
    sqlx::query(
        "insert into invitations (id, org_id, email, role, token_hash, status, expires_at) \
         values ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(invitation.id.as_uuid())
    .bind(&invitation.org_id)
    .bind(&invitation.email)
    .bind(role_str(invitation.role))
    .bind(&invitation.token_hash)
    .bind(invitation_status_str(invitation.status))
    .bind(invitation.expires_at.as_datetime())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_invitation"))?;
    Ok(())
}

pub async fn get_invitation(pool: &DbPool, id: InvitationId) -> BackendResult<Invitation> {
    let row = sqlx::query(
        "select id, org_id, email, role, token_hash, status, expires_at from invitations where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_invitation {id}")))?;
    Ok(Invitation {
        id: InvitationId(row.try_get("id").unwrap()),
        org_id: row.try_get("org_id").unwrap(),
        email: row.try_get("email").unwrap(),
        role: role_from_str(&row.try_get::<String, _>("role").unwrap()),
        token_hash: row.try_get("token_hash").unwrap(),
        status: invitation_status_from_str(&row.try_get::<String, _>("status").unwrap()),
        expires_at: archon_protocol::Timestamp::from_datetime(row.try_get("expires_at").unwrap()),
    })
}

pub async fn get_invitation_by_token_hash(pool: &DbPool, token_hash: &str) -> BackendResult<Invitation> {
    let row = sqlx::query(
        "select id, org_id, email, role, token_hash, status, expires_at from invitations where token_hash = $1",
    )
    .bind(token_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, "get_invitation_by_token_hash"))?;
    Ok(Invitation {
        id: InvitationId(row.try_get("id").unwrap()),
        org_id: row.try_get("org_id").unwrap(),
        email: row.try_get("email").unwrap(),
        role: role_from_str(&row.try_get::<String, _>("role").unwrap()),
        token_hash: row.try_get("token_hash").unwrap(),
        status: invitation_status_from_str(&row.try_get::<String, _>("status").unwrap()),
        expires_at: archon_protocol::Timestamp::from_datetime(row.try_get("expires_at").unwrap()),
    })
}

/// Transitions a *pending* invitation to `status`. A zero-rows update
/// means it was already accepted/expired/revoked by a concurrent caller.
pub async fn update_invitation_status(pool: &DbPool, id: InvitationId, status: InvitationStatus) -> BackendResult<()> {
    let result = sqlx::query("update invitations set status = $1 where id = $2 and status = 'pending'")
        .bind(invitation_status_str(status))
        .bind(id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "update_invitation_status"))?;
    if result.rows_affected() == 0 {
        return Err(BackendError::Conflict(format!("invitation {id} is not pending")));
    }
    Ok(())
}

fn role_str(r: Role) -> &'static str {
    match r {
        Role::Admin => "admin",
        Role::Member => "member",
    }
}

fn role_from_str(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        _ => Role::Member,
    }
}

fn invitation_status_str(s: InvitationStatus) -> &'static str {
    match s {
        InvitationStatus::Pending => "pending",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Expired => "expired",
        InvitationStatus::Revoked => "revoked",
    }
}

fn invitation_status_from_str(s: &str) -> InvitationStatus {
    match s {
        "accepted" => InvitationStatus::Accepted,
        "expired" => InvitationStatus::Expired,
        "revoked" => InvitationStatus::Revoked,
        _ => InvitationStatus::Pending,
    }
}
