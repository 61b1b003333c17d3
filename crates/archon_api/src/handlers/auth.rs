//! Auth endpoints (spec §6): passwordless login (a subject is identified
//! by email alone; credential verification is out of scope for this
//! system — it's expected to sit behind an upstream identity provider)
//! and the current user's profile.

use std::sync::Arc;

use archon_db::model::{Role, Subject};
use archon_db::rbac::{get_subject_by_email, put_subject};
use archon_protocol::SubjectId;
use archon_rbac::Principal;
use axum::extract::State;
use axum::{Extension, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub subject: Subject,
}

pub async fn login(State(state): State<Arc<ApiState>>, Json(body): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let secret = state.jwt_secret.as_ref().ok_or_else(|| {
        ApiError::unauthenticated("login is disabled: no JWT_SECRET configured (development mode accepts all requests without a token)")
    })?;

    let subject = match get_subject_by_email(&state.pool, &body.email).await? {
        Some(s) => s,
        None => {
            let s = Subject { id: SubjectId::new(), email: Some(body.email.clone()), role: Role::Member, active: true };
            put_subject(&state.pool, &s).await?;
            s
        }
    };

    if !subject.active {
        return Err(ApiError::unauthenticated("account is deactivated"));
    }

    let claims = Claims { sub: subject.id.as_uuid(), email: subject.email.clone(), role: subject.role, active: Some(true) };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::new(archon_protocol::ErrorKind::Internal, e.to_string()))?;

    Ok(Json(LoginResponse { token, subject }))
}

pub async fn me(Extension(principal): Extension<Principal>) -> ApiResult<Json<Subject>> {
    match principal {
        Principal::Subject(s) => Ok(Json(s)),
        Principal::ServiceRole => Err(ApiError::unauthenticated("no bearer token presented")),
    }
}
