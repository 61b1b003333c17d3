//! Bearer-JWT authentication middleware (spec §6: `Authorization: Bearer
//! <jwt>`, claims carry `sub`, `role`, and an optional permission list).
//!
//! Generalized from `at-bridge::auth::AuthLayer`'s static-API-key
//! `tower::Layer`/`Service` shape: instead of comparing a fixed secret,
//! this decodes and verifies a JWT and inserts the resulting
//! [`archon_rbac::Principal`] into the request's extensions for handlers
//! (and `archon_mcp`'s transport layer) to read back out.

use std::sync::Arc;
use std::task::{Context, Poll};

use archon_db::model::{Role, Subject};
use archon_protocol::SubjectId;
use archon_rbac::Principal;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub active: Option<bool>,
}

/// A [`tower::Layer`] that wraps services with [`AuthMiddleware`].
///
/// `secret = None` means development mode: every request is treated as
/// [`Principal::ServiceRole`], bypassing RBAC entirely (mirrors the
/// teacher's "no key configured -> allow all" behavior, generalized from
/// "unauthenticated" to "internal caller" since Archon's RBAC has no
/// concept of an anonymous authenticated user).
#[derive(Clone)]
pub struct AuthLayer {
    secret: Option<Arc<String>>,
}

impl AuthLayer {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret: secret.map(Arc::new) }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware { inner, secret: self.secret.clone() }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    secret: Option<Arc<String>>,
}

fn unauthorized(message: &str) -> Response<Body> {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthenticated(message.to_string()))).into_response()
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future =
        std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let secret = self.secret.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let secret = match secret {
                Some(s) => s,
                None => {
                    req.extensions_mut().insert(Principal::ServiceRole);
                    return inner.call(req).await;
                }
            };

            let token = req
                .headers()
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));

            let token = match token {
                Some(t) => t,
                None => return Ok(unauthorized("missing bearer token")),
            };

            let key = DecodingKey::from_secret(secret.as_bytes());
            let claims = match decode::<Claims>(token, &key, &Validation::default()) {
                Ok(data) => data.claims,
                Err(_) => return Ok(unauthorized("invalid or expired token")),
            };

            let principal = Principal::Subject(Subject {
                id: SubjectId(claims.sub),
                email: claims.email,
                role: claims.role,
                active: claims.active.unwrap_or(true),
            });
            req.extensions_mut().insert(principal);
            inner.call(req).await
        })
    }
}
