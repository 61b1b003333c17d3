//! Permission evaluation (C9): `(subject_or_role, resource_type, action,
//! scope)` grants with an admin short-circuit, a service-role bypass, and
//! a permissive fallback mode when the policy store is unavailable.
//!
//! Storage (grants, subjects, invitations) lives in `archon_db::rbac`; this
//! crate only evaluates.

pub mod error;
pub mod invitations;

use std::sync::atomic::{AtomicBool, Ordering};

use archon_db::model::{Role, Scope, Subject};
use archon_db::rbac::grants_for;
use archon_db::DbPool;

pub use error::RbacError;
pub use invitations::{accept_invitation, issue_invitation, revoke_invitation, IssuedInvitation};

/// The caller an authorization check is evaluated against.
#[derive(Debug, Clone)]
pub enum Principal {
    Subject(Subject),
    /// Backend-internal caller; bypasses all checks (spec §4.9).
    ServiceRole,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Member => "member",
    }
}

pub struct RbacEngine {
    pool: DbPool,
    /// Set when the policy store was unavailable at startup. While set,
    /// every authenticated principal is allowed every action. Intended for
    /// development only; logged prominently whenever it gates a decision.
    permissive_fallback: AtomicBool,
}

impl RbacEngine {
    /// Probes the policy store. If it's unreachable, the engine starts in
    /// permissive-authenticated fallback mode rather than failing startup
    /// (spec §4.9's explicit-configuration fallback).
    pub async fn new(pool: DbPool) -> Self {
        let probe = grants_for(&pool, &[], "__startup_probe__", "__startup_probe__").await;
        let permissive_fallback = probe.is_err();
        if permissive_fallback {
            tracing::warn!(
                "RBAC policy store unavailable at startup; entering permissive-authenticated \
                 fallback mode — every authenticated user is allowed all actions until the \
                 store recovers and the process is restarted"
            );
        }
        Self {
            pool,
            permissive_fallback: AtomicBool::new(permissive_fallback),
        }
    }

    pub async fn authorize(
        &self,
        principal: &Principal,
        resource_type: &str,
        action: &str,
        scope: Scope,
    ) -> Result<bool, RbacError> {
        let subject = match principal {
            Principal::ServiceRole => return Ok(true),
            Principal::Subject(s) => s,
        };

        if self.permissive_fallback.load(Ordering::Relaxed) {
            tracing::warn!(
                subject_id = %subject.id,
                resource_type,
                action,
                "authorization granted via permissive RBAC fallback mode"
            );
            return Ok(true);
        }

        if subject.role == Role::Admin {
            return Ok(true);
        }
        if !subject.active {
            return Ok(false);
        }

        let keys = vec![subject.id.to_string(), role_name(subject.role).to_string()];
        let grants = grants_for(&self.pool, &keys, resource_type, action).await?;

        Ok(grants.iter().any(|g| scope_matches(g.scope, scope)))
    }
}

fn scope_matches(granted: Scope, requested: Scope) -> bool {
    match (granted, requested) {
        (Scope::Global, _) => true,
        (Scope::Project(granted), Scope::Project(requested)) => granted == requested,
        (Scope::Project(_), Scope::Global) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_protocol::ProjectId;

    #[test]
    fn global_grant_matches_any_requested_scope() {
        let project = ProjectId::new();
        assert!(scope_matches(Scope::Global, Scope::Global));
        assert!(scope_matches(Scope::Global, Scope::Project(project)));
    }

    #[test]
    fn project_grant_matches_only_the_same_project() {
        let a = ProjectId::new();
        let b = ProjectId::new();
        assert!(scope_matches(Scope::Project(a), Scope::Project(a)));
        assert!(!scope_matches(Scope::Project(a), Scope::Project(b)));
        assert!(!scope_matches(Scope::Project(a), Scope::Global));
    }

    #[test]
    fn role_name_matches_storage_convention() {
        assert_eq!(role_name(Role::Admin), "admin");
        assert_eq!(role_name(Role::Member), "member");
    }
}
