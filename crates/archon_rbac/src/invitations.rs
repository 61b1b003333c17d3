//! Invitation lifecycle (spec §3/§4.9): issue a token-bearing invitation,
//! accept it to create or reactivate a subject, or revoke it before it's
//! used. Expiry is checked lazily at accept time rather than by a
//! background sweep.

use archon_db::model::{Invitation, InvitationStatus, Role, Subject};
use archon_db::rbac::{get_invitation_by_token_hash, get_subject_by_email, put_invitation, put_subject, update_invitation_status};
use archon_db::{BackendError, DbPool};
use archon_protocol::{InvitationId, SubjectId, Timestamp};
use sha2::{Digest, Sha256};

use crate::error::RbacError;

pub struct IssuedInvitation {
    pub invitation: Invitation,
    /// The raw bearer token; only returned here, never persisted — the
    /// stored row keeps `token_hash` only.
    pub token: String,
}

/// Issues a pending invitation for `email` at `role`, valid for `ttl`.
/// Rejects a second pending invitation for the same `(org_id, email)` via
/// the partial unique index `archon_db::rbac::put_invitation` relies on.
pub async fn issue_invitation(
    pool: &DbPool,
    org_id: &str,
    email: &str,
    role: Role,
    ttl: chrono::Duration,
) -> Result<IssuedInvitation, RbacError> {
    let token = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
    let invitation = Invitation {
        id: InvitationId::new(),
        org_id: org_id.to_string(),
        email: email.to_string(),
        role,
        token_hash: hash_token(&token),
        status: InvitationStatus::Pending,
        expires_at: Timestamp::from_datetime(chrono::Utc::now() + ttl),
    };
    put_invitation(pool, &invitation).await?;
    Ok(IssuedInvitation { invitation, token })
}

/// Validates `token`, marks its invitation accepted, and upserts (or
/// reactivates) the subject it names at the invited role.
pub async fn accept_invitation(pool: &DbPool, token: &str) -> Result<Subject, RbacError> {
    let invitation = get_invitation_by_token_hash(pool, &hash_token(token)).await.map_err(|e| match e {
        BackendError::NotFound(_) => RbacError::InvalidToken,
        other => RbacError::Storage(other),
    })?;
    if invitation.status != InvitationStatus::Pending {
        return Err(RbacError::InvalidToken);
    }
    if invitation.expires_at.as_datetime() < chrono::Utc::now() {
        update_invitation_status(pool, invitation.id, InvitationStatus::Expired).await?;
        return Err(RbacError::InvitationExpired);
    }

    let subject = match get_subject_by_email(pool, &invitation.email).await? {
        Some(mut existing) => {
            existing.role = invitation.role;
            existing.active = true;
            existing
        }
        None => Subject { id: SubjectId::new(), email: Some(invitation.email.clone()), role: invitation.role, active: true },
    };
    put_subject(pool, &subject).await?;
    update_invitation_status(pool, invitation.id, InvitationStatus::Accepted).await?;
    Ok(subject)
}

pub async fn revoke_invitation(pool: &DbPool, id: InvitationId) -> Result<(), RbacError> {
    Ok(update_invitation_status(pool, id, InvitationStatus::Revoked).await?)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_distinguishes_tokens() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
