//! Helpers for pulling a [`SubjectId`] out of the request's [`Principal`].

use archon_protocol::SubjectId;
use archon_rbac::Principal;

/// The subject id to attribute internal-caller actions to when no bearer
/// token was presented (`AuthLayer` dev mode, `Principal::ServiceRole`).
/// Not a real subject row; storage layers treat it as an opaque id.
pub const SERVICE_ROLE_SUBJECT: SubjectId = SubjectId(uuid::Uuid::nil());

pub fn subject_id(principal: &Principal) -> SubjectId {
    match principal {
        Principal::Subject(s) => s.id,
        Principal::ServiceRole => SERVICE_ROLE_SUBJECT,
    }
}
