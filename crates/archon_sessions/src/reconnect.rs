//! JWT reconnection tokens (spec §4.8): `{session_id, exp, iat,
//! purpose="session_reconnect"}`, HMAC-signed, sha256-hashed at rest.

use std::time::Duration;

use archon_protocol::SessionId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SessionError;

const PURPOSE: &str = "session_reconnect";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    session_id: SessionId,
    purpose: String,
    iat: i64,
    exp: i64,
}

pub struct Issued {
    pub token: String,
    pub token_hash: String,
    pub expires_at: archon_protocol::Timestamp,
}

/// Issues and validates reconnection tokens against a single process
/// secret (`MCP_SESSION_SECRET`).
pub struct ReconnectIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl ReconnectIssuer {
    pub fn new(secret: &[u8], expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry,
        }
    }

    pub fn issue(&self, session_id: SessionId) -> Result<Issued, SessionError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::from_std(self.expiry).unwrap_or(chrono::Duration::minutes(15));
        let claims = Claims {
            session_id,
            purpose: PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| SessionError::InvalidToken)?;
        let token_hash = hash_token(&token);
        Ok(Issued { token, token_hash, expires_at: archon_protocol::Timestamp::from_datetime(exp) })
    }

    /// Decodes and validates `token`'s signature, expiry, and purpose, then
    /// checks it names `expected_session`. Does not check the stored hash
    /// or the session's current status — that's `SessionManager::reconnect`'s
    /// job, since only it has the session row.
    pub fn decode(&self, token: &str, expected_session: SessionId) -> Result<(), SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
            match e.kind() {
                JwtErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => SessionError::InvalidToken,
            }
        })?;
        if data.claims.purpose != PURPOSE {
            return Err(SessionError::InvalidToken);
        }
        if data.claims.session_id != expected_session {
            return Err(SessionError::SessionIdMismatch);
        }
        Ok(())
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_for_its_own_session() {
        let issuer = ReconnectIssuer::new(b"test-secret", Duration::from_secs(900));
        let session_id = SessionId::new();
        let issued = issuer.issue(session_id).unwrap();
        assert!(issuer.decode(&issued.token, session_id).is_ok());
    }

    #[test]
    fn token_rejected_for_a_different_session() {
        let issuer = ReconnectIssuer::new(b"test-secret", Duration::from_secs(900));
        let issued = issuer.issue(SessionId::new()).unwrap();
        let err = issuer.decode(&issued.token, SessionId::new()).unwrap_err();
        assert!(matches!(err, SessionError::SessionIdMismatch));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = ReconnectIssuer::new(b"test-secret", Duration::from_secs(0));
        let session_id = SessionId::new();
        let issued = issuer.issue(session_id).unwrap();
        std::thread::sleep(std::time::Duration::from_secs(1));
        let err = issuer.decode(&issued.token, session_id).unwrap_err();
        assert!(matches!(err, SessionError::TokenExpired));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let issuer = ReconnectIssuer::new(b"test-secret", Duration::from_secs(900));
        let err = issuer.decode("not-a-jwt", SessionId::new()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
