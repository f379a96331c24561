//! Bearer sessions for accounts handed over by the identity provider.
//!
//! The raw token is only ever returned to the caller once; the database
//! keeps its SHA-256 hash.

use chrono::{Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::{self, DatabaseError};
use crate::models::{NewUser, User};

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
    pub expires_at: i64,
}

/// Make sure the account exists and open a session for it.
pub fn issue_session(
    conn: &Connection,
    new_user: &NewUser,
    ttl: Duration,
) -> Result<IssuedSession, DatabaseError> {
    let user = db::create_user(conn, new_user)?;
    let token = generate_token();
    let expires_at = (Utc::now() + ttl).timestamp();
    db::insert_session(conn, &hash_token(&token), &user.id, expires_at)?;
    tracing::info!(user_id = %user.id, "Session issued");
    Ok(IssuedSession {
        token,
        user,
        expires_at,
    })
}

/// User id behind a bearer token, if the session is known and unexpired.
pub fn resolve_session(conn: &Connection, token: &str) -> Result<Option<String>, DatabaseError> {
    db::find_session_user(conn, &hash_token(token), Utc::now().timestamp())
}

pub fn revoke_session(conn: &Connection, token: &str) -> Result<bool, DatabaseError> {
    db::delete_session(conn, &hash_token(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn new_user() -> NewUser {
        NewUser {
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            image: None,
        }
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn issued_session_resolves_until_revoked() {
        let conn = open_memory_database().unwrap();
        let issued = issue_session(&conn, &new_user(), Duration::hours(1)).unwrap();
        assert_eq!(
            resolve_session(&conn, &issued.token).unwrap(),
            Some(issued.user.id.clone())
        );
        assert!(revoke_session(&conn, &issued.token).unwrap());
        assert!(resolve_session(&conn, &issued.token).unwrap().is_none());
    }

    #[test]
    fn expired_session_does_not_resolve() {
        let conn = open_memory_database().unwrap();
        let issued = issue_session(&conn, &new_user(), Duration::hours(-1)).unwrap();
        assert!(resolve_session(&conn, &issued.token).unwrap().is_none());
    }

    #[test]
    fn second_session_reuses_account() {
        let conn = open_memory_database().unwrap();
        let first = issue_session(&conn, &new_user(), Duration::hours(1)).unwrap();
        let second = issue_session(&conn, &new_user(), Duration::hours(1)).unwrap();
        assert_eq!(first.user.id, second.user.id);
        assert_ne!(first.token, second.token);
    }
}
