use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, email, name, image, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Create the account for `email`, or return the existing one. Accounts
/// are keyed by email the way the identity provider hands them over.
pub fn create_user(conn: &Connection, new_user: &NewUser) -> Result<User, DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, name, image) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(email) DO NOTHING",
        params![
            Uuid::new_v4().to_string(),
            new_user.email,
            new_user.name,
            new_user.image,
        ],
    )?;
    get_user_by_email(conn, &new_user.email)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "User".into(),
        id: new_user.email.clone(),
    })
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Delete an account. Role, patient or doctor row, clinical records,
/// management rows, meetings, conversations and sessions go with it.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user_id.into(),
        });
    }
    Ok(())
}

// ── Sessions ─────────────────────────────────────────────────────────────────

pub fn insert_session(
    conn: &Connection,
    token_hash: &[u8; 32],
    user_id: &str,
    expires_at: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token_hash.to_vec(), user_id, expires_at],
    )?;
    Ok(())
}

/// User id owning a session that is still valid at `now` (unix seconds).
pub fn find_session_user(
    conn: &Connection,
    token_hash: &[u8; 32],
    now: i64,
) -> Result<Option<String>, DatabaseError> {
    let user_id = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
            params![token_hash.to_vec(), now],
            |row| row.get(0),
        )
        .optional()?;
    Ok(user_id)
}

pub fn delete_session(conn: &Connection, token_hash: &[u8; 32]) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash.to_vec()],
    )?;
    Ok(changed > 0)
}

pub fn prune_expired_sessions(conn: &Connection, now: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(deleted)
}
