use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<UserRole> {
    Ok(UserRole {
        user_id: row.get(0)?,
        role: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Assign a role. A user that already has one keeps it: the insert is
/// swallowed and `None` comes back.
pub fn add_user_role(
    conn: &Connection,
    user_id: &str,
    role: Role,
) -> Result<Option<UserRole>, DatabaseError> {
    let inserted = conn
        .query_row(
            "INSERT INTO user_roles (user_id, user_role) VALUES (?1, ?2)
             ON CONFLICT DO NOTHING
             RETURNING user_id, user_role, created_at",
            params![user_id, role],
            role_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_user_role(conn: &Connection, user_id: &str) -> Result<Option<UserRole>, DatabaseError> {
    let role = conn
        .query_row(
            "SELECT user_id, user_role, created_at FROM user_roles WHERE user_id = ?1",
            params![user_id],
            role_from_row,
        )
        .optional()?;
    Ok(role)
}

pub fn has_user_role(conn: &Connection, user_id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_roles WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count == 1)
}
