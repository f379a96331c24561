use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Record one handled request. `user_id` is `None` for unauthenticated
/// calls.
pub fn record_access(
    conn: &Connection,
    user_id: Option<&str>,
    action: &str,
    status: u16,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO access_log (user_id, action, status) VALUES (?1, ?2, ?3)",
        params![user_id, action, status],
    )?;
    Ok(())
}

/// Delete entries older than `retention_days`. Returns how many were removed.
pub fn prune_access_log(conn: &Connection, retention_days: u32) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM access_log
         WHERE recorded_at < strftime('%Y-%m-%d %H:%M:%f', 'now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

pub fn count_access_entries(conn: &Connection, user_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM access_log WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
