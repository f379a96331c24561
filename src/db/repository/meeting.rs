use chrono::SubsecRound;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const MEETING_COLUMNS: &str =
    "id, patient_id, doctor_id, scheduled_at, status, notes, created_at, updated_at";

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledMeeting> {
    Ok(ScheduledMeeting {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        status: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Book a meeting in `scheduled` state. Times are kept at whole-second
/// precision so stored values sort chronologically.
pub fn add_scheduled_meeting(
    conn: &Connection,
    meeting: &NewScheduledMeeting,
) -> Result<Option<ScheduledMeeting>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO scheduled_meetings (id, patient_id, doctor_id, scheduled_at, status, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {MEETING_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                meeting.patient_id,
                meeting.doctor_id,
                meeting.scheduled_at.trunc_subsecs(0),
                MeetingStatus::Scheduled,
                meeting.notes,
            ],
            meeting_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_scheduled_meeting(
    conn: &Connection,
    meeting_id: &Uuid,
) -> Result<Option<ScheduledMeeting>, DatabaseError> {
    let meeting = conn
        .query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM scheduled_meetings WHERE id = ?1"),
            params![meeting_id.to_string()],
            meeting_from_row,
        )
        .optional()?;
    Ok(meeting)
}

/// Meetings of one patient or one doctor, earliest first.
pub fn get_scheduled_meetings(
    conn: &Connection,
    key: &PartyKey,
) -> Result<Vec<ScheduledMeeting>, DatabaseError> {
    let (filter, id) = match key {
        PartyKey::ByPatient(id) => ("patient_id", id),
        PartyKey::ByDoctor(id) => ("doctor_id", id),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM scheduled_meetings
         WHERE {filter} = ?1 ORDER BY scheduled_at, rowid"
    ))?;
    let meetings = stmt
        .query_map(params![id], meeting_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(meetings)
}

/// Set the meeting to `canceled` whatever its current status. Calling it
/// again is harmless. `None` means no meeting has that id.
pub fn cancel_scheduled_meeting(
    conn: &Connection,
    meeting_id: &Uuid,
) -> Result<Option<ScheduledMeeting>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE scheduled_meetings SET status = ?2,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?1
                 RETURNING {MEETING_COLUMNS}"
            ),
            params![meeting_id.to_string(), MeetingStatus::Canceled],
            meeting_from_row,
        )
        .optional()?;
    Ok(updated)
}
