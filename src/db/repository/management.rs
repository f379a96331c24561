use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const MANAGEMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, status, created_at, updated_at";

pub(crate) fn management_from_row_at(
    row: &Row<'_>,
    offset: usize,
) -> rusqlite::Result<PatientDoctorManagement> {
    Ok(PatientDoctorManagement {
        id: uuid_at(row, offset)?,
        patient_id: row.get(offset + 1)?,
        doctor_id: row.get(offset + 2)?,
        status: row.get(offset + 3)?,
        created_at: row.get(offset + 4)?,
        updated_at: row.get(offset + 5)?,
    })
}

fn management_from_row(row: &Row<'_>) -> rusqlite::Result<PatientDoctorManagement> {
    management_from_row_at(row, 0)
}

/// Link a patient to a doctor. Linking the same pair twice is a no-op.
pub fn add_patient_doctor_management(
    conn: &Connection,
    link: &NewPatientDoctorManagement,
) -> Result<Option<PatientDoctorManagement>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO patient_doctor_management (id, patient_id, doctor_id, status)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT DO NOTHING
                 RETURNING {MANAGEMENT_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                link.patient_id,
                link.doctor_id,
                link.status,
            ],
            management_from_row,
        )
        .optional()?;
    Ok(inserted)
}

/// All management rows on one side of the relation: a patient's doctors
/// or a doctor's patients.
pub fn get_patient_doctor_management(
    conn: &Connection,
    key: &PartyKey,
) -> Result<Vec<PatientDoctorManagement>, DatabaseError> {
    let (filter, id) = match key {
        PartyKey::ByPatient(id) => ("patient_id", id),
        PartyKey::ByDoctor(id) => ("doctor_id", id),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {MANAGEMENT_COLUMNS} FROM patient_doctor_management
         WHERE {filter} = ?1 ORDER BY created_at, rowid"
    ))?;
    let rows = stmt
        .query_map(params![id], management_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Whether any management row (ongoing or finished) links the pair.
pub fn has_management(
    conn: &Connection,
    patient_id: &str,
    doctor_id: &str,
) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM patient_doctor_management WHERE patient_id = ?1 AND doctor_id = ?2",
            params![patient_id, doctor_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
