use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{uuid_at, PatientRecord};
use crate::db::DatabaseError;
use crate::models::*;

const DIAGNOSIS_COLUMNS: &str = "id, patient_id, condition_name, diagnosis_date, self_reported,
     notes, created_at, updated_at";

const DIAGNOSIS_ASSIGNMENTS: &str = "condition_name = COALESCE(?1, condition_name),
     diagnosis_date = COALESCE(?2, diagnosis_date),
     self_reported = COALESCE(?3, self_reported),
     notes = COALESCE(?4, notes),
     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn diagnosis_from_row(row: &Row<'_>) -> rusqlite::Result<Diagnosis> {
    Ok(Diagnosis {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        condition_name: row.get(2)?,
        diagnosis_date: row.get(3)?,
        self_reported: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn add_diagnosis(
    conn: &Connection,
    patient_id: &str,
    diagnosis: &NewDiagnosis,
) -> Result<Option<Diagnosis>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO diagnoses (id, patient_id, condition_name, diagnosis_date, self_reported, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {DIAGNOSIS_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                patient_id,
                diagnosis.condition_name,
                diagnosis.diagnosis_date,
                diagnosis.self_reported,
                diagnosis.notes,
            ],
            diagnosis_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_diagnoses(conn: &Connection, patient_id: &str) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DIAGNOSIS_COLUMNS} FROM diagnoses WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let diagnoses = stmt
        .query_map(params![patient_id], diagnosis_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(diagnoses)
}

pub fn set_diagnosis(
    conn: &Connection,
    patient_id: &str,
    diagnosis_id: &Uuid,
    changes: &DiagnosisUpdate,
) -> Result<Option<Diagnosis>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE diagnoses SET {DIAGNOSIS_ASSIGNMENTS}
                 WHERE id = ?5 AND patient_id = ?6
                 RETURNING {DIAGNOSIS_COLUMNS}"
            ),
            params![
                changes.condition_name,
                changes.diagnosis_date,
                changes.self_reported,
                changes.notes,
                diagnosis_id.to_string(),
                patient_id,
            ],
            diagnosis_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn bulk_set_diagnoses(
    conn: &Connection,
    patient_id: &str,
    changes: &DiagnosisUpdate,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE diagnoses SET {DIAGNOSIS_ASSIGNMENTS}
         WHERE patient_id = ?5
         RETURNING {DIAGNOSIS_COLUMNS}"
    ))?;
    let updated = stmt
        .query_map(
            params![
                changes.condition_name,
                changes.diagnosis_date,
                changes.self_reported,
                changes.notes,
                patient_id,
            ],
            diagnosis_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(updated)
}

impl PatientRecord for Diagnosis {
    type New = NewDiagnosis;
    type Update = DiagnosisUpdate;
    const KIND: &'static str = "diagnosis";

    fn add(conn: &Connection, patient_id: &str, new: &NewDiagnosis) -> Result<Option<Self>, DatabaseError> {
        add_diagnosis(conn, patient_id, new)
    }

    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError> {
        get_diagnoses(conn, patient_id)
    }

    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &DiagnosisUpdate,
    ) -> Result<Option<Self>, DatabaseError> {
        set_diagnosis(conn, patient_id, id, changes)
    }

    fn bulk_set(conn: &Connection, patient_id: &str, changes: &DiagnosisUpdate) -> Result<Vec<Self>, DatabaseError> {
        bulk_set_diagnoses(conn, patient_id, changes)
    }
}
