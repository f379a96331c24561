//! Cognitive symptoms. An omitted onset date is stored as today's date.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{uuid_at, PatientRecord};
use crate::db::DatabaseError;
use crate::models::*;

const SYMPTOM_COLUMNS: &str = "id, patient_id, symptom_type, onset_date, severity_level, notes,
     created_at, updated_at";

const SYMPTOM_ASSIGNMENTS: &str = "symptom_type = COALESCE(?1, symptom_type),
     onset_date = COALESCE(?2, onset_date),
     severity_level = COALESCE(?3, severity_level),
     notes = COALESCE(?4, notes),
     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn symptom_from_row(row: &Row<'_>) -> rusqlite::Result<CognitiveSymptom> {
    Ok(CognitiveSymptom {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        symptom_type: row.get(2)?,
        onset_date: row.get(3)?,
        severity_level: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn add_cognitive_symptom(
    conn: &Connection,
    patient_id: &str,
    symptom: &NewCognitiveSymptom,
) -> Result<Option<CognitiveSymptom>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO cognitive_symptoms (id, patient_id, symptom_type, onset_date,
                 severity_level, notes)
                 VALUES (?1, ?2, ?3, COALESCE(?4, date('now')), ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {SYMPTOM_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                patient_id,
                symptom.symptom_type,
                symptom.onset_date,
                symptom.severity_level,
                symptom.notes,
            ],
            symptom_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_cognitive_symptoms(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<CognitiveSymptom>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SYMPTOM_COLUMNS} FROM cognitive_symptoms
         WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let symptoms = stmt
        .query_map(params![patient_id], symptom_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(symptoms)
}

pub fn set_cognitive_symptom(
    conn: &Connection,
    patient_id: &str,
    symptom_id: &Uuid,
    changes: &CognitiveSymptomUpdate,
) -> Result<Option<CognitiveSymptom>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE cognitive_symptoms SET {SYMPTOM_ASSIGNMENTS}
                 WHERE id = ?5 AND patient_id = ?6
                 RETURNING {SYMPTOM_COLUMNS}"
            ),
            params![
                changes.symptom_type,
                changes.onset_date,
                changes.severity_level,
                changes.notes,
                symptom_id.to_string(),
                patient_id,
            ],
            symptom_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn bulk_set_cognitive_symptoms(
    conn: &Connection,
    patient_id: &str,
    changes: &CognitiveSymptomUpdate,
) -> Result<Vec<CognitiveSymptom>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE cognitive_symptoms SET {SYMPTOM_ASSIGNMENTS}
         WHERE patient_id = ?5
         RETURNING {SYMPTOM_COLUMNS}"
    ))?;
    let updated = stmt
        .query_map(
            params![
                changes.symptom_type,
                changes.onset_date,
                changes.severity_level,
                changes.notes,
                patient_id,
            ],
            symptom_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(updated)
}

impl PatientRecord for CognitiveSymptom {
    type New = NewCognitiveSymptom;
    type Update = CognitiveSymptomUpdate;
    const KIND: &'static str = "cognitive symptom";

    fn add(
        conn: &Connection,
        patient_id: &str,
        new: &NewCognitiveSymptom,
    ) -> Result<Option<Self>, DatabaseError> {
        add_cognitive_symptom(conn, patient_id, new)
    }

    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError> {
        get_cognitive_symptoms(conn, patient_id)
    }

    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &CognitiveSymptomUpdate,
    ) -> Result<Option<Self>, DatabaseError> {
        set_cognitive_symptom(conn, patient_id, id, changes)
    }

    fn bulk_set(
        conn: &Connection,
        patient_id: &str,
        changes: &CognitiveSymptomUpdate,
    ) -> Result<Vec<Self>, DatabaseError> {
        bulk_set_cognitive_symptoms(conn, patient_id, changes)
    }
}
