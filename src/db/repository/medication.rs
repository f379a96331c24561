use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{uuid_at, PatientRecord};
use crate::db::DatabaseError;
use crate::models::*;

const MEDICATION_COLUMNS: &str = "id, patient_id, medication_name, dosage, frequency,
     start_date, end_date, created_at, updated_at";

const MEDICATION_ASSIGNMENTS: &str = "medication_name = COALESCE(?1, medication_name),
     dosage = COALESCE(?2, dosage),
     frequency = COALESCE(?3, frequency),
     start_date = COALESCE(?4, start_date),
     end_date = COALESCE(?5, end_date),
     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        medication_name: row.get(2)?,
        dosage: row.get(3)?,
        frequency: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn add_medication(
    conn: &Connection,
    patient_id: &str,
    medication: &NewMedication,
) -> Result<Option<Medication>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO medications (id, patient_id, medication_name, dosage, frequency,
                 start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT DO NOTHING
                 RETURNING {MEDICATION_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                patient_id,
                medication.medication_name,
                medication.dosage,
                medication.frequency,
                medication.start_date,
                medication.end_date,
            ],
            medication_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_medications(conn: &Connection, patient_id: &str) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let medications = stmt
        .query_map(params![patient_id], medication_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(medications)
}

pub fn set_medication(
    conn: &Connection,
    patient_id: &str,
    medication_id: &Uuid,
    changes: &MedicationUpdate,
) -> Result<Option<Medication>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE medications SET {MEDICATION_ASSIGNMENTS}
                 WHERE id = ?6 AND patient_id = ?7
                 RETURNING {MEDICATION_COLUMNS}"
            ),
            params![
                changes.medication_name,
                changes.dosage,
                changes.frequency,
                changes.start_date,
                changes.end_date,
                medication_id.to_string(),
                patient_id,
            ],
            medication_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn bulk_set_medications(
    conn: &Connection,
    patient_id: &str,
    changes: &MedicationUpdate,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE medications SET {MEDICATION_ASSIGNMENTS}
         WHERE patient_id = ?6
         RETURNING {MEDICATION_COLUMNS}"
    ))?;
    let updated = stmt
        .query_map(
            params![
                changes.medication_name,
                changes.dosage,
                changes.frequency,
                changes.start_date,
                changes.end_date,
                patient_id,
            ],
            medication_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(updated)
}

impl PatientRecord for Medication {
    type New = NewMedication;
    type Update = MedicationUpdate;
    const KIND: &'static str = "medication";

    fn add(conn: &Connection, patient_id: &str, new: &NewMedication) -> Result<Option<Self>, DatabaseError> {
        add_medication(conn, patient_id, new)
    }

    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError> {
        get_medications(conn, patient_id)
    }

    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &MedicationUpdate,
    ) -> Result<Option<Self>, DatabaseError> {
        set_medication(conn, patient_id, id, changes)
    }

    fn bulk_set(conn: &Connection, patient_id: &str, changes: &MedicationUpdate) -> Result<Vec<Self>, DatabaseError> {
        bulk_set_medications(conn, patient_id, changes)
    }
}
