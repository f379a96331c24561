use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{uuid_at, PatientRecord};
use crate::db::DatabaseError;
use crate::models::*;

const ALLERGY_COLUMNS: &str =
    "id, patient_id, allergen, reaction_description, severity_level, created_at, updated_at";

const ALLERGY_ASSIGNMENTS: &str = "allergen = COALESCE(?1, allergen),
     reaction_description = COALESCE(?2, reaction_description),
     severity_level = COALESCE(?3, severity_level),
     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn allergy_from_row(row: &Row<'_>) -> rusqlite::Result<Allergy> {
    Ok(Allergy {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        allergen: row.get(2)?,
        reaction_description: row.get(3)?,
        severity_level: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Fails with a foreign-key violation when the patient does not exist.
pub fn add_allergy(
    conn: &Connection,
    patient_id: &str,
    allergy: &NewAllergy,
) -> Result<Option<Allergy>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO allergies (id, patient_id, allergen, reaction_description, severity_level)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT DO NOTHING
                 RETURNING {ALLERGY_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                patient_id,
                allergy.allergen,
                allergy.reaction_description,
                allergy.severity_level,
            ],
            allergy_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_allergies(conn: &Connection, patient_id: &str) -> Result<Vec<Allergy>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALLERGY_COLUMNS} FROM allergies WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let allergies = stmt
        .query_map(params![patient_id], allergy_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(allergies)
}

/// Update one allergy of this patient.
pub fn set_allergy(
    conn: &Connection,
    patient_id: &str,
    allergy_id: &Uuid,
    changes: &AllergyUpdate,
) -> Result<Option<Allergy>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE allergies SET {ALLERGY_ASSIGNMENTS}
                 WHERE id = ?4 AND patient_id = ?5
                 RETURNING {ALLERGY_COLUMNS}"
            ),
            params![
                changes.allergen,
                changes.reaction_description,
                changes.severity_level,
                allergy_id.to_string(),
                patient_id,
            ],
            allergy_from_row,
        )
        .optional()?;
    Ok(updated)
}

/// Apply the same changes to every allergy of this patient.
pub fn bulk_set_allergies(
    conn: &Connection,
    patient_id: &str,
    changes: &AllergyUpdate,
) -> Result<Vec<Allergy>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE allergies SET {ALLERGY_ASSIGNMENTS}
         WHERE patient_id = ?4
         RETURNING {ALLERGY_COLUMNS}"
    ))?;
    let updated = stmt
        .query_map(
            params![
                changes.allergen,
                changes.reaction_description,
                changes.severity_level,
                patient_id,
            ],
            allergy_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(updated)
}

impl PatientRecord for Allergy {
    type New = NewAllergy;
    type Update = AllergyUpdate;
    const KIND: &'static str = "allergy";

    fn add(conn: &Connection, patient_id: &str, new: &NewAllergy) -> Result<Option<Self>, DatabaseError> {
        add_allergy(conn, patient_id, new)
    }

    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError> {
        get_allergies(conn, patient_id)
    }

    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &AllergyUpdate,
    ) -> Result<Option<Self>, DatabaseError> {
        set_allergy(conn, patient_id, id, changes)
    }

    fn bulk_set(conn: &Connection, patient_id: &str, changes: &AllergyUpdate) -> Result<Vec<Self>, DatabaseError> {
        bulk_set_allergies(conn, patient_id, changes)
    }
}
