use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{uuid_at, PatientRecord};
use crate::db::DatabaseError;
use crate::models::*;

const CONTACT_COLUMNS: &str =
    "id, patient_id, first_name, last_name, relationship, phone_number, created_at, updated_at";

const CONTACT_ASSIGNMENTS: &str = "first_name = COALESCE(?1, first_name),
     last_name = COALESCE(?2, last_name),
     relationship = COALESCE(?3, relationship),
     phone_number = COALESCE(?4, phone_number),
     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')";

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<EmergencyContact> {
    Ok(EmergencyContact {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        relationship: row.get(4)?,
        phone_number: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn add_emergency_contact(
    conn: &Connection,
    patient_id: &str,
    contact: &NewEmergencyContact,
) -> Result<Option<EmergencyContact>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO emergency_contacts (id, patient_id, first_name, last_name,
                 relationship, phone_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {CONTACT_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                patient_id,
                contact.first_name,
                contact.last_name,
                contact.relationship,
                contact.phone_number,
            ],
            contact_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_emergency_contacts(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<EmergencyContact>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTACT_COLUMNS} FROM emergency_contacts
         WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let contacts = stmt
        .query_map(params![patient_id], contact_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contacts)
}

pub fn set_emergency_contact(
    conn: &Connection,
    patient_id: &str,
    contact_id: &Uuid,
    changes: &EmergencyContactUpdate,
) -> Result<Option<EmergencyContact>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE emergency_contacts SET {CONTACT_ASSIGNMENTS}
                 WHERE id = ?5 AND patient_id = ?6
                 RETURNING {CONTACT_COLUMNS}"
            ),
            params![
                changes.first_name,
                changes.last_name,
                changes.relationship,
                changes.phone_number,
                contact_id.to_string(),
                patient_id,
            ],
            contact_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn bulk_set_emergency_contacts(
    conn: &Connection,
    patient_id: &str,
    changes: &EmergencyContactUpdate,
) -> Result<Vec<EmergencyContact>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE emergency_contacts SET {CONTACT_ASSIGNMENTS}
         WHERE patient_id = ?5
         RETURNING {CONTACT_COLUMNS}"
    ))?;
    let updated = stmt
        .query_map(
            params![
                changes.first_name,
                changes.last_name,
                changes.relationship,
                changes.phone_number,
                patient_id,
            ],
            contact_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(updated)
}

impl PatientRecord for EmergencyContact {
    type New = NewEmergencyContact;
    type Update = EmergencyContactUpdate;
    const KIND: &'static str = "emergency contact";

    fn add(
        conn: &Connection,
        patient_id: &str,
        new: &NewEmergencyContact,
    ) -> Result<Option<Self>, DatabaseError> {
        add_emergency_contact(conn, patient_id, new)
    }

    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError> {
        get_emergency_contacts(conn, patient_id)
    }

    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &EmergencyContactUpdate,
    ) -> Result<Option<Self>, DatabaseError> {
        set_emergency_contact(conn, patient_id, id, changes)
    }

    fn bulk_set(
        conn: &Connection,
        patient_id: &str,
        changes: &EmergencyContactUpdate,
    ) -> Result<Vec<Self>, DatabaseError> {
        bulk_set_emergency_contacts(conn, patient_id, changes)
    }
}
