use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const PATIENT_COLUMNS: &str = "patient_id, first_name, last_name, middle_initial, condition,
     date_of_birth, age, gender, primary_language, phone_number, email, street_address,
     city, state, zip_code, hipaa_compliance, billing_customer_id, created_at, updated_at";

/// Map a row selected with `PATIENT_COLUMNS`, starting at column `offset`.
pub(crate) fn patient_from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Patient> {
    Ok(Patient {
        patient_id: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        middle_initial: row.get(offset + 3)?,
        condition: row.get(offset + 4)?,
        date_of_birth: row.get(offset + 5)?,
        age: row.get(offset + 6)?,
        gender: row.get(offset + 7)?,
        primary_language: row.get(offset + 8)?,
        phone_number: row.get(offset + 9)?,
        email: row.get(offset + 10)?,
        street_address: row.get(offset + 11)?,
        city: row.get(offset + 12)?,
        state: row.get(offset + 13)?,
        zip_code: row.get(offset + 14)?,
        hipaa_compliance: row.get(offset + 15)?,
        billing_customer_id: row.get(offset + 16)?,
        created_at: row.get(offset + 17)?,
        updated_at: row.get(offset + 18)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    patient_from_row_at(row, 0)
}

/// Insert the patient row for `patient_id`. Requires the user to hold the
/// patient role; an existing row (or a clashing email) makes this a no-op.
pub fn add_patient(
    conn: &Connection,
    patient_id: &str,
    patient: &NewPatient,
) -> Result<Option<Patient>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO patients (patient_id, first_name, last_name, middle_initial, condition,
                 date_of_birth, age, gender, primary_language, phone_number, email, street_address,
                 city, state, zip_code, hipaa_compliance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT DO NOTHING
                 RETURNING {PATIENT_COLUMNS}"
            ),
            params![
                patient_id,
                patient.first_name,
                patient.last_name,
                patient.middle_initial,
                patient.condition,
                patient.date_of_birth,
                patient.age,
                patient.gender,
                patient.primary_language,
                patient.phone_number,
                patient.email,
                patient.street_address,
                patient.city,
                patient.state,
                patient.zip_code,
                patient.hipaa_compliance,
            ],
            patient_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn set_patient(
    conn: &Connection,
    patient_id: &str,
    changes: &PatientUpdate,
) -> Result<Option<Patient>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE patients SET
                    first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    middle_initial = COALESCE(?4, middle_initial),
                    condition = COALESCE(?5, condition),
                    date_of_birth = COALESCE(?6, date_of_birth),
                    age = COALESCE(?7, age),
                    gender = COALESCE(?8, gender),
                    primary_language = COALESCE(?9, primary_language),
                    phone_number = COALESCE(?10, phone_number),
                    email = COALESCE(?11, email),
                    street_address = COALESCE(?12, street_address),
                    city = COALESCE(?13, city),
                    state = COALESCE(?14, state),
                    zip_code = COALESCE(?15, zip_code),
                    hipaa_compliance = COALESCE(?16, hipaa_compliance),
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE patient_id = ?1
                 RETURNING {PATIENT_COLUMNS}"
            ),
            params![
                patient_id,
                changes.first_name,
                changes.last_name,
                changes.middle_initial,
                changes.condition,
                changes.date_of_birth,
                changes.age,
                changes.gender,
                changes.primary_language,
                changes.phone_number,
                changes.email,
                changes.street_address,
                changes.city,
                changes.state,
                changes.zip_code,
                changes.hipaa_compliance,
            ],
            patient_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn get_patient(conn: &Connection, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ?1"),
            params![patient_id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Remember the payment processor's customer id for a patient.
pub fn set_billing_customer(
    conn: &Connection,
    patient_id: &str,
    customer_id: &str,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET billing_customer_id = ?2,
            updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
         WHERE patient_id = ?1",
        params![patient_id, customer_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient_id.into(),
        });
    }
    Ok(())
}
