use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const DOCTOR_COLUMNS: &str =
    "doctor_id, first_name, last_name, email, location, specialization, rating, billing_customer_id,
     created_at, updated_at";

const CREDENTIAL_COLUMNS: &str = "doctor_id, degree, medical_school, residency, approach,
     specialization, created_at, updated_at";

pub(crate) fn doctor_from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        doctor_id: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        email: row.get(offset + 3)?,
        location: row.get(offset + 4)?,
        specialization: row.get(offset + 5)?,
        rating: row.get(offset + 6)?,
        billing_customer_id: row.get(offset + 7)?,
        created_at: row.get(offset + 8)?,
        updated_at: row.get(offset + 9)?,
    })
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    doctor_from_row_at(row, 0)
}

fn credentials_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorCredentials> {
    Ok(DoctorCredentials {
        doctor_id: row.get(0)?,
        degree: row.get(1)?,
        medical_school: row.get(2)?,
        residency: row.get(3)?,
        approach: row.get(4)?,
        specialization: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn add_doctor(
    conn: &Connection,
    doctor_id: &str,
    doctor: &NewDoctor,
) -> Result<Option<Doctor>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO doctors (doctor_id, first_name, last_name, email, location, specialization)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {DOCTOR_COLUMNS}"
            ),
            params![
                doctor_id,
                doctor.first_name,
                doctor.last_name,
                doctor.email,
                doctor.location,
                doctor.specialization,
            ],
            doctor_from_row,
        )
        .optional()?;
    Ok(inserted)
}

/// Changing `specialization` cascades into the doctor's credentials.
pub fn set_doctor(
    conn: &Connection,
    doctor_id: &str,
    changes: &DoctorUpdate,
) -> Result<Option<Doctor>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE doctors SET
                    first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    email = COALESCE(?4, email),
                    location = COALESCE(?5, location),
                    specialization = COALESCE(?6, specialization),
                    rating = COALESCE(?7, rating),
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE doctor_id = ?1
                 RETURNING {DOCTOR_COLUMNS}"
            ),
            params![
                doctor_id,
                changes.first_name,
                changes.last_name,
                changes.email,
                changes.location,
                changes.specialization,
                changes.rating,
            ],
            doctor_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn get_doctor(conn: &Connection, doctor_id: &str) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE doctor_id = ?1"),
            params![doctor_id],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

/// Remember the payment processor's customer id for a doctor.
pub fn set_doctor_billing_customer(
    conn: &Connection,
    doctor_id: &str,
    customer_id: &str,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET billing_customer_id = ?2,
            updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
         WHERE doctor_id = ?1",
        params![doctor_id, customer_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor_id.into(),
        });
    }
    Ok(())
}

/// Every registered doctor, by last then first name.
pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY last_name, first_name"
    ))?;
    let doctors = stmt
        .query_map([], doctor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(doctors)
}

/// Fails with a constraint violation when `specialization` differs from
/// the doctor's own (or the doctor has none yet).
pub fn add_doctor_credentials(
    conn: &Connection,
    doctor_id: &str,
    credentials: &NewDoctorCredentials,
) -> Result<Option<DoctorCredentials>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO doctor_credentials (doctor_id, degree, medical_school, residency,
                 approach, specialization)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING
                 RETURNING {CREDENTIAL_COLUMNS}"
            ),
            params![
                doctor_id,
                credentials.degree,
                credentials.medical_school,
                credentials.residency,
                credentials.approach,
                credentials.specialization,
            ],
            credentials_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn set_doctor_credentials(
    conn: &Connection,
    doctor_id: &str,
    changes: &DoctorCredentialsUpdate,
) -> Result<Option<DoctorCredentials>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE doctor_credentials SET
                    degree = COALESCE(?2, degree),
                    medical_school = COALESCE(?3, medical_school),
                    residency = COALESCE(?4, residency),
                    approach = COALESCE(?5, approach),
                    specialization = COALESCE(?6, specialization),
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE doctor_id = ?1
                 RETURNING {CREDENTIAL_COLUMNS}"
            ),
            params![
                doctor_id,
                changes.degree,
                changes.medical_school,
                changes.residency,
                changes.approach,
                changes.specialization,
            ],
            credentials_from_row,
        )
        .optional()?;
    Ok(updated)
}

pub fn get_doctor_credentials(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Option<DoctorCredentials>, DatabaseError> {
    let credentials = conn
        .query_row(
            &format!("SELECT {CREDENTIAL_COLUMNS} FROM doctor_credentials WHERE doctor_id = ?1"),
            params![doctor_id],
            credentials_from_row,
        )
        .optional()?;
    Ok(credentials)
}
