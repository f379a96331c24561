//! Eager joins across the patient-doctor relation.

use rusqlite::{params, Connection};

use super::doctor::{doctor_from_row_at, DOCTOR_COLUMNS};
use super::management::{management_from_row_at, MANAGEMENT_COLUMNS};
use super::patient::{patient_from_row_at, PATIENT_COLUMNS};
use crate::db::DatabaseError;
use crate::models::*;

/// Column names qualified with a table alias, for joins.
fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_count(columns: &str) -> usize {
    columns.split(',').count()
}

/// Doctors linked to a patient, each with its management row.
pub fn list_assigned_doctors(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<AssignedDoctor>, DatabaseError> {
    let offset = column_count(MANAGEMENT_COLUMNS);
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {} FROM patient_doctor_management m
         JOIN doctors d ON d.doctor_id = m.doctor_id
         WHERE m.patient_id = ?1
         ORDER BY m.created_at, m.rowid",
        qualified("m", MANAGEMENT_COLUMNS),
        qualified("d", DOCTOR_COLUMNS),
    ))?;
    let rows = stmt
        .query_map(params![patient_id], |row| {
            Ok(AssignedDoctor {
                management: management_from_row_at(row, 0)?,
                doctor: doctor_from_row_at(row, offset)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Patients linked to a doctor, each with its management row.
pub fn list_managed_patients(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Vec<ManagedPatient>, DatabaseError> {
    let offset = column_count(MANAGEMENT_COLUMNS);
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {} FROM patient_doctor_management m
         JOIN patients p ON p.patient_id = m.patient_id
         WHERE m.doctor_id = ?1
         ORDER BY m.created_at, m.rowid",
        qualified("m", MANAGEMENT_COLUMNS),
        qualified("p", PATIENT_COLUMNS),
    ))?;
    let rows = stmt
        .query_map(params![doctor_id], |row| {
            Ok(ManagedPatient {
                management: management_from_row_at(row, 0)?,
                patient: patient_from_row_at(row, offset)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
