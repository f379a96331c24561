use rusqlite::Connection;

use super::{
    get_allergies, get_cognitive_symptoms, get_diagnoses, get_emergency_contacts, get_medications,
};
use crate::db::DatabaseError;
use crate::models::PatientHealthInformation;

/// Read all five clinical collections of a patient. The reads are
/// independent and not wrapped in a transaction; the first failure aborts.
/// An unknown patient yields five empty lists.
pub fn get_patient_health_information(
    conn: &Connection,
    patient_id: &str,
) -> Result<PatientHealthInformation, DatabaseError> {
    Ok(PatientHealthInformation {
        allergies: get_allergies(conn, patient_id)?,
        cognitive_symptoms: get_cognitive_symptoms(conn, patient_id)?,
        diagnoses: get_diagnoses(conn, patient_id)?,
        emergency_contacts: get_emergency_contacts(conn, patient_id)?,
        medications: get_medications(conn, patient_id)?,
    })
}
