//! API endpoint handlers.
//!
//! Each module covers one route family. Handlers resolve the caller, check
//! their role, run one repository operation on a pooled connection and
//! shape the JSON response.

pub mod appointments;
pub mod billing;
pub mod doctors;
pub mod health;
pub mod health_info;
pub mod invoices;
pub mod management;
pub mod messages;
pub mod patients;
pub mod roles;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::db;
use crate::models::*;

/// The caller's role, or 403 when they have not picked one yet.
pub(crate) fn caller_role(conn: &Connection, user_id: &str) -> Result<Role, ApiError> {
    db::get_user_role(conn, user_id)?
        .map(|r| r.role)
        .ok_or_else(|| ApiError::Forbidden("Choose a role first".into()))
}

/// 403 unless the caller holds `expected`.
pub(crate) fn require_role(conn: &Connection, user_id: &str, expected: Role) -> Result<(), ApiError> {
    let role = caller_role(conn, user_id)?;
    if role != expected {
        return Err(ApiError::Forbidden(format!("Only a {expected} may do this")));
    }
    Ok(())
}

/// Request payload checks that the schema cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_email(field: &str, value: &str) -> Result<(), ApiError> {
    require_text(field, value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::BadRequest(format!("{field} is not an email address"))),
    }
}

impl Validate for NewPatient {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("primary_language", &self.primary_language)?;
        require_text("phone_number", &self.phone_number)?;
        require_email("email", &self.email)?;
        require_text("street_address", &self.street_address)?;
        require_text("city", &self.city)?;
        require_text("state", &self.state)?;
        require_text("zip_code", &self.zip_code)?;
        if let Some(initial) = &self.middle_initial {
            if initial.chars().count() > 1 {
                return Err(ApiError::BadRequest(
                    "middle_initial must be a single letter".into(),
                ));
            }
        }
        if !self.hipaa_compliance {
            return Err(ApiError::BadRequest(
                "hipaa_compliance must be acknowledged".into(),
            ));
        }
        Ok(())
    }
}

impl Validate for NewDoctor {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_email("email", &self.email)?;
        require_text("location", &self.location)
    }
}

impl Validate for NewDoctorCredentials {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("degree", &self.degree)?;
        require_text("medical_school", &self.medical_school)?;
        require_text("residency", &self.residency)?;
        require_text("approach", &self.approach)?;
        require_text("specialization", &self.specialization)
    }
}

impl Validate for NewInvoice {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("description", &self.description)?;
        if self.amount_cents <= 0 {
            return Err(ApiError::BadRequest("amount_cents must be positive".into()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApiError::BadRequest(
                "currency must be a three-letter code".into(),
            ));
        }
        Ok(())
    }
}

impl Validate for NewAllergy {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("allergen", &self.allergen)
    }
}

impl Validate for NewCognitiveSymptom {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("symptom_type", &self.symptom_type)
    }
}

impl Validate for NewDiagnosis {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("condition_name", &self.condition_name)
    }
}

impl Validate for NewEmergencyContact {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("phone_number", &self.phone_number)
    }
}

impl Validate for NewMedication {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("medication_name", &self.medication_name)?;
        require_text("dosage", &self.dosage)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::BadRequest(
                    "end_date must not precede start_date".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_checked() {
        assert!(require_email("email", "ada@example.com").is_ok());
        assert!(require_email("email", "ada").is_err());
        assert!(require_email("email", "@example.com").is_err());
        assert!(require_email("email", "ada@localhost").is_err());
    }

    #[test]
    fn blank_allergen_rejected() {
        let allergy = NewAllergy {
            allergen: "   ".into(),
            reaction_description: None,
            severity_level: None,
        };
        assert!(matches!(allergy.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn medication_dates_ordered() {
        let medication = NewMedication {
            medication_name: "Donepezil".into(),
            dosage: "5mg".into(),
            frequency: MedicationFrequency::Daily,
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert!(medication.validate().is_err());
    }

    #[test]
    fn invoice_amount_and_currency_checked() {
        let mut invoice = NewInvoice {
            patient_id: "p".into(),
            description: "Consultation".into(),
            amount_cents: 5_000,
            currency: "eur".into(),
            due_date: None,
        };
        assert!(invoice.validate().is_ok());
        invoice.currency = "euro".into();
        assert!(invoice.validate().is_err());
        invoice.currency = "usd".into();
        invoice.amount_cents = -1;
        assert!(matches!(invoice.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn missing_role_is_forbidden() {
        let conn = crate::db::open_memory_database().unwrap();
        assert!(matches!(
            caller_role(&conn, "nobody"),
            Err(ApiError::Forbidden(_))
        ));
    }
}
