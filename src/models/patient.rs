use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub condition: Option<String>,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub gender: Gender,
    pub primary_language: String,
    pub phone_number: String,
    pub email: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub hipaa_compliance: bool,
    pub billing_customer_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Patient {
    /// The profile as a managing doctor sees it, without the billing customer id.
    pub fn public_view(self) -> Self {
        Self {
            billing_customer_id: None,
            ..self
        }
    }
}

/// Intake form payload. The patient id is always the caller's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_initial: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub gender: Gender,
    pub primary_language: String,
    pub phone_number: String,
    pub email: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub hipaa_compliance: bool,
}

/// Partial update; `None` leaves the column unchanged.
///
/// Absent and `null` fields are indistinguishable here, so optional columns
/// such as `middle_initial` or `condition` can be set but never cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_initial: Option<String>,
    pub condition: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub primary_language: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub hipaa_compliance: Option<bool>,
}
