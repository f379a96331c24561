use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub doctor_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub location: String,
    pub specialization: Option<String>,
    pub rating: f64,
    pub billing_customer_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Doctor {
    /// The profile as other users see it, without the billing customer id.
    pub fn public_view(self) -> Self {
        Self {
            billing_customer_id: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub location: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

/// Partial update. Absent and `null` fields both leave the column as it
/// is, so a nullable column cannot be cleared through this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub specialization: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorCredentials {
    pub doctor_id: String,
    pub degree: String,
    pub medical_school: String,
    pub residency: String,
    pub approach: String,
    pub specialization: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Credentials payload. `specialization` must equal the doctor's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctorCredentials {
    pub degree: String,
    pub medical_school: String,
    pub residency: String,
    pub approach: String,
    pub specialization: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorCredentialsUpdate {
    pub degree: Option<String>,
    pub medical_school: Option<String>,
    pub residency: Option<String>,
    pub approach: Option<String>,
    pub specialization: Option<String>,
}
