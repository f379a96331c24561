//! Clinical intake records owned by exactly one patient.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MedicationFrequency, Relationship};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: Uuid,
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub relationship: Relationship,
    pub phone_number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmergencyContact {
    pub first_name: String,
    pub last_name: String,
    pub relationship: Relationship,
    pub phone_number: String,
}

/// Partial update. Absent and `null` fields both leave the column as it
/// is, so a nullable column cannot be cleared through this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub relationship: Option<Relationship>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: MedicationFrequency,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedication {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: MedicationFrequency,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationUpdate {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<MedicationFrequency>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    pub id: Uuid,
    pub patient_id: String,
    pub allergen: String,
    pub reaction_description: Option<String>,
    pub severity_level: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAllergy {
    pub allergen: String,
    #[serde(default)]
    pub reaction_description: Option<String>,
    #[serde(default)]
    pub severity_level: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllergyUpdate {
    pub allergen: Option<String>,
    pub reaction_description: Option<String>,
    pub severity_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub patient_id: String,
    pub condition_name: String,
    pub diagnosis_date: NaiveDate,
    pub self_reported: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiagnosis {
    pub condition_name: String,
    pub diagnosis_date: NaiveDate,
    #[serde(default)]
    pub self_reported: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisUpdate {
    pub condition_name: Option<String>,
    pub diagnosis_date: Option<NaiveDate>,
    pub self_reported: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveSymptom {
    pub id: Uuid,
    pub patient_id: String,
    pub symptom_type: String,
    pub onset_date: NaiveDate,
    pub severity_level: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// `onset_date` defaults to today when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCognitiveSymptom {
    pub symptom_type: String,
    #[serde(default)]
    pub onset_date: Option<NaiveDate>,
    #[serde(default)]
    pub severity_level: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveSymptomUpdate {
    pub symptom_type: Option<String>,
    pub onset_date: Option<NaiveDate>,
    pub severity_level: Option<String>,
    pub notes: Option<String>,
}

/// The five clinical collections of one patient, read together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientHealthInformation {
    pub allergies: Vec<Allergy>,
    pub cognitive_symptoms: Vec<CognitiveSymptom>,
    pub diagnoses: Vec<Diagnosis>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub medications: Vec<Medication>,
}

impl PatientHealthInformation {
    pub fn is_empty(&self) -> bool {
        self.allergies.is_empty()
            && self.cognitive_symptoms.is_empty()
            && self.diagnoses.is_empty()
            && self.emergency_contacts.is_empty()
            && self.medications.is_empty()
    }
}
