use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::doctor::Doctor;
use super::enums::{ManagementStatus, MeetingStatus, Role};
use super::patient::Patient;

/// Which side of a patient-doctor relation a lookup starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyKey {
    ByPatient(String),
    ByDoctor(String),
}

impl PartyKey {
    /// Key a lookup on the caller's own id, according to their role.
    pub fn for_role(role: Role, user_id: &str) -> Self {
        match role {
            Role::Patient => PartyKey::ByPatient(user_id.to_string()),
            Role::Doctor => PartyKey::ByDoctor(user_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDoctorManagement {
    pub id: Uuid,
    pub patient_id: String,
    pub doctor_id: String,
    pub status: ManagementStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatientDoctorManagement {
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(default = "default_management_status")]
    pub status: ManagementStatus,
}

fn default_management_status() -> ManagementStatus {
    ManagementStatus::Ongoing
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMeeting {
    pub id: Uuid,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: MeetingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ScheduledMeeting {
    pub fn involves(&self, user_id: &str) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduledMeeting {
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Management row joined with the doctor it points at.
#[derive(Debug, Clone, Serialize)]
pub struct AssignedDoctor {
    pub management: PatientDoctorManagement,
    pub doctor: Doctor,
}

/// Management row joined with the patient it points at.
#[derive(Debug, Clone, Serialize)]
pub struct ManagedPatient {
    pub management: PatientDoctorManagement,
    pub patient: Patient,
}
