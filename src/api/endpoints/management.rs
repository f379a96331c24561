//! Patient-doctor management endpoints.
//!
//! - `POST /api/db/management/patient-doctor-management/add`: a patient picks a doctor
//! - `GET /api/db/management/patient-doctor-management/get`: rows on the caller's side
//! - `GET /api/db/management/patient-doctor-management/doctors`: a patient's doctors
//! - `GET /api/db/management/patient-doctor-management/patients`: a doctor's patients

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use super::{caller_role, require_role};
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::*;

#[derive(Deserialize)]
pub struct PickDoctorRequest {
    pub doctor_id: String,
}

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<PickDoctorRequest>, JsonRejection>,
) -> Result<AddOutcome<PatientDoctorManagement>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    if db::get_doctor(&conn, &body.doctor_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Doctor {} not found", body.doctor_id)));
    }
    let row = db::add_patient_doctor_management(
        &conn,
        &NewPatientDoctorManagement {
            patient_id: caller.user_id,
            doctor_id: body.doctor_id,
            status: ManagementStatus::Ongoing,
        },
    )?;
    Ok(AddOutcome::new("patient-doctor management", row))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<PatientDoctorManagement>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let role = caller_role(&conn, &caller.user_id)?;
    let key = PartyKey::for_role(role, &caller.user_id);
    Ok(respond(db::get_patient_doctor_management(&conn, &key)?))
}

pub async fn doctors(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<AssignedDoctor>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    let doctors = db::list_assigned_doctors(&conn, &caller.user_id)?
        .into_iter()
        .map(|row| AssignedDoctor {
            doctor: row.doctor.public_view(),
            ..row
        })
        .collect::<Vec<_>>();
    Ok(respond(doctors))
}

pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<ManagedPatient>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let patients = db::list_managed_patients(&conn, &caller.user_id)?
        .into_iter()
        .map(|row| ManagedPatient {
            patient: row.patient.public_view(),
            ..row
        })
        .collect::<Vec<_>>();
    Ok(respond(patients))
}
