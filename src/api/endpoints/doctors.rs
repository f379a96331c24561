//! Doctor profile and credential endpoints.
//!
//! - `POST /api/db/doctor/add`, `POST /api/db/doctor/set`
//! - `GET /api/db/doctor/get[?doctor_id=]`: own profile, or any doctor's
//! - `GET /api/db/doctor/all`: directory for the "select a doctor" screen
//! - `POST /api/db/doctor/credentials/add`, `POST /api/db/doctor/credentials/set`
//! - `GET /api/db/doctor/credentials/get[?doctor_id=]`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use super::{require_role, Validate};
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::*;

#[derive(Deserialize)]
pub struct DoctorQuery {
    pub doctor_id: Option<String>,
}

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewDoctor>, JsonRejection>,
) -> Result<AddOutcome<Doctor>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let row = db::add_doctor(&conn, &caller.user_id, &body)?;
    Ok(AddOutcome::new("doctor", row))
}

pub async fn set(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<DoctorUpdate>, JsonRejection>,
) -> Result<Json<Envelope<Doctor>>, ApiError> {
    let Json(changes) = payload?;
    if let Some(rating) = changes.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(ApiError::BadRequest("rating must be between 0 and 5".into()));
        }
    }
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let updated = db::set_doctor(&conn, &caller.user_id, &changes)?
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found".into()))?;
    Ok(respond(updated))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    query: Result<Query<DoctorQuery>, QueryRejection>,
) -> Result<Json<Envelope<Option<Doctor>>>, ApiError> {
    let Query(query) = query?;
    let own = query.doctor_id.as_deref().map_or(true, |id| id == caller.user_id);
    let doctor_id = query.doctor_id.unwrap_or(caller.user_id);
    let conn = ctx.core.open_db()?;
    let doctor = db::get_doctor(&conn, &doctor_id)?;
    Ok(respond(if own {
        doctor
    } else {
        doctor.map(Doctor::public_view)
    }))
}

pub async fn all(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<Doctor>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctors = db::list_doctors(&conn)?
        .into_iter()
        .map(Doctor::public_view)
        .collect::<Vec<_>>();
    Ok(respond(doctors))
}

pub async fn add_credentials(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewDoctorCredentials>, JsonRejection>,
) -> Result<AddOutcome<DoctorCredentials>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let row = db::add_doctor_credentials(&conn, &caller.user_id, &body).map_err(|e| {
        if e.is_foreign_key_violation() {
            ApiError::BadRequest(
                "specialization must match the doctor profile's specialization".into(),
            )
        } else {
            e.into()
        }
    })?;
    Ok(AddOutcome::new("doctor credentials", row))
}

pub async fn set_credentials(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<DoctorCredentialsUpdate>, JsonRejection>,
) -> Result<Json<Envelope<DoctorCredentials>>, ApiError> {
    let Json(changes) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let updated = db::set_doctor_credentials(&conn, &caller.user_id, &changes)?
        .ok_or_else(|| ApiError::NotFound("Doctor credentials not found".into()))?;
    Ok(respond(updated))
}

pub async fn get_credentials(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    query: Result<Query<DoctorQuery>, QueryRejection>,
) -> Result<Json<Envelope<Option<DoctorCredentials>>>, ApiError> {
    let Query(query) = query?;
    let doctor_id = query.doctor_id.unwrap_or(caller.user_id);
    let conn = ctx.core.open_db()?;
    Ok(respond(db::get_doctor_credentials(&conn, &doctor_id)?))
}
