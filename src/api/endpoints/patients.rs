//! Patient profile endpoints. A patient only ever reads or writes their
//! own row, keyed by their user id.
//!
//! - `POST /api/db/patient/add`
//! - `POST /api/db/patient/set`
//! - `GET /api/db/patient/get`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use super::{require_role, Validate};
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::{NewPatient, Patient, PatientUpdate, Role};

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<AddOutcome<Patient>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    let row = db::add_patient(&conn, &caller.user_id, &body)?;
    Ok(AddOutcome::new("patient", row))
}

pub async fn set(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<Json<Envelope<Patient>>, ApiError> {
    let Json(changes) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    let updated = db::set_patient(&conn, &caller.user_id, &changes)?
        .ok_or_else(|| ApiError::NotFound("Patient profile not found".into()))?;
    Ok(respond(updated))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Option<Patient>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    Ok(respond(db::get_patient(&conn, &caller.user_id)?))
}
