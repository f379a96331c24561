//! Clinical record endpoints. One generic handler set serves the five
//! record kinds:
//!
//! - `POST /api/db/patient/health-info/<kind>/add`
//! - `POST /api/db/patient/health-info/<kind>/set`: one record, by `id`
//! - `POST /api/db/patient/health-info/<kind>/set-all`: every record of the caller
//! - `GET /api/db/patient/health-info/<kind>/get`
//! - `GET /api/db/patient/health-info/get[?patient_id=]`: all five kinds
//!
//! Records are written only by the owning patient. Doctors may read the
//! aggregate of patients they manage.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{caller_role, require_role, Validate};
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db::{self, PatientRecord};
use crate::models::{PatientHealthInformation, Role};

/// Single-record update: the record id plus the changed fields.
#[derive(Deserialize)]
pub struct RecordPatch<U> {
    pub id: Uuid,
    #[serde(flatten)]
    pub changes: U,
}

#[derive(Deserialize)]
pub struct HealthInfoQuery {
    pub patient_id: Option<String>,
}

pub async fn add<R>(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<R::New>, JsonRejection>,
) -> Result<AddOutcome<R>, ApiError>
where
    R: PatientRecord + Serialize,
    R::New: Validate,
{
    let Json(body) = payload?;
    body.validate()?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    let row = R::add(&conn, &caller.user_id, &body)?;
    Ok(AddOutcome::new(R::KIND, row))
}

pub async fn set_one<R>(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<RecordPatch<R::Update>>, JsonRejection>,
) -> Result<Json<Envelope<R>>, ApiError>
where
    R: PatientRecord + Serialize,
{
    let Json(patch) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    let updated = R::set_one(&conn, &caller.user_id, &patch.id, &patch.changes)?
        .ok_or_else(|| ApiError::NotFound(format!("No {} with id {}", R::KIND, patch.id)))?;
    Ok(respond(updated))
}

pub async fn set_all<R>(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<R::Update>, JsonRejection>,
) -> Result<Json<Envelope<Vec<R>>>, ApiError>
where
    R: PatientRecord + Serialize,
{
    let Json(changes) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    Ok(respond(R::bulk_set(&conn, &caller.user_id, &changes)?))
}

pub async fn list<R>(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<R>>>, ApiError>
where
    R: PatientRecord + Serialize,
{
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Patient)?;
    Ok(respond(R::list(&conn, &caller.user_id)?))
}

/// Patients read their own records. Doctors name the patient and must
/// manage them.
pub async fn aggregate(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    query: Result<Query<HealthInfoQuery>, QueryRejection>,
) -> Result<Json<Envelope<PatientHealthInformation>>, ApiError> {
    let Query(query) = query?;
    let conn = ctx.core.open_db()?;
    let patient_id = match (caller_role(&conn, &caller.user_id)?, query.patient_id) {
        (Role::Patient, None) => caller.user_id,
        (Role::Patient, Some(id)) if id == caller.user_id => id,
        (Role::Patient, Some(_)) => {
            return Err(ApiError::Forbidden(
                "Patients can only read their own records".into(),
            ))
        }
        (Role::Doctor, None) => {
            return Err(ApiError::BadRequest("patient_id is required".into()))
        }
        (Role::Doctor, Some(id)) => {
            if !db::has_management(&conn, &id, &caller.user_id)? {
                return Err(ApiError::Forbidden("Not this patient's doctor".into()));
            }
            id
        }
    };
    Ok(respond(db::get_patient_health_information(&conn, &patient_id)?))
}
