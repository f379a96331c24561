//! Appointment endpoints.
//!
//! - `POST /api/db/management/appointments/add`: either party books a meeting
//! - `GET /api/db/management/appointments/get`: the caller's meetings, earliest first
//! - `POST /api/db/management/appointments/cancel`: either party cancels

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::caller_role;
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::*;

#[derive(Deserialize)]
pub struct CancelRequest {
    pub meeting_id: Uuid,
}

/// The caller must be one of the two parties, and the pair must be linked
/// by a management row.
pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewScheduledMeeting>, JsonRejection>,
) -> Result<AddOutcome<ScheduledMeeting>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    let role = caller_role(&conn, &caller.user_id)?;
    let own_side = match role {
        Role::Patient => &body.patient_id,
        Role::Doctor => &body.doctor_id,
    };
    if *own_side != caller.user_id {
        return Err(ApiError::Forbidden(
            "Meetings can only be booked for yourself".into(),
        ));
    }
    if !db::has_management(&conn, &body.patient_id, &body.doctor_id)? {
        return Err(ApiError::Forbidden(
            "Patient and doctor are not linked".into(),
        ));
    }
    let row = db::add_scheduled_meeting(&conn, &body)?;
    if let Some(meeting) = &row {
        tracing::info!(meeting_id = %meeting.id, "Meeting scheduled");
    }
    Ok(AddOutcome::new("scheduled meeting", row))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<ScheduledMeeting>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let role = caller_role(&conn, &caller.user_id)?;
    let key = PartyKey::for_role(role, &caller.user_id);
    Ok(respond(db::get_scheduled_meetings(&conn, &key)?))
}

/// Cancelling an already-cancelled meeting succeeds and changes nothing.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<Envelope<ScheduledMeeting>>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    let meeting = db::get_scheduled_meeting(&conn, &body.meeting_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Meeting {} not found", body.meeting_id)))?;
    if !meeting.involves(&caller.user_id) {
        return Err(ApiError::Forbidden("Not a party to this meeting".into()));
    }
    let canceled = db::cancel_scheduled_meeting(&conn, &body.meeting_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Meeting {} not found", body.meeting_id)))?;
    Ok(respond(canceled))
}
