//! Role endpoints.
//!
//! - `POST /api/db/management/user-role/add`: pick patient or doctor (once)
//! - `GET /api/db/management/user-role/get`
//! - `GET /api/db/management/user-role/has`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::{Role, UserRole};

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<AddOutcome<UserRole>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    let row = db::add_user_role(&conn, &caller.user_id, body.role)?;
    if row.is_some() {
        tracing::info!(user_id = %caller.user_id, role = %body.role, "Role assigned");
    }
    Ok(AddOutcome::new("user role", row))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Option<UserRole>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(respond(db::get_user_role(&conn, &caller.user_id)?))
}

pub async fn has(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<bool>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(respond(db::has_user_role(&conn, &caller.user_id)?))
}
