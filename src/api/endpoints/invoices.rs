//! Invoice endpoints. Doctors bill the patients they manage; both sides
//! read the invoices that concern them.
//!
//! - `POST /api/db/invoices/add`
//! - `GET /api/db/invoices/get`
//! - `POST /api/db/invoices/set-status`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{caller_role, require_role, Validate};
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::*;

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub invoice_id: Uuid,
    pub status: InvoiceStatus,
}

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewInvoice>, JsonRejection>,
) -> Result<AddOutcome<Invoice>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    if !db::has_management(&conn, &body.patient_id, &caller.user_id)? {
        return Err(ApiError::Forbidden(
            "Invoices can only be raised for managed patients".into(),
        ));
    }
    let row = db::add_invoice(&conn, &caller.user_id, &body)?;
    if let Some(invoice) = &row {
        tracing::info!(
            invoice_id = %invoice.id,
            amount_cents = invoice.amount_cents,
            "Invoice raised"
        );
    }
    Ok(AddOutcome::new("invoice", row))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<Invoice>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let role = caller_role(&conn, &caller.user_id)?;
    let key = PartyKey::for_role(role, &caller.user_id);
    Ok(respond(db::get_invoices(&conn, &key)?))
}

/// Only the issuing doctor may mark an invoice paid or void.
pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<Envelope<Invoice>>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    require_role(&conn, &caller.user_id, Role::Doctor)?;
    let invoice = db::set_invoice_status(&conn, &caller.user_id, &body.invoice_id, body.status)?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {} not found", body.invoice_id)))?;
    Ok(respond(invoice))
}
