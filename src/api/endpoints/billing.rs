//! Billing endpoints. Processor calls are blocking HTTP and run on the
//! blocking pool; the pooled connection is released before awaiting them.
//!
//! - `POST /api/stripe/create-checkout-session`
//! - `POST /api/stripe/create-portal-session`
//! - `POST /api/check-session`: reports checkout status and remembers the customer
//!
//! Patients and doctors both hold a billing account; the customer id lives on
//! their profile row.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use rusqlite::Connection;

use super::caller_role;
use crate::api::error::ApiError;
use crate::api::types::{respond, ApiContext, CallerContext, Envelope};
use crate::billing::{Billing, CheckoutRequest, CheckoutSession, CheckoutStatus, PortalSession};
use crate::db;
use crate::models::Role;

#[derive(Deserialize)]
pub struct CheckSessionRequest {
    pub session_id: String,
}

fn billing(ctx: &ApiContext) -> Result<Billing, ApiError> {
    ctx.core.billing().ok_or(ApiError::BillingDisabled)
}

/// The caller's billing identity taken from their profile row.
struct Account {
    role: Role,
    email: String,
    customer_id: Option<String>,
}

fn account(conn: &Connection, user_id: &str) -> Result<Account, ApiError> {
    let role = caller_role(conn, user_id)?;
    let profile = match role {
        Role::Patient => {
            db::get_patient(conn, user_id)?.map(|p| (p.email, p.billing_customer_id))
        }
        Role::Doctor => db::get_doctor(conn, user_id)?.map(|d| (d.email, d.billing_customer_id)),
    };
    let (email, customer_id) =
        profile.ok_or_else(|| ApiError::NotFound("Complete your profile first".into()))?;
    Ok(Account { role, email, customer_id })
}

pub async fn create_checkout_session(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<CheckoutSession>>, ApiError> {
    let billing = billing(&ctx)?;
    let public_url = &ctx.core.config.public_url;

    let request = {
        let conn = ctx.core.open_db()?;
        let account = account(&conn, &caller.user_id)?;
        CheckoutRequest {
            price_id: billing.price_id.clone(),
            customer_id: account.customer_id,
            customer_email: Some(account.email),
            success_url: format!("{public_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{public_url}/dashboard"),
            client_reference_id: caller.user_id.clone(),
        }
    };

    let processor = billing.processor;
    let session =
        tokio::task::spawn_blocking(move || processor.create_checkout_session(&request)).await??;
    Ok(respond(session))
}

pub async fn create_portal_session(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<PortalSession>>, ApiError> {
    let billing = billing(&ctx)?;

    let customer_id = {
        let conn = ctx.core.open_db()?;
        account(&conn, &caller.user_id)?
            .customer_id
            .ok_or_else(|| ApiError::BadRequest("No billing account on file".into()))?
    };

    let return_url = format!("{}/dashboard", ctx.core.config.public_url);
    let processor = billing.processor;
    let session = tokio::task::spawn_blocking(move || {
        processor.create_portal_session(&customer_id, &return_url)
    })
    .await??;
    Ok(respond(session))
}

pub async fn check_session(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CheckSessionRequest>, JsonRejection>,
) -> Result<Json<Envelope<CheckoutStatus>>, ApiError> {
    let Json(body) = payload?;
    if body.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".into()));
    }
    let billing = billing(&ctx)?;

    let processor = billing.processor;
    let session_id = body.session_id;
    let status =
        tokio::task::spawn_blocking(move || processor.retrieve_checkout_session(&session_id))
            .await??;

    if status.client_reference_id.as_deref() != Some(caller.user_id.as_str()) {
        tracing::warn!(user_id = %caller.user_id, "Checkout session belongs to another user");
        return Err(ApiError::Forbidden(
            "Checkout session was not opened by this user".into(),
        ));
    }

    if status.status == "complete" {
        if let Some(customer_id) = &status.customer_id {
            let conn = ctx.core.open_db()?;
            match account(&conn, &caller.user_id) {
                Ok(Account { role: Role::Patient, .. }) => {
                    db::set_billing_customer(&conn, &caller.user_id, customer_id)?
                }
                Ok(Account { role: Role::Doctor, .. }) => {
                    db::set_doctor_billing_customer(&conn, &caller.user_id, customer_id)?
                }
                Err(ApiError::NotFound(_)) | Err(ApiError::Forbidden(_)) => {
                    return Ok(respond(status))
                }
                Err(e) => return Err(e),
            }
            tracing::info!(user_id = %caller.user_id, "Billing customer recorded");
        }
    }
    Ok(respond(status))
}
