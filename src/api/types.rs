//! Shared types for the portal API layer.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer session resolved.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: String,
}

/// Success body: `{"response": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub response: T,
}

pub fn respond<T: Serialize>(response: T) -> Json<Envelope<T>> {
    Json(Envelope { response })
}

/// Result of an add operation: 201 with the row when it was created, 200
/// with `null` when an existing row made the insert a no-op.
#[derive(Debug, Serialize)]
pub struct AddOutcome<T> {
    pub created: bool,
    pub response: Option<T>,
}

impl<T> AddOutcome<T> {
    pub fn new(kind: &'static str, row: Option<T>) -> Self {
        if row.is_none() {
            tracing::warn!(kind, "Insert skipped: row already exists");
        }
        Self {
            created: row.is_some(),
            response: row,
        }
    }
}

impl<T: Serialize> IntoResponse for AddOutcome<T> {
    fn into_response(self) -> Response {
        let status = if self.created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        (status, Json(self)).into_response()
    }
}
