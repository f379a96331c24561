//! Audit logging middleware.
//!
//! Records every authenticated API request with user id, method, path and
//! response status. Runs innermost (after auth has injected CallerContext).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{ApiContext, CallerContext};
use crate::db;

/// Log API access for audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let action = format!("{} {}", req.method(), req.uri().path());
    let ctx = req.extensions().get::<ApiContext>().cloned();
    let user_id = req
        .extensions()
        .get::<CallerContext>()
        .map(|c| c.user_id.clone());

    let response = next.run(req).await;

    if let Some(ctx) = ctx {
        let status = response.status().as_u16();
        let recorded = ctx
            .core
            .open_db()
            .map_err(|e| e.to_string())
            .and_then(|conn| {
                db::record_access(&conn, user_id.as_deref(), &action, status)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = recorded {
            tracing::warn!(error = %e, action, "Failed to record API access");
        }
    }

    response
}
