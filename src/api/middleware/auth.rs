//! Bearer session authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! sessions table and injects `CallerContext` into request extensions for
//! downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::identity;

/// Require a valid, unexpired session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;

    let user_id = {
        let conn = ctx.core.open_db()?;
        identity::resolve_session(&conn, token)?
    }; // connection released here, before any .await

    let Some(user_id) = user_id else {
        tracing::warn!(path = %req.uri().path(), "Rejected unknown or expired session");
        return Err(ApiError::Unauthorized);
    };

    req.extensions_mut().insert(CallerContext { user_id });
    Ok(next.run(req).await)
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc123")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req), Some("abc123"));
    }

    #[test]
    fn ignores_other_schemes() {
        let req = Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req), None);

        let empty = Request::builder()
            .header("Authorization", "Bearer ")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&empty), None);
    }
}
