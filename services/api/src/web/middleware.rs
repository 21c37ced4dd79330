//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_tracker_core::require_account;

use crate::error::{reject, HandlerError};
use crate::web::state::AppState;

/// The sign-in token of the current request, for handlers such as logout.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Extracts the `session=<token>` value from the Cookie header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Middleware that validates the auth session cookie and resolves the account.
///
/// If valid, inserts the `Account` and its `SessionToken` into request
/// extensions for handlers to use. If invalid or missing, returns 401 Unauthorized;
/// an identity backend failure maps like any other port error.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    // 1. Parse session ID from cookie
    let token = session_cookie(req.headers())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Not signed in".to_string()))?;

    // 2. Resolve the account behind the token
    let current = state
        .identity
        .current_account(&token)
        .await
        .map_err(reject("Failed to validate auth session"))?;
    let account = require_account(current).map_err(reject("Rejected unauthenticated request"))?;

    // 3. Insert account and token into request extensions
    req.extensions_mut().insert(account);
    req.extensions_mut().insert(SessionToken(token));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
