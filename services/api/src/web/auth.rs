//! services/api/src/web/auth.rs
//!
//! Account endpoints: signup, login, logout, password reset and profile edits.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{
    validation::{validate_display_name, validate_password_change, validate_registration},
    Account, PortError, ProfileUpdate, SignedIn,
};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, HandlerError};
use crate::web::{middleware::SessionToken, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Account> for AuthResponse {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.id,
            name: account.name,
            email: account.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ResetResponse {
    /// Only present when the server is configured to expose reset tokens.
    pub token: Option<String>,
}

fn session_cookie(token: &str, days: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        Duration::days(days).num_seconds()
    )
}

fn signed_in_response(state: &AppState, status: StatusCode, signed_in: SignedIn) -> impl IntoResponse {
    let cookie = session_cookie(&signed_in.token, state.config.auth_session_days);
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(signed_in.account)),
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_registration(&req.name, &req.email, &req.password, &req.confirm_password)
        .map_err(reject("Rejected signup"))?;

    let signed_in = state
        .identity
        .register(&req.name, &req.email, &req.password)
        .await
        .map_err(reject("Failed to create user"))?;

    info!("Account {} registered", signed_in.account.id);
    Ok(signed_in_response(&state, StatusCode::CREATED, signed_in))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let signed_in = state
        .identity
        .login(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()),
            other => reject("Failed to login")(other),
        })?;

    Ok(signed_in_response(&state, StatusCode::OK, signed_in))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .identity
        .logout(&token)
        .await
        .map_err(reject("Failed to logout"))?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The signed-in account
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Current account", body = AuthResponse))
)]
pub async fn me_handler(Extension(account): Extension<Account>) -> Json<AuthResponse> {
    Json(AuthResponse::from(account))
}

/// POST /auth/password-reset - Issue a password reset token
#[utoipa::path(
    post,
    path = "/auth/password-reset",
    request_body = ResetRequest,
    responses(
        (status = 202, description = "Reset issued", body = ResetResponse),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let token = state
        .identity
        .reset_password(&req.email)
        .await
        .map_err(reject("Failed to issue password reset"))?;

    let token = state.config.expose_reset_tokens.then_some(token);
    Ok((StatusCode::ACCEPTED, Json(ResetResponse { token })))
}

/// POST /auth/password-reset/confirm - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    request_body = ResetConfirmRequest,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 400, description = "Invalid password"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn confirm_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetConfirmRequest>,
) -> Result<StatusCode, HandlerError> {
    // The reset token stands in for the current password.
    validate_password_change(&req.token, &req.new_password, &req.confirm_password)
        .map_err(reject("Rejected password reset"))?;

    state
        .identity
        .confirm_password_reset(&req.token, &req.new_password)
        .await
        .map_err(reject("Failed to reset password"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /auth/profile - Change the display name
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = AuthResponse),
        (status = 400, description = "Name cannot be empty")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<AuthResponse>, HandlerError> {
    validate_display_name(&req.name).map_err(reject("Rejected profile update"))?;

    let updated = state
        .identity
        .update_profile(&account, ProfileUpdate { name: Some(req.name) })
        .await
        .map_err(reject("Failed to update profile"))?;
    Ok(Json(AuthResponse::from(updated)))
}

/// PUT /auth/password - Change the password of the signed-in account
#[utoipa::path(
    put,
    path = "/auth/password",
    request_body = PasswordChangeRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<PasswordChangeRequest>,
) -> Result<StatusCode, HandlerError> {
    validate_password_change(&req.current_password, &req.new_password, &req.confirm_password)
        .map_err(reject("Rejected password change"))?;

    state
        .identity
        .change_password(&account, &req.current_password, &req.new_password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Current password is incorrect".to_string()),
            other => reject("Failed to change password")(other),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
