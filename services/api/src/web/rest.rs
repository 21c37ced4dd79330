//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification of the REST API.

use utoipa::OpenApi;

use crate::web::auth::{
    AuthResponse, LoginRequest, PasswordChangeRequest, ProfileRequest, ResetConfirmRequest, ResetRequest,
    ResetResponse, SignupRequest,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
        crate::web::auth::reset_password_handler,
        crate::web::auth::confirm_reset_handler,
        crate::web::auth::update_profile_handler,
        crate::web::auth::change_password_handler,
        crate::web::tasks::list_tasks_handler,
        crate::web::tasks::partitioned_tasks_handler,
        crate::web::tasks::create_task_handler,
        crate::web::tasks::update_task_handler,
        crate::web::tasks::set_completion_handler,
        crate::web::tasks::delete_task_handler,
        crate::web::sessions::list_sessions_handler,
        crate::web::sessions::create_session_handler,
        crate::web::sessions::update_session_handler,
        crate::web::sessions::delete_session_handler,
        crate::web::views::progress_handler,
        crate::web::views::schedule_handler,
        crate::web::views::dashboard_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            ResetRequest,
            ResetConfirmRequest,
            ProfileRequest,
            PasswordChangeRequest,
            AuthResponse,
            ResetResponse
        )
    ),
    tags(
        (name = "Study Tracker API", description = "Tasks, study sessions and progress for signed-in students.")
    )
)]
pub struct ApiDoc;
