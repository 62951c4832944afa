use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::handlers::{ErrorResponse, SuccessResponse, json_body};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::auth::{LoginRequest, Session, SignUpRequest, UpdateProfileRequest};
use crate::models::user::User;
use crate::services::auth_service::{AuthError, IdentityProvider};

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::WeakPassword | AuthError::InvalidEmail | AuthError::MissingName => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Provider(ref detail) => {
                error!(%detail, "identity provider failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.user_message()).with_code(self.code());
        (status, Json(body)).into_response()
    }
}

/// Handler for user registration
///
/// Creates the account and signs it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered and signed in", body = Session),
        (status = 400, description = "Invalid email, weak password or missing name", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), Response> {
    let request = json_body(body)?;

    match identity_provider.sign_up(request).await {
        Ok(session) => Ok((StatusCode::CREATED, Json(session))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for user login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Session),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>, Response> {
    let request = json_body(body)?;

    identity_provider
        .sign_in(request)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

/// Handler for signing out
///
/// Open dashboard streams of this session are redirected to the login page.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = SuccessResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<SuccessResponse>, Response> {
    identity_provider
        .sign_out(&auth_user.token)
        .await
        .map(|()| SuccessResponse::ok())
        .map_err(IntoResponse::into_response)
}

/// Handler for changing the display name
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Missing name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "auth"
)]
pub async fn update_profile_handler(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, Response> {
    let request = json_body(body)?;

    identity_provider
        .update_display_name(auth_user.user_id, &request.name)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}
