use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::services::auth_service::{AuthError, IdentityProvider};

/// Extension carrying the caller of an authenticated request
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token: String,
}

/// Validates the bearer token and adds `AuthenticatedUser` to the request extensions
pub async fn auth_middleware(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, TokenRejection> {
    let token = bearer_token(&headers)?.to_string();

    let identity = identity_provider
        .validate_token(&token)
        .await
        .map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            match e {
                AuthError::TokenExpired => TokenRejection::Expired,
                _ => TokenRejection::Invalid,
            }
        })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: identity.user_id,
        token,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TokenRejection::Missing)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(TokenRejection::BadFormat)
}

/// Why a request was refused before reaching its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Missing,
    BadFormat,
    Invalid,
    Expired,
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        let message = match self {
            TokenRejection::Missing => "Missing authorization token",
            TokenRejection::BadFormat => {
                "Invalid authorization header format. Expected: Bearer <token>"
            }
            TokenRejection::Invalid => "Invalid or malformed token",
            TokenRejection::Expired => "Token has expired",
        };

        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}
