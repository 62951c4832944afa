use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::user::Identity;

/// Request payload for user login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "email": "john.doe@example.com",
    "password": "securepassword123"
}))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for user registration
///
/// Field rules (valid email, password length, non-empty name) are enforced by
/// the identity provider so that each failure maps to its own error code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "John",
    "email": "john.doe@example.com",
    "password": "securepassword123"
}))]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request payload for changing the display name
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: String,
}

/// An authenticated session: bearer token plus the identity it carries
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
    "expiresAt": "2024-01-16T12:00:00Z",
    "identity": {
        "userId": "550e8400-e29b-41d4-a716-446655440000",
        "displayName": "John",
        "email": "john.doe@example.com"
    }
}))]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

/// Session state as observed by the identity gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state while the session check is in flight
    Unknown,
    Authenticated(Identity),
    Anonymous,
}
