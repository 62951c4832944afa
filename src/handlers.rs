pub mod auth_handlers;
pub mod category_handlers;
pub mod dashboard_handlers;
pub mod expense_handlers;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable reason, set for identity errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Builds a JSON error response
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Body of a successful create
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Body of a successful update, delete or sign-out
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// `?userId=` selecting whose records to list
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    /// Owner of the records
    pub user_id: Option<String>,
}

/// `?id=` selecting the record to change
#[derive(Debug, Deserialize, IntoParams)]
pub struct IdQuery {
    /// Record id
    pub id: Option<String>,
}

/// Parses a required id parameter, answering 400 when it is absent or malformed
pub(crate) fn required_id(value: Option<&str>, missing: &str) -> Result<Uuid, Response> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, missing))?;
    Uuid::parse_str(value)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, format!("Invalid id: {value}")))
}

/// Unwraps a JSON body, answering 400 with the rejection text otherwise
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))
}
