use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;
use tracing::error;
use validator::Validate;

use crate::handlers::{
    CreatedResponse, ErrorResponse, IdQuery, SuccessResponse, UserIdQuery, error_response,
    json_body, required_id,
};
use crate::models::expense::{CreateExpenseRequest, Expense, ExpensePatch};
use crate::services::expense_service::{ExpenseError, ExpenseService};
use crate::validation::missing_fields_message;

fn failure(err: ExpenseError, operation: &str) -> Response {
    match err {
        ExpenseError::Validation(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        ExpenseError::Persistence(detail) => {
            error!(%detail, "{operation} failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {operation}"),
            )
        }
    }
}

/// Handler for listing a user's expenses
///
/// Expenses come back newest first.
#[utoipa::path(
    get,
    path = "/api/expenses",
    params(UserIdQuery),
    responses(
        (status = 200, description = "Expenses owned by the user, date descending", body = Vec<Expense>),
        (status = 400, description = "Missing user id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn list_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Vec<Expense>>, Response> {
    let user_id = required_id(query.user_id.as_deref(), "User ID is required")?;

    expense_service
        .get_expenses(user_id)
        .await
        .map(Json)
        .map_err(|e| failure(e, "fetch expenses"))
}

/// Handler for recording an expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = CreatedResponse),
        (status = 400, description = "Missing required fields or rejected amount", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn create_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    body: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), Response> {
    let request = json_body(body)?;
    if let Err(validation_errors) = request.validate() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            missing_fields_message(&validation_errors),
        ));
    }

    let new_expense = request
        .into_new_expense()
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing required fields"))?;

    match expense_service.create_expense(new_expense).await {
        Ok(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        Err(e) => Err(failure(e, "create expense")),
    }
}

/// Handler for updating an expense
#[utoipa::path(
    put,
    path = "/api/expenses",
    params(IdQuery),
    request_body = ExpensePatch,
    responses(
        (status = 200, description = "Expense updated", body = SuccessResponse),
        (status = 400, description = "Missing expense id, malformed body or rejected amount", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn update_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Query(query): Query<IdQuery>,
    body: Result<Json<ExpensePatch>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Response> {
    let id = required_id(query.id.as_deref(), "Expense ID is required")?;
    let patch = json_body(body)?;

    expense_service
        .update_expense(id, patch)
        .await
        .map(|()| SuccessResponse::ok())
        .map_err(|e| failure(e, "update expense"))
}

/// Handler for deleting an expense
#[utoipa::path(
    delete,
    path = "/api/expenses",
    params(IdQuery),
    responses(
        (status = 200, description = "Expense deleted", body = SuccessResponse),
        (status = 400, description = "Missing expense id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn delete_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<SuccessResponse>, Response> {
    let id = required_id(query.id.as_deref(), "Expense ID is required")?;

    expense_service
        .delete_expense(id)
        .await
        .map(|()| SuccessResponse::ok())
        .map_err(|e| failure(e, "delete expense"))
}
