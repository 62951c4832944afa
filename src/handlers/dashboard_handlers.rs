use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{
        Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::Utc;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt, wrappers::UnboundedReceiverStream};
use tracing::{error, warn};
use utoipa::IntoParams;

use crate::formatting::CurrencyFormatter;
use crate::handlers::{ErrorResponse, error_response};
use crate::live::feed::LiveQueries;
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::category::{Category, CategoryType};
use crate::models::expense::Expense;
use crate::models::stats::{DashboardView, FormattedExpense};
use crate::services::auth_service::IdentityProvider;
use crate::services::category_service::CategoryService;
use crate::services::expense_service::ExpenseService;
use crate::views::dashboard::build_dashboard;
use crate::views::expenses::format_expenses;
use crate::views::stream::{ViewEvent, spawn_dashboard_session};

/// `?type=` restricting dashboard statistics to one kind of category
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// `expense` or `income`
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

/// `?token=&type=` for the event stream; browsers cannot set headers on EventSource
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StreamQuery {
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))
}

async fn load_user_data(
    categories: &dyn CategoryService,
    expenses: &dyn ExpenseService,
    auth_user: &AuthenticatedUser,
) -> Result<(Vec<Category>, Vec<Expense>), Response> {
    let failed = |detail: String| {
        error!(user_id = %auth_user.user_id, %detail, "dashboard load failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load dashboard")
    };

    let categories = categories
        .get_categories(auth_user.user_id)
        .await
        .map_err(|e| failed(e.to_string()))?;
    let expenses = expenses
        .get_expenses(auth_user.user_id)
        .await
        .map_err(|e| failed(e.to_string()))?;
    Ok((categories, expenses))
}

/// Handler for the dashboard of the signed-in user
#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard totals and per-category statistics", body = DashboardView),
        (status = 400, description = "Unknown category type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "dashboard"
)]
pub async fn dashboard_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    State(expense_service): State<Arc<dyn ExpenseService>>,
    State(formatter): State<CurrencyFormatter>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<Json<DashboardView>, Response> {
    let query = query_params(query)?;
    let (categories, expenses) =
        load_user_data(category_service.as_ref(), expense_service.as_ref(), &auth_user).await?;

    Ok(Json(build_dashboard(
        &categories,
        &expenses,
        query.category_type,
        Utc::now().date_naive(),
        &formatter,
    )))
}

/// Handler for the expense list of the signed-in user, ready for display
#[utoipa::path(
    get,
    path = "/api/dashboard/expenses",
    responses(
        (status = 200, description = "Expenses newest first with category names", body = Vec<FormattedExpense>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "dashboard"
)]
pub async fn formatted_expenses_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    State(expense_service): State<Arc<dyn ExpenseService>>,
    State(formatter): State<CurrencyFormatter>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<FormattedExpense>>, Response> {
    let (categories, expenses) =
        load_user_data(category_service.as_ref(), expense_service.as_ref(), &auth_user).await?;

    Ok(Json(format_expenses(&expenses, &categories, &formatter)))
}

/// Handler for the live dashboard
///
/// Emits `dashboard` events with a full `DashboardView` whenever the user's
/// categories or expenses change, `error` events when a live read fails, and
/// a `redirect` event to `/login` when the session is missing or ends.
#[utoipa::path(
    get,
    path = "/api/dashboard/stream",
    params(StreamQuery),
    responses(
        (status = 200, description = "Server-sent events: dashboard, error, redirect", content_type = "text/event-stream", body = String),
        (status = 400, description = "Unknown category type", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard_stream_handler(
    State(identity_provider): State<Arc<dyn IdentityProvider>>,
    State(live): State<LiveQueries>,
    State(formatter): State<CurrencyFormatter>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let query = query_params(query)?;
    let events = spawn_dashboard_session(
        identity_provider,
        live,
        query.token.unwrap_or_default(),
        query.category_type,
        formatter,
    );

    let stream = UnboundedReceiverStream::new(events).map(|event| Ok(to_sse(event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: ViewEvent) -> Event {
    let name = event.name();
    match event {
        ViewEvent::Dashboard(view) => Event::default()
            .event(name)
            .json_data(&view)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to encode dashboard event");
                Event::default()
                    .event("error")
                    .data("Failed to load dashboard")
            }),
        ViewEvent::Error(message) => Event::default().event(name).data(message),
        ViewEvent::Redirect(path) => Event::default().event(name).data(path),
    }
}
