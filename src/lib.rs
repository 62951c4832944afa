pub mod config;
pub mod formatting;
pub mod handlers;
pub mod live;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod session;
pub mod validation;
pub mod views;

use axum::{
    Router,
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::formatting::CurrencyFormatter;
use crate::handlers::auth_handlers::{
    login_handler, logout_handler, register_handler, update_profile_handler,
};
use crate::handlers::category_handlers::{
    create_category_handler, delete_category_handler, list_categories_handler,
    update_category_handler,
};
use crate::handlers::dashboard_handlers::{
    dashboard_handler, dashboard_stream_handler, formatted_expenses_handler,
};
use crate::handlers::expense_handlers::{
    create_expense_handler, delete_expense_handler, list_expenses_handler, update_expense_handler,
};
use crate::handlers::{CreatedResponse, ErrorResponse, SuccessResponse};
use crate::live::feed::LiveQueries;
use crate::live::hub::ChangeHub;
use crate::middleware::auth_middleware::auth_middleware;
use crate::models::{
    Category, CategoryPatch, CategoryTotal, CategoryType, CategoryWithStats, CreateCategoryRequest,
    CreateExpenseRequest, DashboardView, Expense, ExpensePatch, FormattedExpense, Identity,
    LoginRequest, Session, SignUpRequest, UpdateProfileRequest, User,
};
use crate::repositories::category_repository::{CategoryRepository, PostgresCategoryRepository};
use crate::repositories::expense_repository::{ExpenseRepository, PostgresExpenseRepository};
use crate::repositories::memory::MemoryStore;
use crate::repositories::user_repository::{PostgresUserRepository, UserRepository};
use crate::services::auth_service::{IdentityProvider, LocalIdentityProvider};
use crate::services::category_service::{CategoryService, CategoryServiceImpl};
use crate::services::expense_service::{ExpenseService, ExpenseServiceImpl};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::category_handlers::list_categories_handler,
        handlers::category_handlers::create_category_handler,
        handlers::category_handlers::update_category_handler,
        handlers::category_handlers::delete_category_handler,
        handlers::expense_handlers::list_expenses_handler,
        handlers::expense_handlers::create_expense_handler,
        handlers::expense_handlers::update_expense_handler,
        handlers::expense_handlers::delete_expense_handler,
        handlers::auth_handlers::register_handler,
        handlers::auth_handlers::login_handler,
        handlers::auth_handlers::logout_handler,
        handlers::auth_handlers::update_profile_handler,
        handlers::dashboard_handlers::dashboard_handler,
        handlers::dashboard_handlers::formatted_expenses_handler,
        handlers::dashboard_handlers::dashboard_stream_handler,
    ),
    components(
        schemas(
            Category, CategoryType, CategoryPatch, CreateCategoryRequest,
            Expense, ExpensePatch, CreateExpenseRequest,
            CategoryWithStats, CategoryTotal, FormattedExpense, DashboardView,
            User, Identity, Session, LoginRequest, SignUpRequest, UpdateProfileRequest,
            CreatedResponse, SuccessResponse, ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "categories", description = "Category management"),
        (name = "expenses", description = "Expense management"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "dashboard", description = "Aggregated views and live updates")
    ),
    info(
        title = "Budget Tracker API",
        version = "0.1.0",
        description = "REST API for tracking personal expenses by category",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Storage backends behind the services
#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepository>,
    pub expenses: Arc<dyn ExpenseRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            categories: Arc::new(PostgresCategoryRepository::new(pool.clone())),
            expenses: Arc::new(PostgresExpenseRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            categories: store.clone(),
            expenses: store.clone(),
            users: store,
        }
    }
}

/// Shared application state; handlers extract the parts they need
#[derive(Clone, FromRef)]
pub struct AppState {
    pub categories: Arc<dyn CategoryService>,
    pub expenses: Arc<dyn ExpenseService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub live: LiveQueries,
    pub formatter: CurrencyFormatter,
}

impl AppState {
    pub fn new(repositories: Repositories, config: &AppConfig) -> Self {
        let hub = ChangeHub::new(config.change_buffer);
        let categories: Arc<dyn CategoryService> = Arc::new(CategoryServiceImpl::new(
            repositories.categories,
            hub.clone(),
        ));
        let expenses: Arc<dyn ExpenseService> = Arc::new(ExpenseServiceImpl::new(
            repositories.expenses,
            hub.clone(),
            config.amount_policy,
        ));
        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new(
            repositories.users,
            config.jwt_secret.clone(),
            Duration::hours(config.session_ttl_hours),
        ));

        Self {
            live: LiveQueries::new(categories.clone(), expenses.clone(), hub),
            categories,
            expenses,
            identity,
            formatter: CurrencyFormatter::new(config.display_currency),
        }
    }

    /// Swaps the identity provider, e.g. for one with a cheaper hash cost
    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }
}

/// Builds the complete router: API routes, Swagger UI, request tracing and CORS
pub fn build_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/profile", put(update_profile_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/dashboard/expenses", get(formatted_expenses_handler))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/categories",
            get(list_categories_handler)
                .post(create_category_handler)
                .put(update_category_handler)
                .delete(delete_category_handler),
        )
        .route(
            "/api/expenses",
            get(list_expenses_handler)
                .post(create_expense_handler)
                .put(update_expense_handler)
                .delete(delete_expense_handler),
        )
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/dashboard/stream", get(dashboard_stream_handler))
        .merge(authenticated)
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
