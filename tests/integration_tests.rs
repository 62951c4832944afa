use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tower::ServiceExt;

use budget_tracker::config::AppConfig;
use budget_tracker::repositories::memory::MemoryStore;
use budget_tracker::services::auth_service::{IdentityProvider, LocalIdentityProvider};
use budget_tracker::{AppState, Repositories, build_router};

/// Test fixture holding a router over a fresh in-memory store
struct TestContext {
    app: Router,
    store: Arc<MemoryStore>,
}

impl TestContext {
    fn new() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration_secret".to_string()),
            _ => None,
        })
        .expect("config");
        let store = Arc::new(MemoryStore::new());
        let repositories = Repositories::memory(store.clone());
        let identity: Arc<dyn IdentityProvider> = Arc::new(
            LocalIdentityProvider::new(
                repositories.users.clone(),
                config.jwt_secret.clone(),
                chrono::Duration::hours(1),
            )
            .with_hash_cost(4),
        );
        let state = AppState::new(repositories, &config).with_identity_provider(identity);

        Self {
            app: build_router(state),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, parse_json_body(response.into_body()).await)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_authed(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn send_json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send_json(
                "POST",
                "/api/auth/register",
                json!({"name": "Ada", "email": email, "password": "password123"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["token"].as_str().unwrap().to_string(),
            body["identity"]["userId"].as_str().unwrap().to_string(),
        )
    }

    async fn create_category(&self, user_id: &str, name: &str, color: &str) -> String {
        let (status, body) = self
            .send_json(
                "POST",
                "/api/categories",
                json!({"name": name, "color": color, "userId": user_id}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_expense(
        &self,
        user_id: &str,
        category_id: &str,
        amount: &str,
        date: NaiveDate,
    ) -> String {
        let (status, body) = self
            .send_json(
                "POST",
                "/api/expenses",
                json!({
                    "userId": user_id,
                    "categoryId": category_id,
                    "amount": amount,
                    "description": "test",
                    "date": date.to_string(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

/// Helper function to parse JSON response body
async fn parse_json_body(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn in_previous_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Days::new(1)
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_category_crud_flow() {
    let ctx = TestContext::new();
    let user_id = uuid::Uuid::new_v4().to_string();

    let id = ctx.create_category(&user_id, "Food", "#111").await;

    let (status, body) = ctx.get(&format!("/api/categories?userId={user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id);
    assert_eq!(body[0]["name"], "Food");
    assert_eq!(body[0]["type"], "expense");
    assert_eq!(body[0]["createdAt"], body[0]["updatedAt"]);

    let (status, body) = ctx
        .send_json(
            "PUT",
            &format!("/api/categories?id={id}"),
            json!({"color": "#222"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = ctx.get(&format!("/api/categories?userId={user_id}")).await;
    assert_eq!(body[0]["name"], "Food");
    assert_eq!(body[0]["color"], "#222");

    let (status, _) = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/categories?id={id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx.get(&format!("/api/categories?userId={user_id}")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_missing_parameters_are_400() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/categories").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID is required");

    let (status, body) = ctx
        .send_json("POST", "/api/categories", json!({"name": "Food"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: color, userId");

    let (status, body) = ctx
        .send_json("PUT", "/api/expenses", json!({"amount": "1.00"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Expense ID is required");
}

#[tokio::test]
async fn test_expense_amount_outside_column_range_is_400() {
    let ctx = TestContext::new();
    let user_id = uuid::Uuid::new_v4().to_string();
    let category_id = ctx.create_category(&user_id, "Food", "#111").await;

    for amount in ["1.005", "1000000000000", "79228162514264337593543950335"] {
        let (status, body) = ctx
            .send_json(
                "POST",
                "/api/expenses",
                json!({
                    "userId": user_id,
                    "categoryId": category_id,
                    "amount": amount,
                    "description": "test",
                    "date": "2026-03-01",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid expense"));
    }

    let (_, body) = ctx.get(&format!("/api/expenses?userId={user_id}")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_store_outage_is_500_with_generic_message() {
    let ctx = TestContext::new();
    ctx.store.set_unavailable(true);

    let (status, body) = ctx
        .get(&format!("/api/expenses?userId={}", uuid::Uuid::new_v4()))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch expenses");
}

#[tokio::test]
async fn test_expense_date_round_trips_and_list_is_newest_first() {
    let ctx = TestContext::new();
    let user_id = uuid::Uuid::new_v4().to_string();
    let category_id = ctx.create_category(&user_id, "Food", "#111").await;
    let older = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let newer = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();

    ctx.create_expense(&user_id, &category_id, "10.00", older).await;
    ctx.create_expense(&user_id, &category_id, "5.25", newer).await;

    let (status, body) = ctx.get(&format!("/api/expenses?userId={user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["date"], "2026-03-15");
    assert_eq!(body[0]["amount"], "5.25");
    assert_eq!(body[1]["date"], "2026-03-01");
}

#[tokio::test]
async fn test_auth_flow_and_error_strings() {
    let ctx = TestContext::new();
    ctx.register("ada@example.com").await;

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/auth/register",
            json!({"name": "Ada", "email": "ada@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "An account with this email already exists");

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/auth/register",
            json!({"name": "Bo", "email": "not-an-email", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/auth/login",
            json!({"email": "ada@example.com", "password": "nope-nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/auth/login",
            json!({"email": "ada@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get_authed("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_requires_bearer_token() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/dashboard").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization token");
}

#[tokio::test]
async fn test_dashboard_aggregates_current_and_previous_month() {
    let ctx = TestContext::new();
    let (token, user_id) = ctx.register("ada@example.com").await;
    let a = ctx.create_category(&user_id, "A", "#111").await;
    let b = ctx.create_category(&user_id, "B", "#222").await;

    let this_month = first_of_month(today());
    let last_month = in_previous_month(today());
    ctx.create_expense(&user_id, &a, "10.00", this_month).await;
    ctx.create_expense(&user_id, &a, "5.00", this_month).await;
    ctx.create_expense(&user_id, &a, "20.00", last_month).await;
    ctx.create_expense(&user_id, &b, "7.50", this_month).await;

    let (status, body) = ctx.get_authed("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["categoriesCount"], 2);
    assert_eq!(body["totalExpensesDisplay"], "$42.50");
    assert_eq!(body["monthlyTotalDisplay"], "$22.50");

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories[0]["name"], "A");
    assert_eq!(categories[0]["monthlyTotal"], "15.00");
    assert_eq!(categories[0]["previousMonthTotal"], "20.00");
    assert_eq!(categories[0]["percentageChange"], "-25.0");
    assert_eq!(categories[0]["transactions"].as_array().unwrap().len(), 2);

    assert_eq!(categories[1]["name"], "B");
    assert_eq!(categories[1]["monthlyTotal"], "7.50");
    assert_eq!(categories[1]["percentageChange"], "100");

    let (status, body) = ctx.get_authed("/api/dashboard?type=income", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!([]));
}

#[tokio::test]
async fn test_formatted_expenses_fall_back_to_unknown_after_category_delete() {
    let ctx = TestContext::new();
    let (token, user_id) = ctx.register("ada@example.com").await;
    let category_id = ctx.create_category(&user_id, "Travel", "#333").await;
    ctx.create_expense(&user_id, &category_id, "1234.5", today()).await;

    let (_, body) = ctx.get_authed("/api/dashboard/expenses", &token).await;
    assert_eq!(body[0]["categoryName"], "Travel");
    assert_eq!(body[0]["amount"], "$1,234.50");

    let (status, _) = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/categories?id={category_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx.get_authed("/api/dashboard/expenses", &token).await;
    assert_eq!(body[0]["categoryName"], "Unknown");
    assert_eq!(body[0]["categoryColor"], Value::Null);
}

#[tokio::test]
async fn test_dashboard_stream_redirects_without_session() {
    let ctx = TestContext::new();
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut stream = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for an event")
        .expect("stream ended early")
        .expect("body error");
    let text = String::from_utf8_lossy(&chunk);

    assert!(text.contains("event: redirect"));
    assert!(text.contains("data: /login"));
}
