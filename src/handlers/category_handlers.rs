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
use crate::models::category::{Category, CategoryPatch, CreateCategoryRequest};
use crate::services::category_service::{CategoryError, CategoryService};
use crate::validation::missing_fields_message;

/// Maps a service failure to a response; persistence details are logged, not returned
fn failure(err: CategoryError, operation: &str) -> Response {
    match err {
        CategoryError::Validation(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        CategoryError::Persistence(detail) => {
            error!(%detail, "{operation} failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {operation}"),
            )
        }
    }
}

/// Handler for listing a user's categories
#[utoipa::path(
    get,
    path = "/api/categories",
    params(UserIdQuery),
    responses(
        (status = 200, description = "Categories owned by the user", body = Vec<Category>),
        (status = 400, description = "Missing user id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn list_categories_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Vec<Category>>, Response> {
    let user_id = required_id(query.user_id.as_deref(), "User ID is required")?;

    category_service
        .get_categories(user_id)
        .await
        .map(Json)
        .map_err(|e| failure(e, "fetch categories"))
}

/// Handler for creating a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CreatedResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    body: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), Response> {
    let request = json_body(body)?;
    if let Err(validation_errors) = request.validate() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            missing_fields_message(&validation_errors),
        ));
    }

    let new_category = request.into_new_category().ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Missing required fields")
    })?;

    match category_service.create_category(new_category).await {
        Ok(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        Err(e) => Err(failure(e, "create category")),
    }
}

/// Handler for updating a category
///
/// Only the fields present in the body change.
#[utoipa::path(
    put,
    path = "/api/categories",
    params(IdQuery),
    request_body = CategoryPatch,
    responses(
        (status = 200, description = "Category updated", body = SuccessResponse),
        (status = 400, description = "Missing category id or malformed body", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn update_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Query(query): Query<IdQuery>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Response> {
    let id = required_id(query.id.as_deref(), "Category ID is required")?;
    let patch = json_body(body)?;

    category_service
        .update_category(id, patch)
        .await
        .map(|()| SuccessResponse::ok())
        .map_err(|e| failure(e, "update category"))
}

/// Handler for deleting a category
///
/// Expenses referencing the category are kept.
#[utoipa::path(
    delete,
    path = "/api/categories",
    params(IdQuery),
    responses(
        (status = 200, description = "Category deleted", body = SuccessResponse),
        (status = 400, description = "Missing category id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<SuccessResponse>, Response> {
    let id = required_id(query.id.as_deref(), "Category ID is required")?;

    category_service
        .delete_category(id)
        .await
        .map(|()| SuccessResponse::ok())
        .map_err(|e| failure(e, "delete category"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::hub::ChangeHub;
    use crate::repositories::memory::MemoryStore;
    use crate::services::category_service::CategoryServiceImpl;
    use uuid::Uuid;

    fn service(store: Arc<MemoryStore>) -> Arc<dyn CategoryService> {
        Arc::new(CategoryServiceImpl::new(store, ChangeHub::default()))
    }

    fn create_request(user_id: Option<Uuid>, name: Option<&str>) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.map(str::to_string),
            color: Some("#111".to_string()),
            user_id,
            category_type: None,
        }
    }

    async fn error_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_category_handler_success() {
        let service = service(Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();

        let result = create_category_handler(
            State(service.clone()),
            Ok(Json(create_request(Some(user_id), Some("Food")))),
        )
        .await;

        let (status, Json(created)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let categories = service.get_categories(user_id).await.unwrap();
        assert_eq!(categories[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_category_handler_lists_missing_fields() {
        let service = service(Arc::new(MemoryStore::new()));

        let response = create_category_handler(State(service), Ok(Json(create_request(None, None))))
            .await
            .unwrap_err();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_text(response).await,
            "Missing required fields: name, userId"
        );
    }

    #[tokio::test]
    async fn test_list_categories_handler_requires_user_id() {
        let service = service(Arc::new(MemoryStore::new()));

        let response = list_categories_handler(State(service), Query(UserIdQuery { user_id: None }))
            .await
            .unwrap_err();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_text(response).await, "User ID is required");
    }

    #[tokio::test]
    async fn test_store_failure_is_generic_500() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let service = service(store);

        let response = delete_category_handler(
            State(service),
            Query(IdQuery {
                id: Some(Uuid::new_v4().to_string()),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_text(response).await, "Failed to delete category");
    }
}
