use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Whether a category tracks money going out or coming in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    #[default]
    Expense,
    Income,
}

impl CategoryType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "expense",
            CategoryType::Income => "income",
        }
    }

    /// Unrecognized values fall back to `Expense`, the type every legacy row had.
    pub fn from_db_str(value: &str) -> Self {
        match value {
            "income" => CategoryType::Income,
            _ => CategoryType::Expense,
        }
    }
}

/// Category entity owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Display color as a hex string, e.g. `#6366F1`
    pub color: String,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a category; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub user_id: Uuid,
    pub category_type: CategoryType,
}

/// Partial update for a category. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.category_type.is_none()
    }
}

/// Request payload for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Groceries",
    "color": "#6366F1",
    "userId": "550e8400-e29b-41d4-a716-446655440000",
    "type": "expense"
}))]
pub struct CreateCategoryRequest {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,

    #[validate(required, length(min = 1))]
    pub color: Option<String>,

    #[validate(required)]
    pub user_id: Option<Uuid>,

    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

impl CreateCategoryRequest {
    /// Converts a validated request; `None` if a required field is missing.
    pub fn into_new_category(self) -> Option<NewCategory> {
        Some(NewCategory {
            name: self.name?,
            color: self.color?,
            user_id: self.user_id?,
            category_type: self.category_type.unwrap_or_default(),
        })
    }
}
