use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Expense entity representing a single spending transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    #[schema(value_type = String, example = "42.50")]
    pub amount: Decimal,
    pub description: String,
    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,
    pub user_id: Uuid,
    /// Not enforced: the referenced category may have been deleted
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an expense; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub user_id: Uuid,
    pub category_id: Uuid,
}

/// Partial update for an expense. The owning user cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[schema(value_type = Option<String>, example = "45.00")]
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    #[schema(format = "date", example = "2024-01-16")]
    pub date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.category_id.is_none()
    }
}

/// Request payload for creating an expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "amount": "42.50",
    "description": "Weekly shop",
    "date": "2024-01-15",
    "userId": "550e8400-e29b-41d4-a716-446655440000",
    "categoryId": "6fa459ea-ee8a-3ca4-894e-db77e160355e"
}))]
pub struct CreateExpenseRequest {
    #[validate(required)]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,

    pub description: Option<String>,

    #[validate(required)]
    #[schema(format = "date")]
    pub date: Option<NaiveDate>,

    #[validate(required)]
    pub user_id: Option<Uuid>,

    #[validate(required)]
    pub category_id: Option<Uuid>,
}

impl CreateExpenseRequest {
    /// Converts a validated request; `None` if a required field is missing.
    pub fn into_new_expense(self) -> Option<NewExpense> {
        Some(NewExpense {
            amount: self.amount?,
            description: self.description.unwrap_or_default(),
            date: self.date?,
            user_id: self.user_id?,
            category_id: self.category_id?,
        })
    }
}
