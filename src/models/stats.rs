use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::category::Category;
use crate::models::expense::Expense;

/// A category together with its derived monthly statistics. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithStats {
    #[serde(flatten)]
    pub category: Category,
    #[schema(value_type = String)]
    pub monthly_total: Decimal,
    #[schema(value_type = String)]
    pub previous_month_total: Decimal,
    /// `"-25.0"`, or the saturated `"100"` / `"0"` when last month was empty
    pub percentage_change: String,
    /// Up to five current-month transactions, newest first
    pub transactions: Vec<Expense>,
}

/// All-time total of one category and its share of the grand total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    #[schema(value_type = String)]
    pub total: Decimal,
    #[schema(value_type = String)]
    pub percentage: Decimal,
}

/// An expense prepared for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormattedExpense {
    pub id: Uuid,
    pub amount: String,
    pub description: String,
    pub date: String,
    pub category_id: Uuid,
    pub category_name: String,
    /// Absent when the category no longer exists
    pub category_color: Option<String>,
}

/// Everything the dashboard shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    #[schema(value_type = String)]
    pub total_expenses: Decimal,
    #[schema(value_type = String)]
    pub monthly_total: Decimal,
    pub categories_count: usize,
    pub total_expenses_display: String,
    pub monthly_total_display: String,
    pub categories: Vec<CategoryWithStats>,
    pub category_totals: Vec<CategoryTotal>,
}
