use std::collections::HashMap;
use uuid::Uuid;

use crate::formatting::{CurrencyFormatter, format_date};
use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::models::stats::FormattedExpense;
use crate::services::aggregation::UNKNOWN_CATEGORY;

/// Prepares expenses for the list view, keeping their order. Expenses whose
/// category is gone show as "Unknown" without a color.
pub fn format_expenses(
    expenses: &[Expense],
    categories: &[Category],
    formatter: &CurrencyFormatter,
) -> Vec<FormattedExpense> {
    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    expenses
        .iter()
        .map(|expense| {
            let category = by_id.get(&expense.category_id);
            FormattedExpense {
                id: expense.id,
                amount: formatter.format(expense.amount),
                description: expense.description.clone(),
                date: format_date(expense.date),
                category_id: expense.category_id,
                category_name: category
                    .map_or(UNKNOWN_CATEGORY, |c| c.name.as_str())
                    .to_string(),
                category_color: category.map(|c| c.color.clone()),
            }
        })
        .collect()
}
