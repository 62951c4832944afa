//! Per-category monthly rollups for the dashboard.
//!
//! Everything here is a pure function of its inputs and is recomputed from
//! scratch on every feed update.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::models::stats::{CategoryTotal, CategoryWithStats};

/// Length of the per-category recent transaction list
pub const RECENT_TRANSACTIONS: usize = 5;

/// Display name for expenses whose category no longer exists
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// The current and previous calendar month relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub previous_month_start: NaiveDate,
    pub current_month_start: NaiveDate,
}

impl MonthWindow {
    pub fn containing(today: NaiveDate) -> Self {
        let current_month_start = today - Days::new(u64::from(today.day0()));
        let last_of_previous = current_month_start - Days::new(1);
        let previous_month_start = last_of_previous - Days::new(u64::from(last_of_previous.day0()));
        Self {
            previous_month_start,
            current_month_start,
        }
    }

    pub fn is_current(&self, date: NaiveDate) -> bool {
        date >= self.current_month_start
    }

    pub fn is_previous(&self, date: NaiveDate) -> bool {
        date >= self.previous_month_start && date < self.current_month_start
    }
}

/// Month-over-month change as displayed.
///
/// When last month is zero there is no meaningful ratio; the result saturates
/// to `"100"` for any positive current total and `"0"` otherwise. Everything
/// else is the percentage with one decimal place, e.g. `"-25.0"`. A ratio too
/// large to represent saturates the same way.
pub fn percentage_change(current: Decimal, previous: Decimal) -> String {
    let saturated = || if current > previous { "100" } else { "0" }.to_string();
    if previous.is_zero() {
        return saturated();
    }

    let change = current
        .checked_sub(previous)
        .and_then(|delta| delta.checked_div(previous))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    match change {
        Some(change) => {
            let rounded = change.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.1}")
        }
        None => {
            warn!(%current, %previous, "percentage change out of range");
            saturated()
        }
    }
}

/// Whether an amount takes part in totals; negative amounts never do
pub fn counts_toward_totals(expense: &Expense) -> bool {
    expense.amount >= Decimal::ZERO
}

/// Sums amounts, capping at `Decimal::MAX` instead of overflowing
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).unwrap_or(Decimal::MAX)
    })
}

/// Builds the per-category statistics shown on the dashboard.
///
/// Transactions are matched to categories by id and split into the current
/// and previous month of `today`. Anything older is ignored; future-dated
/// transactions count toward the current month. Negative amounts are dropped.
/// The result is ordered by current-month total, highest first, keeping the
/// input order for ties.
pub fn aggregate(
    categories: &[Category],
    transactions: &[Expense],
    today: NaiveDate,
) -> Vec<CategoryWithStats> {
    let window = MonthWindow::containing(today);

    let mut by_category: HashMap<Uuid, Vec<&Expense>> = HashMap::new();
    for transaction in transactions {
        if !counts_toward_totals(transaction) {
            warn!(
                expense_id = %transaction.id,
                amount = %transaction.amount,
                "negative amount left out of category totals"
            );
            continue;
        }
        by_category
            .entry(transaction.category_id)
            .or_default()
            .push(transaction);
    }

    let mut stats: Vec<CategoryWithStats> = categories
        .iter()
        .map(|category| {
            let own = by_category
                .get(&category.id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut current: Vec<&Expense> = own
                .iter()
                .copied()
                .filter(|t| window.is_current(t.date))
                .collect();
            let monthly_total = sum_amounts(current.iter().map(|t| t.amount));
            let previous_month_total = sum_amounts(
                own.iter()
                    .filter(|t| window.is_previous(t.date))
                    .map(|t| t.amount),
            );

            current.sort_by(|a, b| b.date.cmp(&a.date));
            let transactions = current
                .into_iter()
                .take(RECENT_TRANSACTIONS)
                .cloned()
                .collect();

            CategoryWithStats {
                category: category.clone(),
                monthly_total,
                previous_month_total,
                percentage_change: percentage_change(monthly_total, previous_month_total),
                transactions,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.monthly_total.cmp(&a.monthly_total));
    stats
}

/// All-time total per category and its share of the grand total, in order of
/// first appearance. Expenses pointing at a missing category are grouped
/// under [`UNKNOWN_CATEGORY`]. Negative amounts are left out, so the shares
/// never add up to more than 100.
pub fn category_totals(expenses: &[Expense], categories: &[Category]) -> Vec<CategoryTotal> {
    let lookup: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let counted: Vec<&Expense> = expenses.iter().filter(|e| counts_toward_totals(e)).collect();
    let grand_total = sum_amounts(counted.iter().map(|e| e.amount));

    let mut order: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
    for expense in counted {
        let total = totals.entry(expense.category_id).or_insert_with(|| {
            order.push(expense.category_id);
            Decimal::ZERO
        });
        *total = sum_amounts([*total, expense.amount]);
    }

    order
        .into_iter()
        .map(|category_id| {
            let total = totals.get(&category_id).copied().unwrap_or_default();
            let percentage = total
                .checked_div(grand_total)
                .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
                .map(|p| p.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
                .unwrap_or(Decimal::ZERO);
            let category = lookup.get(&category_id);
            CategoryTotal {
                category_id,
                name: category
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                color: category.map(|c| c.color.clone()),
                total,
                percentage,
            }
        })
        .collect()
}
