use chrono::NaiveDate;

use crate::formatting::CurrencyFormatter;
use crate::live::feed::Snapshot;
use crate::models::category::{Category, CategoryType};
use crate::models::expense::Expense;
use crate::models::stats::DashboardView;
use crate::services::aggregation::{
    MonthWindow, aggregate, category_totals, counts_toward_totals, sum_amounts,
};

/// Builds the dashboard for one user's categories and expenses.
///
/// `filter` restricts which categories get statistics; the headline totals
/// always cover every expense with a non-negative amount.
pub fn build_dashboard(
    categories: &[Category],
    expenses: &[Expense],
    filter: Option<CategoryType>,
    today: NaiveDate,
    formatter: &CurrencyFormatter,
) -> DashboardView {
    let visible: Vec<Category> = categories
        .iter()
        .filter(|c| filter.is_none_or(|t| c.category_type == t))
        .cloned()
        .collect();

    let window = MonthWindow::containing(today);
    let counted = || expenses.iter().filter(|e| counts_toward_totals(e));
    let total_expenses = sum_amounts(counted().map(|e| e.amount));
    let monthly_total = sum_amounts(
        counted()
            .filter(|e| window.is_current(e.date))
            .map(|e| e.amount),
    );

    DashboardView {
        total_expenses,
        monthly_total,
        categories_count: visible.len(),
        total_expenses_display: formatter.format(total_expenses),
        monthly_total_display: formatter.format(monthly_total),
        categories: aggregate(&visible, expenses, today),
        category_totals: category_totals(expenses, categories),
    }
}

/// Joins the categories feed and the expenses feed into one dashboard.
///
/// Each feed's latest snapshot replaces its previous one. No view is produced
/// until both feeds have delivered at least once.
#[derive(Debug, Clone, Default)]
pub struct DashboardReconciler {
    categories: Option<Vec<Category>>,
    expenses: Option<Vec<Expense>>,
    filter: Option<CategoryType>,
    formatter: CurrencyFormatter,
}

impl DashboardReconciler {
    pub fn new(filter: Option<CategoryType>, formatter: CurrencyFormatter) -> Self {
        Self {
            categories: None,
            expenses: None,
            filter,
            formatter,
        }
    }

    pub fn apply(&mut self, snapshot: Snapshot, today: NaiveDate) -> Option<DashboardView> {
        match snapshot {
            Snapshot::Categories(categories) => self.categories = Some(categories),
            Snapshot::Expenses(expenses) => self.expenses = Some(expenses),
        }

        let (categories, expenses) = (self.categories.as_ref()?, self.expenses.as_ref()?);
        Some(build_dashboard(
            categories,
            expenses,
            self.filter,
            today,
            &self.formatter,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn category(user_id: Uuid, name: &str, category_type: CategoryType) -> Category {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: "#111".to_string(),
            user_id,
            category_type,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn expense(category: &Category, amount: Decimal, date: NaiveDate) -> Expense {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Expense {
            id: Uuid::new_v4(),
            amount,
            description: String::new(),
            date,
            user_id: category.user_id,
            category_id: category.id,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_build_dashboard_totals_and_display_strings() {
        let user = Uuid::new_v4();
        let a = category(user, "A", CategoryType::Expense);
        let b = category(user, "B", CategoryType::Expense);
        let expenses = vec![
            expense(&a, dec!(10.00), date(2026, 10, 12)),
            expense(&a, dec!(5.00), date(2026, 10, 3)),
            expense(&a, dec!(20.00), date(2026, 9, 14)),
            expense(&b, dec!(1200.00), date(2026, 10, 1)),
        ];

        let view = build_dashboard(
            &[a.clone(), b.clone()],
            &expenses,
            None,
            date(2026, 10, 18),
            &CurrencyFormatter::default(),
        );

        assert_eq!(view.total_expenses, dec!(1235.00));
        assert_eq!(view.monthly_total, dec!(1215.00));
        assert_eq!(view.total_expenses_display, "$1,235.00");
        assert_eq!(view.monthly_total_display, "$1,215.00");
        assert_eq!(view.categories_count, 2);
        assert_eq!(view.categories[0].category.id, b.id);
        assert_eq!(view.categories[1].percentage_change, "-25.0");
        assert_eq!(view.category_totals.len(), 2);
    }

    #[test]
    fn test_type_filter_restricts_categories_only() {
        let user = Uuid::new_v4();
        let food = category(user, "Food", CategoryType::Expense);
        let salary = category(user, "Salary", CategoryType::Income);
        let expenses = vec![
            expense(&food, dec!(10), date(2026, 10, 2)),
            expense(&salary, dec!(100), date(2026, 10, 1)),
        ];

        let view = build_dashboard(
            &[food.clone(), salary],
            &expenses,
            Some(CategoryType::Expense),
            date(2026, 10, 18),
            &CurrencyFormatter::default(),
        );

        assert_eq!(view.categories_count, 1);
        assert_eq!(view.categories[0].category.id, food.id);
        assert_eq!(view.total_expenses, dec!(110));
    }

    #[test]
    fn test_headline_totals_skip_negative_amounts() {
        let user = Uuid::new_v4();
        let a = category(user, "A", CategoryType::Expense);
        let expenses = vec![
            expense(&a, dec!(40.00), date(2026, 10, 2)),
            expense(&a, dec!(-15.00), date(2026, 10, 3)),
            expense(&a, dec!(-5.00), date(2026, 8, 3)),
        ];

        let view = build_dashboard(
            &[a.clone()],
            &expenses,
            None,
            date(2026, 10, 18),
            &CurrencyFormatter::default(),
        );

        assert_eq!(view.total_expenses, dec!(40.00));
        assert_eq!(view.monthly_total, dec!(40.00));
        assert_eq!(view.categories[0].monthly_total, view.monthly_total);
        assert_eq!(view.category_totals[0].percentage, dec!(100.0));
    }

    #[test]
    fn test_headline_totals_cap_instead_of_overflowing() {
        let user = Uuid::new_v4();
        let a = category(user, "A", CategoryType::Expense);
        let expenses = vec![
            expense(&a, Decimal::MAX, date(2026, 10, 2)),
            expense(&a, Decimal::MAX, date(2026, 10, 3)),
        ];

        let view = build_dashboard(
            &[a],
            &expenses,
            None,
            date(2026, 10, 18),
            &CurrencyFormatter::default(),
        );

        assert_eq!(view.total_expenses, Decimal::MAX);
        assert_eq!(view.monthly_total, Decimal::MAX);
    }

    #[test]
    fn test_reconciler_waits_for_both_feeds_then_recomputes_on_each() {
        let user = Uuid::new_v4();
        let a = category(user, "A", CategoryType::Expense);
        let today = date(2026, 10, 18);
        let mut reconciler = DashboardReconciler::new(None, CurrencyFormatter::default());

        assert!(
            reconciler
                .apply(Snapshot::Categories(vec![a.clone()]), today)
                .is_none()
        );

        let view = reconciler
            .apply(
                Snapshot::Expenses(vec![expense(&a, dec!(7.50), date(2026, 10, 5))]),
                today,
            )
            .unwrap();
        assert_eq!(view.categories[0].monthly_total, dec!(7.50));
        assert_eq!(view.categories[0].percentage_change, "100");

        // A newer expenses snapshot replaces the old one entirely.
        let view = reconciler.apply(Snapshot::Expenses(vec![]), today).unwrap();
        assert_eq!(view.categories[0].monthly_total, Decimal::ZERO);
        assert_eq!(view.categories[0].percentage_change, "0");

        let view = reconciler.apply(Snapshot::Categories(vec![]), today).unwrap();
        assert!(view.categories.is_empty());
    }
}
