use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AmountPolicy;
use crate::live::hub::{ChangeHub, Collection};
use crate::models::expense::{Expense, ExpensePatch, NewExpense};
use crate::repositories::RepositoryError;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::validation::{validate_amount_range, validate_non_negative_amount};

/// Expense service errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Invalid expense: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for ExpenseError {
    fn from(err: RepositoryError) -> Self {
        ExpenseError::Persistence(err.to_string())
    }
}

/// Trait defining expense gateway operations
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// Create an expense and return its new id
    async fn create_expense(&self, expense: NewExpense) -> Result<Uuid, ExpenseError>;

    /// Get all expenses owned by a user, sorted by date descending
    async fn get_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError>;

    /// Merge the given fields into an expense. Unknown ids are a no-op.
    async fn update_expense(&self, id: Uuid, patch: ExpensePatch) -> Result<(), ExpenseError>;

    /// Delete an expense; deleting an unknown id succeeds
    async fn delete_expense(&self, id: Uuid) -> Result<(), ExpenseError>;
}

/// Implementation of ExpenseService
pub struct ExpenseServiceImpl {
    expense_repository: Arc<dyn ExpenseRepository>,
    hub: ChangeHub,
    amount_policy: AmountPolicy,
}

impl ExpenseServiceImpl {
    pub fn new(
        expense_repository: Arc<dyn ExpenseRepository>,
        hub: ChangeHub,
        amount_policy: AmountPolicy,
    ) -> Self {
        Self {
            expense_repository,
            hub,
            amount_policy,
        }
    }

    fn check_amount(&self, amount: &rust_decimal::Decimal) -> Result<(), ExpenseError> {
        let invalid = |e: validator::ValidationError| {
            ExpenseError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid amount".to_string()),
            )
        };
        validate_amount_range(amount).map_err(invalid)?;
        if self.amount_policy == AmountPolicy::Strict {
            validate_non_negative_amount(amount).map_err(invalid)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ExpenseService for ExpenseServiceImpl {
    async fn create_expense(&self, expense: NewExpense) -> Result<Uuid, ExpenseError> {
        self.check_amount(&expense.amount)?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            amount: expense.amount,
            description: expense.description,
            date: expense.date,
            user_id: expense.user_id,
            category_id: expense.category_id,
            created_at: now,
            updated_at: now,
        };

        let created = self.expense_repository.create(expense).await?;
        info!(expense_id = %created.id, user_id = %created.user_id, "expense created");
        self.hub.publish(Collection::Expenses, created.user_id);
        Ok(created.id)
    }

    async fn get_expenses(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError> {
        // Repository already returns entries sorted by date descending
        let expenses = self.expense_repository.find_by_user(user_id).await?;
        debug!(%user_id, count = expenses.len(), "listed expenses");
        Ok(expenses)
    }

    async fn update_expense(&self, id: Uuid, patch: ExpensePatch) -> Result<(), ExpenseError> {
        if let Some(amount) = &patch.amount {
            self.check_amount(amount)?;
        }

        match self.expense_repository.update(id, patch, Utc::now()).await? {
            Some(owner) => {
                info!(expense_id = %id, "expense updated");
                self.hub.publish(Collection::Expenses, owner);
            }
            None => debug!(expense_id = %id, "update for unknown expense ignored"),
        }
        Ok(())
    }

    async fn delete_expense(&self, id: Uuid) -> Result<(), ExpenseError> {
        if let Some(owner) = self.expense_repository.delete(id).await? {
            info!(expense_id = %id, "expense deleted");
            self.hub.publish(Collection::Expenses, owner);
        }
        Ok(())
    }
}
