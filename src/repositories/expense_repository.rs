use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::expense::{Expense, ExpensePatch};
use crate::repositories::{RepositoryError, date_from_store, date_to_store};

/// Trait defining expense repository operations
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Insert a fully built expense
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError>;

    /// Find all expenses owned by a user, sorted by date descending
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError>;

    /// Merge the patch into the expense. Returns its owner, or `None` if no
    /// expense has this id.
    async fn update(
        &self,
        id: Uuid,
        patch: ExpensePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError>;

    /// Delete an expense. Returns the owner of the removed row, if any.
    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: Uuid,
    amount: Decimal,
    description: String,
    date: DateTime<Utc>,
    user_id: Uuid,
    category_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            amount: row.amount,
            description: row.description,
            date: date_from_store(row.date),
            user_id: row.user_id,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL implementation of ExpenseRepository
pub struct PostgresExpenseRepository {
    pool: PgPool,
}

impl PostgresExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for PostgresExpenseRepository {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            INSERT INTO expenses (
                id, amount, description, date, user_id,
                category_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, amount, description, date, user_id,
                      category_id, created_at, updated_at
            "#,
        )
        .bind(expense.id)
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(date_to_store(expense.date))
        .bind(expense.user_id)
        .bind(expense.category_id)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, amount, description, date, user_id,
                   category_id, created_at, updated_at
            FROM expenses
            WHERE user_id = $1
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: ExpensePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE expenses
            SET amount = COALESCE($2, amount),
                description = COALESCE($3, description),
                date = COALESCE($4, date),
                category_id = COALESCE($5, category_id),
                updated_at = $6
            WHERE id = $1
            RETURNING user_id
            "#,
        )
        .bind(id)
        .bind(patch.amount)
        .bind(patch.description)
        .bind(patch.date.map(date_to_store))
        .bind(patch.category_id)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM expenses WHERE id = $1 RETURNING user_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }
}
