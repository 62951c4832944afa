use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::category::{Category, CategoryPatch, CategoryType};
use crate::repositories::RepositoryError;

/// Trait defining category repository operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a fully built category
    async fn create(&self, category: Category) -> Result<Category, RepositoryError>;

    /// Find all categories owned by a user
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Category>, RepositoryError>;

    /// Merge the patch into the category. Returns its owner, or `None` if no
    /// category has this id.
    async fn update(
        &self,
        id: Uuid,
        patch: CategoryPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError>;

    /// Delete a category. Returns the owner of the removed row, if any.
    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    color: String,
    user_id: Uuid,
    category_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            color: row.color,
            user_id: row.user_id,
            category_type: CategoryType::from_db_str(&row.category_type),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL implementation of CategoryRepository
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn create(&self, category: Category) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (id, name, color, user_id, category_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, color, user_id, category_type, created_at, updated_at
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(category.user_id)
        .bind(category.category_type.as_db_str())
        .bind(category.created_at)
        .bind(category.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, color, user_id, category_type, created_at, updated_at
            FROM categories
            WHERE user_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: CategoryPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                color = COALESCE($3, color),
                category_type = COALESCE($4, category_type),
                updated_at = $5
            WHERE id = $1
            RETURNING user_id
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.color)
        .bind(patch.category_type.map(|t| t.as_db_str()))
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM categories WHERE id = $1 RETURNING user_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }
}
