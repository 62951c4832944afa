use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::live::hub::{ChangeHub, Collection};
use crate::models::category::{Category, CategoryPatch, NewCategory};
use crate::repositories::RepositoryError;
use crate::repositories::category_repository::CategoryRepository;

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Missing required fields: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for CategoryError {
    fn from(err: RepositoryError) -> Self {
        CategoryError::Persistence(err.to_string())
    }
}

/// Trait defining category gateway operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Create a category and return its new id
    async fn create_category(&self, category: NewCategory) -> Result<Uuid, CategoryError>;

    /// Get all categories owned by a user
    async fn get_categories(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError>;

    /// Merge the given fields into a category. Unknown ids are a no-op.
    async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<(), CategoryError>;

    /// Delete a category. Expenses referencing it are left alone.
    async fn delete_category(&self, id: Uuid) -> Result<(), CategoryError>;
}

/// Implementation of CategoryService
pub struct CategoryServiceImpl {
    category_repository: Arc<dyn CategoryRepository>,
    hub: ChangeHub,
}

impl CategoryServiceImpl {
    pub fn new(category_repository: Arc<dyn CategoryRepository>, hub: ChangeHub) -> Self {
        Self {
            category_repository,
            hub,
        }
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn create_category(&self, category: NewCategory) -> Result<Uuid, CategoryError> {
        let mut missing = Vec::new();
        if category.name.is_empty() {
            missing.push("name");
        }
        if category.color.is_empty() {
            missing.push("color");
        }
        if !missing.is_empty() {
            return Err(CategoryError::Validation(missing.join(", ")));
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: category.name,
            color: category.color,
            user_id: category.user_id,
            category_type: category.category_type,
            created_at: now,
            updated_at: now,
        };

        let created = self.category_repository.create(category).await?;
        info!(category_id = %created.id, user_id = %created.user_id, "category created");
        self.hub.publish(Collection::Categories, created.user_id);
        Ok(created.id)
    }

    async fn get_categories(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError> {
        let categories = self.category_repository.find_by_user(user_id).await?;
        debug!(%user_id, count = categories.len(), "listed categories");
        Ok(categories)
    }

    async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<(), CategoryError> {
        match self.category_repository.update(id, patch, Utc::now()).await? {
            Some(owner) => {
                info!(category_id = %id, "category updated");
                self.hub.publish(Collection::Categories, owner);
            }
            None => debug!(category_id = %id, "update for unknown category ignored"),
        }
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), CategoryError> {
        if let Some(owner) = self.category_repository.delete(id).await? {
            info!(category_id = %id, "category deleted");
            self.hub.publish(Collection::Categories, owner);
        }
        Ok(())
    }
}
