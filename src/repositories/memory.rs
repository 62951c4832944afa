//! In-process store used when no database is configured, and by the tests.
//!
//! Records are kept the way the document store keeps them: flat, keyed by id,
//! with calendar dates held as UTC timestamps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::models::category::{Category, CategoryPatch};
use crate::models::expense::{Expense, ExpensePatch};
use crate::models::user::User;
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::repositories::user_repository::UserRepository;
use crate::repositories::{RepositoryError, date_from_store, date_to_store};

#[derive(Debug, Clone)]
struct StoredExpense {
    amount: Decimal,
    description: String,
    date: DateTime<Utc>,
    user_id: Uuid,
    category_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredExpense {
    fn to_expense(&self, id: Uuid) -> Expense {
        Expense {
            id,
            amount: self.amount,
            description: self.description.clone(),
            date: date_from_store(self.date),
            user_id: self.user_id,
            category_id: self.category_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    categories: Mutex<HashMap<Uuid, Category>>,
    expenses: Mutex<HashMap<Uuid, StoredExpense>>,
    users: Mutex<HashMap<Uuid, User>>,
    unavailable: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseError(
                "store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: Category) -> Result<Category, RepositoryError> {
        self.check_available()?;
        lock(&self.categories).insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Category>, RepositoryError> {
        self.check_available()?;
        let mut result: Vec<Category> = lock(&self.categories)
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: CategoryPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError> {
        self.check_available()?;
        let mut categories = lock(&self.categories);
        let Some(category) = categories.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(color) = patch.color {
            category.color = color;
        }
        if let Some(category_type) = patch.category_type {
            category.category_type = category_type;
        }
        category.updated_at = updated_at;
        Ok(Some(category.user_id))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        self.check_available()?;
        Ok(lock(&self.categories).remove(&id).map(|c| c.user_id))
    }
}

#[async_trait]
impl ExpenseRepository for MemoryStore {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        self.check_available()?;
        let stored = StoredExpense {
            amount: expense.amount,
            description: expense.description,
            date: date_to_store(expense.date),
            user_id: expense.user_id,
            category_id: expense.category_id,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        };
        let created = stored.to_expense(expense.id);
        lock(&self.expenses).insert(expense.id, stored);
        Ok(created)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Expense>, RepositoryError> {
        self.check_available()?;
        let mut result: Vec<Expense> = lock(&self.expenses)
            .iter()
            .filter(|(_, e)| e.user_id == user_id)
            .map(|(id, e)| e.to_expense(*id))
            .collect();

        // Sort by date descending (most recent first)
        result.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(result)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: ExpensePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, RepositoryError> {
        self.check_available()?;
        let mut expenses = lock(&self.expenses);
        let Some(expense) = expenses.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(amount) = patch.amount {
            expense.amount = amount;
        }
        if let Some(description) = patch.description {
            expense.description = description;
        }
        if let Some(date) = patch.date {
            expense.date = date_to_store(date);
        }
        if let Some(category_id) = patch.category_id {
            expense.category_id = category_id;
        }
        expense.updated_at = updated_at;
        Ok(Some(expense.user_id))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        self.check_available()?;
        Ok(lock(&self.expenses).remove(&id).map(|e| e.user_id))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        self.check_available()?;
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::ConstraintViolation(
                "Email already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        Ok(lock(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn update_name(
        &self,
        id: Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let mut users = lock(&self.users);
        Ok(users.get_mut(&id).map(|user| {
            user.name = name.to_string();
            user.updated_at = updated_at;
            user.clone()
        }))
    }
}
