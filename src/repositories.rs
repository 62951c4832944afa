pub mod category_repository;
pub mod expense_repository;
pub mod memory;
pub mod user_repository;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Repository errors for store operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::ConstraintViolation(db_err.to_string())
            }
            other => RepositoryError::DatabaseError(other.to_string()),
        }
    }
}

/// Calendar dates are stored as the store's native timestamp at midnight UTC.
pub fn date_to_store(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Reads a stored timestamp back as the calendar date it was written from.
pub fn date_from_store(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}
