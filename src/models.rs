pub mod auth;
pub mod category;
pub mod expense;
pub mod stats;
pub mod user;

pub use auth::{LoginRequest, Session, SessionState, SignUpRequest, UpdateProfileRequest};
pub use category::{Category, CategoryPatch, CategoryType, CreateCategoryRequest, NewCategory};
pub use expense::{CreateExpenseRequest, Expense, ExpensePatch, NewExpense};
pub use stats::{CategoryTotal, CategoryWithStats, DashboardView, FormattedExpense};
pub use user::{Identity, User};
