//! View models served to clients, built from gateway data and live feeds.

pub mod dashboard;
pub mod expenses;
pub mod stream;

pub use dashboard::{DashboardReconciler, build_dashboard};
pub use expenses::format_expenses;
pub use stream::{ViewEvent, spawn_dashboard_session};
