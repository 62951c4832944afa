//! Per-connection dashboard session: a session gate whose feeds feed a
//! reconciler, with every outcome sent to the client as a `ViewEvent`.

use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::formatting::CurrencyFormatter;
use crate::live::feed::{FeedHandle, LiveQueries};
use crate::live::hub::Collection;
use crate::models::category::CategoryType;
use crate::models::stats::DashboardView;
use crate::models::user::Identity;
use crate::services::auth_service::IdentityProvider;
use crate::session::gate::{SessionGate, SessionObserver};
use crate::views::dashboard::DashboardReconciler;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Dashboard(Box<DashboardView>),
    Error(String),
    Redirect(&'static str),
}

impl ViewEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::Dashboard(_) => "dashboard",
            ViewEvent::Error(_) => "error",
            ViewEvent::Redirect(_) => "redirect",
        }
    }
}

struct DashboardObserver {
    live: LiveQueries,
    events: mpsc::UnboundedSender<ViewEvent>,
    filter: Option<CategoryType>,
    formatter: CurrencyFormatter,
    today: fn() -> NaiveDate,
}

impl SessionObserver for DashboardObserver {
    fn open_feeds(&mut self, identity: &Identity) -> Vec<FeedHandle> {
        let reconciler = Arc::new(Mutex::new(DashboardReconciler::new(
            self.filter,
            self.formatter.clone(),
        )));

        [Collection::Categories, Collection::Expenses]
            .into_iter()
            .map(|collection| {
                let reconciler = reconciler.clone();
                let views = self.events.clone();
                let errors = self.events.clone();
                let today = self.today;
                self.live.open(
                    collection,
                    identity.user_id,
                    move |snapshot| {
                        let view = reconciler
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .apply(snapshot, today());
                        if let Some(view) = view {
                            let _ = views.send(ViewEvent::Dashboard(Box::new(view)));
                        }
                    },
                    move |err| {
                        let _ = errors.send(ViewEvent::Error(err.to_string()));
                    },
                )
            })
            .collect()
    }

    fn redirect_to_login(&mut self) {
        let _ = self.events.send(ViewEvent::Redirect(LOGIN_PATH));
    }
}

fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Starts a dashboard session for `token` and returns its event stream.
///
/// The session ends, and every feed it opened is closed, when the receiver
/// is dropped or when the token's session can no longer change.
pub fn spawn_dashboard_session(
    identity: Arc<dyn IdentityProvider>,
    live: LiveQueries,
    token: String,
    filter: Option<CategoryType>,
    formatter: CurrencyFormatter,
) -> mpsc::UnboundedReceiver<ViewEvent> {
    let (events, receiver) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut session = identity.watch_session(&token).await;
        let mut gate = SessionGate::new(DashboardObserver {
            live,
            events: events.clone(),
            filter,
            formatter,
            today: today_utc,
        });

        tokio::select! {
            _ = gate.follow(&mut session) => {}
            _ = events.closed() => debug!("dashboard client disconnected"),
        }
        gate.shutdown();
    });

    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmountPolicy;
    use crate::live::hub::ChangeHub;
    use crate::models::auth::SignUpRequest;
    use crate::models::category::NewCategory;
    use crate::models::expense::NewExpense;
    use crate::repositories::memory::MemoryStore;
    use crate::services::auth_service::LocalIdentityProvider;
    use crate::services::category_service::{CategoryService, CategoryServiceImpl};
    use crate::services::expense_service::{ExpenseService, ExpenseServiceImpl};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Fixture {
        identity: Arc<dyn IdentityProvider>,
        categories: Arc<dyn CategoryService>,
        expenses: Arc<dyn ExpenseService>,
        live: LiveQueries,
    }

    fn fixture() -> Fixture {
        fixture_with_session_ttl(chrono::Duration::hours(1))
    }

    fn fixture_with_session_ttl(session_ttl: chrono::Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hub = ChangeHub::default();
        let categories: Arc<dyn CategoryService> =
            Arc::new(CategoryServiceImpl::new(store.clone(), hub.clone()));
        let expenses: Arc<dyn ExpenseService> = Arc::new(ExpenseServiceImpl::new(
            store.clone(),
            hub.clone(),
            AmountPolicy::Permissive,
        ));
        let identity: Arc<dyn IdentityProvider> = Arc::new(
            LocalIdentityProvider::new(store, "test_secret".to_string(), session_ttl)
            .with_hash_cost(4),
        );
        Fixture {
            identity,
            live: LiveQueries::new(categories.clone(), expenses.clone(), hub),
            categories,
            expenses,
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ViewEvent>) -> Option<ViewEvent> {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a view event")
    }

    #[tokio::test]
    async fn test_bad_token_redirects_and_ends_stream() {
        let fx = fixture();
        let mut rx = spawn_dashboard_session(
            fx.identity,
            fx.live,
            "garbage".to_string(),
            None,
            CurrencyFormatter::default(),
        );

        assert_eq!(next(&mut rx).await, Some(ViewEvent::Redirect("/login")));
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_dashboard_updates_on_writes_and_redirects_on_sign_out() {
        let fx = fixture();
        let session = fx
            .identity
            .sign_up(SignUpRequest {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        let user_id = session.identity.user_id;

        let mut rx = spawn_dashboard_session(
            fx.identity.clone(),
            fx.live,
            session.token.clone(),
            None,
            CurrencyFormatter::default(),
        );

        let Some(ViewEvent::Dashboard(view)) = next(&mut rx).await else {
            panic!("expected an initial dashboard");
        };
        assert!(view.categories.is_empty());

        let category_id = fx
            .categories
            .create_category(NewCategory {
                name: "Food".to_string(),
                color: "#111".to_string(),
                user_id,
                category_type: CategoryType::Expense,
            })
            .await
            .unwrap();
        let Some(ViewEvent::Dashboard(view)) = next(&mut rx).await else {
            panic!("expected a dashboard after the category write");
        };
        assert_eq!(view.categories_count, 1);

        fx.expenses
            .create_expense(NewExpense {
                amount: dec!(7.50),
                description: "lunch".to_string(),
                date: today_utc(),
                user_id,
                category_id,
            })
            .await
            .unwrap();
        let Some(ViewEvent::Dashboard(view)) = next(&mut rx).await else {
            panic!("expected a dashboard after the expense write");
        };
        assert_eq!(view.categories[0].monthly_total, dec!(7.50));
        assert_eq!(view.categories[0].transactions.len(), 1);

        fx.identity.sign_out(&session.token).await.unwrap();
        assert_eq!(next(&mut rx).await, Some(ViewEvent::Redirect("/login")));
    }

    #[tokio::test]
    async fn test_expired_session_redirects_once_pruned() {
        let fx = fixture_with_session_ttl(chrono::Duration::seconds(1));
        let sign_up = |email: &str| SignUpRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        };
        let session = fx.identity.sign_up(sign_up("ada@example.com")).await.unwrap();

        let mut rx = spawn_dashboard_session(
            fx.identity.clone(),
            fx.live,
            session.token.clone(),
            None,
            CurrencyFormatter::default(),
        );
        assert!(matches!(next(&mut rx).await, Some(ViewEvent::Dashboard(_))));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        fx.identity.sign_up(sign_up("grace@example.com")).await.unwrap();

        assert_eq!(next(&mut rx).await, Some(ViewEvent::Redirect("/login")));
        assert_eq!(next(&mut rx).await, None);
    }
}
