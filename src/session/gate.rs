//! Session/identity gate: owns the live feeds of one client and re-scopes
//! them whenever the session changes.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::live::feed::FeedHandle;
use crate::models::auth::SessionState;
use crate::models::user::Identity;

/// What the gate asks of its owner on a session transition
pub trait SessionObserver: Send {
    /// Open the feeds for `identity`. The gate owns the returned handles.
    fn open_feeds(&mut self, identity: &Identity) -> Vec<FeedHandle>;

    /// The session ended or never existed
    fn redirect_to_login(&mut self);
}

pub struct SessionGate<O> {
    observer: O,
    state: SessionState,
    feeds: Vec<FeedHandle>,
}

impl<O: SessionObserver> SessionGate<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            state: SessionState::Unknown,
            feeds: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn open_feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Moves the gate to `next`. A repeat of the current state is a no-op.
    /// Feeds of the previous state are closed before any new feed opens.
    pub fn apply(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }

        self.close_feeds();
        match &next {
            SessionState::Authenticated(identity) => {
                info!(user_id = %identity.user_id, "session authenticated, opening feeds");
                self.feeds = self.observer.open_feeds(identity);
            }
            SessionState::Anonymous => {
                info!("session anonymous, redirecting to login");
                self.observer.redirect_to_login();
            }
            SessionState::Unknown => {}
        }
        self.state = next;
    }

    /// Follows session notifications until the sender goes away
    pub async fn follow(&mut self, session: &mut watch::Receiver<SessionState>) {
        loop {
            let next = session.borrow_and_update().clone();
            self.apply(next);
            if session.changed().await.is_err() {
                break;
            }
        }
    }

    /// Closes every owned feed; the gate keeps its current state
    pub fn shutdown(&mut self) {
        self.close_feeds();
    }

    fn close_feeds(&mut self) {
        if !self.feeds.is_empty() {
            debug!(count = self.feeds.len(), "closing feeds");
        }
        for feed in self.feeds.drain(..) {
            feed.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmountPolicy;
    use crate::live::feed::{FeedMonitor, LiveQueries};
    use crate::live::hub::{ChangeHub, Collection};
    use crate::repositories::memory::MemoryStore;
    use crate::services::category_service::{CategoryService, CategoryServiceImpl};
    use crate::services::expense_service::{ExpenseService, ExpenseServiceImpl};
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Debug, PartialEq)]
    enum Call {
        Open(Uuid),
        Redirect,
    }

    struct RecordingObserver {
        live: LiveQueries,
        calls: Vec<Call>,
        monitors: Vec<FeedMonitor>,
        stale_feed_open_at_open: bool,
    }

    impl SessionObserver for RecordingObserver {
        fn open_feeds(&mut self, identity: &Identity) -> Vec<FeedHandle> {
            if self.monitors.iter().any(FeedMonitor::is_open) {
                self.stale_feed_open_at_open = true;
            }
            self.calls.push(Call::Open(identity.user_id));
            let feeds: Vec<FeedHandle> = [Collection::Categories, Collection::Expenses]
                .into_iter()
                .map(|collection| {
                    self.live
                        .open(collection, identity.user_id, |_| {}, |_| {})
                })
                .collect();
            self.monitors.extend(feeds.iter().map(FeedHandle::monitor));
            feeds
        }

        fn redirect_to_login(&mut self) {
            self.calls.push(Call::Redirect);
        }
    }

    fn gate() -> SessionGate<RecordingObserver> {
        let store = Arc::new(MemoryStore::new());
        let hub = ChangeHub::default();
        let categories: Arc<dyn CategoryService> =
            Arc::new(CategoryServiceImpl::new(store.clone(), hub.clone()));
        let expenses: Arc<dyn ExpenseService> = Arc::new(ExpenseServiceImpl::new(
            store,
            hub.clone(),
            AmountPolicy::Permissive,
        ));
        SessionGate::new(RecordingObserver {
            live: LiveQueries::new(categories, expenses, hub),
            calls: Vec::new(),
            monitors: Vec::new(),
            stale_feed_open_at_open: false,
        })
    }

    fn identity(user_id: Uuid) -> Identity {
        Identity {
            user_id,
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_state_opens_nothing() {
        let mut gate = gate();
        gate.apply(SessionState::Unknown);

        assert_eq!(gate.state(), &SessionState::Unknown);
        assert_eq!(gate.open_feed_count(), 0);
        assert!(gate.observer().calls.is_empty());
    }

    #[tokio::test]
    async fn test_authenticated_opens_feeds_scoped_to_identity() {
        let mut gate = gate();
        let user_id = Uuid::new_v4();

        gate.apply(SessionState::Authenticated(identity(user_id)));

        assert_eq!(gate.open_feed_count(), 2);
        assert_eq!(gate.observer().calls, vec![Call::Open(user_id)]);
    }

    #[tokio::test]
    async fn test_repeated_state_is_ignored() {
        let mut gate = gate();
        let user_id = Uuid::new_v4();

        gate.apply(SessionState::Authenticated(identity(user_id)));
        gate.apply(SessionState::Authenticated(identity(user_id)));
        gate.apply(SessionState::Anonymous);
        gate.apply(SessionState::Anonymous);

        assert_eq!(
            gate.observer().calls,
            vec![Call::Open(user_id), Call::Redirect]
        );
    }

    #[tokio::test]
    async fn test_identity_switch_closes_old_feeds_before_opening_new_ones() {
        let mut gate = gate();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        gate.apply(SessionState::Authenticated(identity(first)));
        let first_monitors: Vec<FeedMonitor> = gate.observer().monitors.clone();
        gate.apply(SessionState::Authenticated(identity(second)));

        assert!(!gate.observer().stale_feed_open_at_open);
        assert!(first_monitors.iter().all(|monitor| !monitor.is_open()));
        assert_eq!(gate.open_feed_count(), 2);
        assert_eq!(
            gate.observer().calls,
            vec![Call::Open(first), Call::Open(second)]
        );
    }

    #[tokio::test]
    async fn test_sign_out_closes_feeds_and_redirects() {
        let mut gate = gate();
        gate.apply(SessionState::Authenticated(identity(Uuid::new_v4())));
        let monitors = gate.observer().monitors.clone();

        gate.apply(SessionState::Anonymous);

        assert_eq!(gate.open_feed_count(), 0);
        assert!(monitors.iter().all(|monitor| !monitor.is_open()));
        assert_eq!(gate.observer().calls.last(), Some(&Call::Redirect));
    }

    #[tokio::test]
    async fn test_shutdown_closes_feeds_and_keeps_state() {
        let mut gate = gate();
        let id = identity(Uuid::new_v4());
        gate.apply(SessionState::Authenticated(id.clone()));
        let monitors = gate.observer().monitors.clone();

        gate.shutdown();

        assert_eq!(gate.open_feed_count(), 0);
        assert!(monitors.iter().all(|monitor| !monitor.is_open()));
        assert_eq!(gate.state(), &SessionState::Authenticated(id));
    }

    #[tokio::test]
    async fn test_follow_tracks_watch_channel_until_sender_dropped() {
        let mut gate = gate();
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = watch::channel(SessionState::Authenticated(identity(user_id)));

        let driver = tokio::spawn(async move {
            gate.follow(&mut rx).await;
            gate
        });
        tx.send_replace(SessionState::Anonymous);
        drop(tx);

        let gate = driver.await.unwrap();
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(gate.open_feed_count(), 0);
        assert_eq!(gate.observer().calls.last(), Some(&Call::Redirect));
    }
}
