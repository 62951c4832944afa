//! Live query feeds: push the full current result set of a scoped collection
//! to a callback every time it changes.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::AbortHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::live::hub::{ChangeHub, Collection};
use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::services::category_service::CategoryService;
use crate::services::expense_service::ExpenseService;

/// The complete result set of one scoped query
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Categories(Vec<Category>),
    Expenses(Vec<Expense>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to load {collection}: {message}")]
    Query {
        collection: Collection,
        message: String,
    },

    #[error("Live updates for {0} were interrupted. Please refresh the page")]
    TransportLost(Collection),
}

/// Opens feeds over the gateway, driven by the change hub
#[derive(Clone)]
pub struct LiveQueries {
    source: SnapshotSource,
    hub: ChangeHub,
}

#[derive(Clone)]
struct SnapshotSource {
    categories: Arc<dyn CategoryService>,
    expenses: Arc<dyn ExpenseService>,
}

impl SnapshotSource {
    async fn load(&self, collection: Collection, user_id: Uuid) -> Result<Snapshot, FeedError> {
        let result = match collection {
            Collection::Categories => self
                .categories
                .get_categories(user_id)
                .await
                .map(Snapshot::Categories)
                .map_err(|e| e.to_string()),
            Collection::Expenses => self
                .expenses
                .get_expenses(user_id)
                .await
                .map(Snapshot::Expenses)
                .map_err(|e| e.to_string()),
        };
        result.map_err(|message| FeedError::Query {
            collection,
            message,
        })
    }
}

impl LiveQueries {
    pub fn new(
        categories: Arc<dyn CategoryService>,
        expenses: Arc<dyn ExpenseService>,
        hub: ChangeHub,
    ) -> Self {
        Self {
            source: SnapshotSource {
                categories,
                expenses,
            },
            hub,
        }
    }

    /// Opens a feed for `collection` scoped to `user_id`.
    ///
    /// `on_snapshot` receives the initial result set and then the full result
    /// set after every change; `on_error` receives read failures. Callbacks of
    /// one feed never run concurrently and must not close their own feed.
    pub fn open<S, E>(
        &self,
        collection: Collection,
        user_id: Uuid,
        on_snapshot: S,
        on_error: E,
    ) -> FeedHandle
    where
        S: Fn(Snapshot) + Send + Sync + 'static,
        E: Fn(FeedError) + Send + Sync + 'static,
    {
        let guard = Arc::new(DeliveryGuard::default());
        // Subscribe before the first read so no change slips in between.
        let mut events = self.hub.subscribe();
        let source = self.source.clone();
        let task_guard = guard.clone();

        let task = tokio::spawn(async move {
            let deliver = |result: Result<Snapshot, FeedError>| match result {
                Ok(snapshot) => task_guard.deliver(|| on_snapshot(snapshot)),
                Err(err) => {
                    warn!(%collection, %user_id, error = %err, "feed read failed");
                    task_guard.deliver(|| on_error(err))
                }
            };

            if !deliver(source.load(collection, user_id).await) {
                return;
            }

            loop {
                let reload = match events.recv().await {
                    Ok(event) => event.collection == collection && event.user_id == user_id,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%collection, %user_id, skipped, "feed lagged, reloading");
                        true
                    }
                    Err(RecvError::Closed) => {
                        task_guard.deliver(|| on_error(FeedError::TransportLost(collection)));
                        break;
                    }
                };

                if reload && !deliver(source.load(collection, user_id).await) {
                    break;
                }
            }
        });

        debug!(%collection, %user_id, "feed opened");
        FeedHandle {
            guard,
            task: task.abort_handle(),
            collection,
            user_id,
        }
    }
}

/// Serializes callback delivery with `close`, so nothing is delivered once
/// `close` has returned.
#[derive(Debug)]
struct DeliveryGuard {
    open: Mutex<bool>,
}

impl Default for DeliveryGuard {
    fn default() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }
}

impl DeliveryGuard {
    /// Runs `f` if the feed is still open; returns whether it was.
    fn deliver(&self, f: impl FnOnce()) -> bool {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open {
            f();
        }
        *open
    }

    fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open feed. Closing (or dropping) it stops delivery immediately.
#[derive(Debug)]
pub struct FeedHandle {
    guard: Arc<DeliveryGuard>,
    task: AbortHandle,
    collection: Collection,
    user_id: Uuid,
}

impl FeedHandle {
    pub fn close(self) {
        drop(self);
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// A read-only view of whether this feed is still open
    pub fn monitor(&self) -> FeedMonitor {
        FeedMonitor {
            guard: self.guard.clone(),
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.guard.close();
        self.task.abort();
        debug!(collection = %self.collection, user_id = %self.user_id, "feed closed");
    }
}

#[derive(Debug, Clone)]
pub struct FeedMonitor {
    guard: Arc<DeliveryGuard>,
}

impl FeedMonitor {
    pub fn is_open(&self) -> bool {
        self.guard.is_open()
    }
}
