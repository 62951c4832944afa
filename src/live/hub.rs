use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// The two collections the store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Categories,
    Expenses,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Categories => f.write_str("categories"),
            Collection::Expenses => f.write_str("expenses"),
        }
    }
}

/// Published after every successful write: which scoped result set changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub user_id: Uuid,
}

/// Fan-out of change events from the gateway to every open feed
#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, collection: Collection, user_id: Uuid) {
        // No receivers just means no feed is open.
        let receivers = self
            .sender
            .send(ChangeEvent {
                collection,
                user_id,
            })
            .unwrap_or(0);
        trace!(%collection, %user_id, receivers, "published change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(256)
    }
}
