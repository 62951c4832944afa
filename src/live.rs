pub mod feed;
pub mod hub;

pub use feed::{FeedError, FeedHandle, FeedMonitor, LiveQueries, Snapshot};
pub use hub::{ChangeEvent, ChangeHub, Collection};
