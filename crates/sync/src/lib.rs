//! Subscription Sync: keeps a dashboard's local view of the store current.
//!
//! - [`DashboardCache`]: local mapping replaced wholesale by each snapshot,
//!   with the diff against the previous mapping.
//! - [`AlertFeed`]: bounded, arrival-ordered list of freshly appended alerts.
//! - [`DashboardSession`]: one dashboard's subscriptions and derived state.

pub mod cache;
pub mod config;
pub mod feed;
pub mod session;

pub use cache::{CacheDiff, DashboardCache};
pub use config::SyncConfig;
pub use feed::{AlertFeed, FeedEntry};
pub use session::{DashboardSession, DashboardUpdate, Keyed};
