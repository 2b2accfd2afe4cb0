//! Alert Store: append-only alerts and status-updatable reports, with
//! snapshot and per-record change subscriptions.
//!
//! - [`AlertStore`]: the backend-neutral interface.
//! - [`MemoryStore`]: in-process backend.
//! - [`PgStore`]: PostgreSQL backend; changes fan out via `LISTEN/NOTIFY`.
//! - [`writer`]: typed writers enforcing record invariants before append.

pub mod error;
pub mod keys;
pub mod memory;
pub mod postgres;
pub mod snapshot;
pub mod store;
pub mod subscription;
pub mod writer;

pub use error::StoreError;
pub use keys::KeyGenerator;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use snapshot::{AppendedRecord, Snapshot};
pub use store::{AlertStore, AppendCallback, SnapshotCallback};
pub use subscription::Subscription;
