//! Forwarding of pipeline events to dashboard WebSocket clients.

pub mod router;

pub use router::NotificationRouter;
