/// Default number of entries kept in the live alert feed.
pub const DEFAULT_ALERT_FEED_CAPACITY: usize = 50;

/// Dashboard sync settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cap on the live alert feed (default: `50`).
    pub alert_feed_capacity: usize,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `ALERT_FEED_CAPACITY` | `50`    |
    pub fn from_env() -> Self {
        let alert_feed_capacity: usize = std::env::var("ALERT_FEED_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_ALERT_FEED_CAPACITY.to_string())
            .parse()
            .expect("ALERT_FEED_CAPACITY must be a valid usize");

        Self {
            alert_feed_capacity,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            alert_feed_capacity: DEFAULT_ALERT_FEED_CAPACITY,
        }
    }
}
