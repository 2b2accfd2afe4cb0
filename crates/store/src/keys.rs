//! Store-assigned record keys.
//!
//! Keys have the form `{millis:013}-{seq:06}-{node}`: wall-clock
//! milliseconds, a per-millisecond sequence and a random 8-hex-digit node
//! id fixed for the generator's lifetime. Numeric parts are zero-padded so
//! one generator's keys sort lexicographically in creation order. The node
//! keeps generators in different processes from colliding when they share
//! a table. The generator never moves backwards, even if the system clock
//! does.

use std::sync::Mutex;

const MAX_SEQ: u32 = 999_999;

/// Monotonic, wall-clock derived key source.
#[derive(Debug)]
pub struct KeyGenerator {
    node: String,
    last: Mutex<(i64, u32)>,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::with_node(random_node())
    }
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with a fixed node id.
    pub fn with_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            last: Mutex::new((0, 0)),
        }
    }

    /// Start after `key`, typically the largest key already persisted.
    /// Unparseable keys are ignored.
    pub fn resume_after(key: &str) -> Self {
        let keys = Self::new();
        if let Some(last) = parse_key(key) {
            *keys.last.lock().unwrap_or_else(|e| e.into_inner()) = last;
        }
        keys
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn next_key(&self) -> String {
        self.next_key_at(chrono::Utc::now().timestamp_millis())
    }

    /// Produce the next key given the current time in milliseconds.
    pub fn next_key_at(&self, now_millis: i64) -> String {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let (last_millis, last_seq) = *last;

        let next = if now_millis > last_millis {
            (now_millis, 0)
        } else if last_seq < MAX_SEQ {
            (last_millis, last_seq + 1)
        } else {
            (last_millis + 1, 0)
        };
        *last = next;
        format!("{:013}-{:06}-{}", next.0, next.1, self.node)
    }
}

fn random_node() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Millisecond and sequence parts. A missing node is accepted.
fn parse_key(key: &str) -> Option<(i64, u32)> {
    let mut parts = key.splitn(3, '-');
    let millis = parts.next()?.parse().ok()?;
    let seq = parts.next()?.parse().ok()?;
    Some((millis, seq))
}
