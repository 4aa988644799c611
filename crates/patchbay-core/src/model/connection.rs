// ── Connection domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered `(from, to)` pair identifying a connection.
///
/// Directional: `(a, b)` and `(b, a)` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub from: String,
    pub to: String,
}

impl ConnectionKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A tracked connection with the time it was created or first observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

impl Connection {
    /// A connection stamped with the current time.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&*self.from, &*self.to)
    }
}

impl From<ConnectionKey> for Connection {
    fn from(key: ConnectionKey) -> Self {
        Self::new(key.from, key.to)
    }
}
