// ── Bridge health, status and capability types ──

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Cached view of whether the routing daemon is usable.
///
/// Derived from probes and call outcomes; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeHealth {
    pub running: bool,
    /// `None` until the first probe or call outcome.
    pub last_checked_at: Option<DateTime<Utc>>,
    pub cache_ttl: Duration,
}

/// Live daemon status from `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    pub running: bool,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub client_name: Option<String>,
}

/// Whether the daemon implements an optional operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Capability {
    /// Not yet observed; the operation will be attempted.
    #[default]
    Unknown,
    Supported,
    /// The daemon said no; callers fail fast from now on.
    Unsupported,
}

/// Optional operations of the routing daemon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub native_disconnect: Capability,
    pub native_clear: Capability,
}
