// ── Structured operation results ──
//
// Partial failure is reported here, never raised.

use serde::Serialize;

use crate::config::DisconnectStrategy;
use crate::model::ConnectionKey;

/// Result of a single connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectResult {
    /// Reported by the daemon, or the pair was already tracked.
    pub already_connected: bool,
}

/// A pair that could not be (re)connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedConnection {
    pub from: String,
    pub to: String,
    pub error: String,
}

impl FailedConnection {
    pub(crate) fn new(key: &ConnectionKey, error: impl ToString) -> Self {
        Self {
            from: key.from.clone(),
            to: key.to.clone(),
            error: error.to_string(),
        }
    }
}

/// Result of a single disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectOutcome {
    /// The strategy that removed the connection.
    pub method: DisconnectStrategy,
    /// For `native`, whether the pair was tracked; for `clear-and-rebuild`,
    /// whether it was present after synchronizing. A clear-and-rebuild
    /// that finds the pair absent does nothing.
    pub was_connected: bool,
    /// Connections re-established after a clear.
    pub rebuilt_connections: usize,
    /// Connections lost by a clear that could not be re-established.
    pub failed_rebuilds: Vec<FailedConnection>,
}

impl DisconnectOutcome {
    pub(crate) fn native(was_connected: bool) -> Self {
        Self {
            method: DisconnectStrategy::Native,
            was_connected,
            rebuilt_connections: 0,
            failed_rebuilds: Vec::new(),
        }
    }
}

/// Per-item outcome of a bulk, preset or restore operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Connected { already_connected: bool },
    Disconnected(DisconnectOutcome),
    /// Resolved but not executed (dry run).
    Validated,
    Failed { error: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItem {
    pub from: String,
    pub to: String,
    pub outcome: ItemOutcome,
}

/// Aggregate of independent per-pair operations. No rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<BulkItem>,
}

impl BulkResult {
    pub(crate) fn push(&mut self, key: &ConnectionKey, outcome: ItemOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(BulkItem {
            from: key.from.clone(),
            to: key.to.clone(),
            outcome,
        });
    }
}

/// Result of clearing and re-establishing a full connection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceResult {
    pub cleared: u32,
    pub result: BulkResult,
}
