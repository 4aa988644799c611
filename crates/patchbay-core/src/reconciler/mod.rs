// ── Reconciler ──
//
// Idempotent routing operations over a locally tracked graph, reconciled
// against the daemon's reported connections. Every mutating operation
// holds the graph mutex for its whole duration, including the settle
// delay of a clear-and-rebuild; readers use the `watch` snapshot instead.

mod graph;
mod results;

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::config::{DisconnectStrategy, ReconcilerConfig};
use crate::control_plane::ControlPlane;
use crate::error::CoreError;
use crate::events::{ChangeAction, ConnectionChange, EventBus};
use crate::model::{Connection, ConnectionKey, Port};

pub use graph::{SyncDelta, TrackedGraph};
pub use results::{
    BulkItem, BulkResult, ConnectResult, DisconnectOutcome, FailedConnection, ItemOutcome,
    ReplaceResult,
};

/// Cheaply cloneable handle to the reconciler.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    control: ControlPlane,
    config: ReconcilerConfig,
    graph: Mutex<TrackedGraph>,
    snapshot: watch::Sender<Arc<Vec<Connection>>>,
    events: EventBus,
}

impl Reconciler {
    pub fn new(control: ControlPlane, config: ReconcilerConfig, events: EventBus) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(ReconcilerInner {
                control,
                config,
                graph: Mutex::new(TrackedGraph::default()),
                snapshot,
                events,
            }),
        }
    }

    pub fn control_plane(&self) -> &ControlPlane {
        &self.inner.control
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The tracked graph as last published. Never blocks on a running
    /// mutation.
    pub fn tracked(&self) -> Arc<Vec<Connection>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to tracked-graph snapshots.
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<Connection>>> {
        self.inner.snapshot.subscribe()
    }

    /// Ports the daemon reports.
    pub async fn ports(&self) -> Result<Vec<Port>, CoreError> {
        self.inner.control.list_ports().await
    }

    /// Resynchronize with the daemon and return the result. When the daemon
    /// is unavailable the tracked graph is returned as-is.
    pub async fn current_connections(&self) -> Result<Vec<Connection>, CoreError> {
        let mut graph = self.inner.graph.lock().await;
        match self.resync_locked(&mut graph).await {
            Ok(_) => {}
            Err(e) if e.is_unavailable() => {
                debug!(error = %e, "returning stale tracked graph");
            }
            Err(e) => return Err(e),
        }
        self.publish(&graph);
        Ok(graph.connections())
    }

    /// Run `f` against the graph while holding the operation lock.
    pub(crate) async fn with_graph<R>(&self, f: impl FnOnce(&TrackedGraph) -> R) -> R {
        let graph = self.inner.graph.lock().await;
        f(&graph)
    }

    // ── Single-pair operations ───────────────────────────────────────

    /// Connect `from -> to`. Port names are validated before any remote
    /// call; a second call for the same pair reports `already_connected`.
    pub async fn connect(&self, from: &str, to: &str) -> Result<ConnectResult, CoreError> {
        let mut graph = self.inner.graph.lock().await;
        let result = self.connect_locked(&mut graph, from, to).await;
        self.finish(&mut graph).await;
        result
    }

    /// Disconnect `from -> to` using the configured strategies in order.
    pub async fn disconnect(&self, from: &str, to: &str) -> Result<DisconnectOutcome, CoreError> {
        let mut graph = self.inner.graph.lock().await;
        let result = self.disconnect_locked(&mut graph, from, to).await;
        self.finish(&mut graph).await;
        result
    }

    /// Remove every connection on the daemon. The tracked graph is emptied
    /// whenever the remote call succeeds, whatever the count.
    pub async fn clear_all(&self) -> Result<u32, CoreError> {
        let mut graph = self.inner.graph.lock().await;
        let result = self.clear_locked(&mut graph).await;
        self.finish(&mut graph).await;
        result
    }

    // ── Bulk operations ──────────────────────────────────────────────

    /// Connect each pair independently, continuing past failures.
    pub async fn bulk_connect(&self, pairs: &[ConnectionKey]) -> BulkResult {
        let mut graph = self.inner.graph.lock().await;
        let result = self.bulk_connect_locked(&mut graph, pairs).await;
        self.finish(&mut graph).await;
        result
    }

    /// Disconnect each pair independently, continuing past failures.
    pub async fn bulk_disconnect(&self, pairs: &[ConnectionKey]) -> BulkResult {
        let mut graph = self.inner.graph.lock().await;
        let mut result = BulkResult::default();
        for key in pairs {
            let outcome = match self.disconnect_locked(&mut graph, &key.from, &key.to).await {
                Ok(outcome) => ItemOutcome::Disconnected(outcome),
                Err(e) => {
                    warn!(connection = %key, error = %e, "bulk disconnect item failed");
                    ItemOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            result.push(key, outcome);
        }
        self.finish(&mut graph).await;
        result
    }

    /// Clear the daemon, wait the settle delay, then connect `pairs`, all
    /// under one lock acquisition.
    pub async fn replace_all(&self, pairs: &[ConnectionKey]) -> Result<ReplaceResult, CoreError> {
        let mut graph = self.inner.graph.lock().await;
        let cleared = match self.clear_locked(&mut graph).await {
            Ok(cleared) => cleared,
            Err(e) => {
                self.publish(&graph);
                return Err(e);
            }
        };
        tokio::time::sleep(self.inner.config.settle_delay).await;
        let result = self.bulk_connect_locked(&mut graph, pairs).await;
        self.finish(&mut graph).await;
        info!(
            cleared,
            successful = result.successful,
            failed = result.failed,
            "connection list replaced"
        );
        Ok(ReplaceResult { cleared, result })
    }

    // ── Locked implementations ───────────────────────────────────────

    async fn connect_locked(
        &self,
        graph: &mut TrackedGraph,
        from: &str,
        to: &str,
    ) -> Result<ConnectResult, CoreError> {
        validate_pair(from, to)?;

        let outcome = self.inner.control.connect(from, to).await?;
        let newly_tracked = graph.insert(Connection::new(from, to));
        let already_connected = outcome.already_connected || !newly_tracked;

        if !already_connected {
            self.inner.events.connection_changed(ConnectionChange::pair(
                ChangeAction::Connected,
                ConnectionKey::new(from, to),
            ));
        }
        Ok(ConnectResult { already_connected })
    }

    async fn disconnect_locked(
        &self,
        graph: &mut TrackedGraph,
        from: &str,
        to: &str,
    ) -> Result<DisconnectOutcome, CoreError> {
        validate_pair(from, to)?;
        let key = ConnectionKey::new(from, to);

        for strategy in &self.inner.config.disconnect_strategies {
            let outcome = match strategy {
                DisconnectStrategy::Native => {
                    match self.inner.control.disconnect(from, to).await {
                        Ok(()) => DisconnectOutcome::native(graph.remove(&key).is_some()),
                        Err(e) if e.is_unsupported() => {
                            debug!(connection = %key, "native disconnect unsupported, trying next strategy");
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
                DisconnectStrategy::ClearAndRebuild => {
                    self.clear_and_rebuild(graph, &key).await?
                }
            };

            if outcome.was_connected {
                self.inner
                    .events
                    .connection_changed(ConnectionChange::pair(ChangeAction::Disconnected, key));
            }
            return Ok(outcome);
        }

        Err(CoreError::UnsupportedOperation {
            operation: "disconnect".into(),
        })
    }

    /// Disconnect one pair on a daemon without native disconnect:
    /// synchronize, clear everything, wait, reconnect all but the target.
    /// Reconnect failures are reported, not rolled back.
    async fn clear_and_rebuild(
        &self,
        graph: &mut TrackedGraph,
        target: &ConnectionKey,
    ) -> Result<DisconnectOutcome, CoreError> {
        self.resync_locked(graph).await?;

        if !graph.contains(target) {
            debug!(connection = %target, "target not connected, nothing to rebuild");
            return Ok(DisconnectOutcome {
                method: DisconnectStrategy::ClearAndRebuild,
                was_connected: false,
                rebuilt_connections: 0,
                failed_rebuilds: Vec::new(),
            });
        }

        let survivors: Vec<Connection> = graph
            .connections()
            .into_iter()
            .filter(|c| c.key() != *target)
            .collect();

        let cleared = self.inner.control.clear_all().await?;
        graph.clear();
        debug!(cleared, survivors = survivors.len(), "cleared for rebuild");

        tokio::time::sleep(self.inner.config.settle_delay).await;

        let mut rebuilt = 0;
        let mut failed_rebuilds = Vec::new();
        for connection in survivors {
            let reconnected = self
                .inner
                .control
                .connect(&connection.from, &connection.to)
                .await;
            match reconnected {
                Ok(_) => {
                    graph.insert(connection);
                    rebuilt += 1;
                }
                Err(e) => {
                    warn!(connection = %connection.key(), error = %e, "rebuild failed");
                    failed_rebuilds.push(FailedConnection::new(&connection.key(), &e));
                }
            }
        }

        info!(
            connection = %target,
            rebuilt,
            failed = failed_rebuilds.len(),
            "disconnected by clear-and-rebuild"
        );
        Ok(DisconnectOutcome {
            method: DisconnectStrategy::ClearAndRebuild,
            was_connected: true,
            rebuilt_connections: rebuilt,
            failed_rebuilds,
        })
    }

    async fn clear_locked(&self, graph: &mut TrackedGraph) -> Result<u32, CoreError> {
        let cleared = self.inner.control.clear_all().await?;
        graph.clear();
        self.inner.events.connection_changed(ConnectionChange::detail(
            ChangeAction::Cleared,
            format!("{cleared} connections cleared"),
        ));
        Ok(cleared)
    }

    async fn bulk_connect_locked(
        &self,
        graph: &mut TrackedGraph,
        pairs: &[ConnectionKey],
    ) -> BulkResult {
        let mut result = BulkResult::default();
        for key in pairs {
            let outcome = match self.connect_locked(graph, &key.from, &key.to).await {
                Ok(r) => ItemOutcome::Connected {
                    already_connected: r.already_connected,
                },
                Err(e) => {
                    warn!(connection = %key, error = %e, "bulk connect item failed");
                    ItemOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            result.push(key, outcome);
        }
        result
    }

    async fn resync_locked(&self, graph: &mut TrackedGraph) -> Result<SyncDelta, CoreError> {
        let observed = self.inner.control.list_connections().await?;
        let delta = graph.sync(observed);
        if !delta.is_empty() {
            debug!(
                added = delta.added.len(),
                removed = delta.removed.len(),
                "tracked graph resynchronized"
            );
        }
        Ok(delta)
    }

    /// Best-effort resync after a mutation, then publish.
    async fn finish(&self, graph: &mut TrackedGraph) {
        if self.inner.config.resync_after_mutation {
            if let Err(e) = self.resync_locked(graph).await {
                debug!(error = %e, "post-mutation resync skipped");
            }
        }
        self.publish(graph);
    }

    fn publish(&self, graph: &TrackedGraph) {
        self.inner.snapshot.send_replace(Arc::new(graph.connections()));
    }
}

fn validate_pair(from: &str, to: &str) -> Result<(), CoreError> {
    Port::validate_name(from)?;
    Port::validate_name(to)?;
    if from == to {
        return Err(CoreError::InvalidPort {
            port: from.to_owned(),
            reason: "cannot connect a port to itself".into(),
        });
    }
    Ok(())
}
