// ── Control-plane client ──
//
// Resilient access to the routing daemon on top of `BridgeClient`:
// cached single-flight health probes, bounded concurrency, capability
// tracking for optional operations, and translation of transport
// failures into `ControlPlaneUnavailable`. No retries happen here; the
// caller decides what a failure means.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use patchbay_api::{BridgeClient, TransportConfig};

use crate::config::ControlPlaneConfig;
use crate::error::CoreError;
use crate::events::{EventBus, RoutingEvent};
use crate::model::{BridgeHealth, BridgeStatus, Capabilities, Capability, ConnectionKey, Port};

/// Health as published, plus the monotonic probe time used for the TTL.
#[derive(Debug, Clone)]
struct HealthState {
    health: BridgeHealth,
    checked_at: Option<Instant>,
}

/// Result of a successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// The daemon reported the pair was connected before this call.
    pub already_connected: bool,
}

/// Cheaply cloneable handle to the routing daemon.
#[derive(Clone)]
pub struct ControlPlane {
    inner: Arc<ControlPlaneInner>,
}

struct ControlPlaneInner {
    client: BridgeClient,
    config: ControlPlaneConfig,
    permits: Semaphore,
    /// Held while a live health probe runs so concurrent callers share it.
    probe: Mutex<()>,
    health: watch::Sender<HealthState>,
    capabilities: watch::Sender<Capabilities>,
    events: EventBus,
}

impl ControlPlane {
    /// Build a client from configuration. Does not contact the daemon.
    pub fn new(config: ControlPlaneConfig, events: EventBus) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let client = BridgeClient::new(config.url.clone(), &transport)?;
        Ok(Self::with_client(client, config, events))
    }

    /// Build around an existing `BridgeClient`.
    pub fn with_client(client: BridgeClient, config: ControlPlaneConfig, events: EventBus) -> Self {
        let (health, _) = watch::channel(HealthState {
            health: BridgeHealth {
                running: false,
                last_checked_at: None,
                cache_ttl: config.health_cache_ttl,
            },
            checked_at: None,
        });
        let (capabilities, _) = watch::channel(Capabilities {
            native_disconnect: config.native_disconnect,
            native_clear: config.native_clear,
        });

        Self {
            inner: Arc::new(ControlPlaneInner {
                client,
                permits: Semaphore::new(config.max_in_flight.max(1)),
                config,
                probe: Mutex::new(()),
                health,
                capabilities,
                events,
            }),
        }
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.inner.config
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Whether the daemon is usable, probing `GET /health` only when the
    /// cached answer is older than the TTL.
    ///
    /// A failed probe caches `false` for a full TTL, so an unreachable
    /// daemon is probed at most once per window.
    pub async fn check_health(&self) -> bool {
        if let Some(running) = self.cached_health() {
            return running;
        }

        let _probe = self.inner.probe.lock().await;
        // Another caller may have probed while we waited.
        if let Some(running) = self.cached_health() {
            return running;
        }

        let running = match self.call(self.inner.client.health()).await {
            Ok(resp) => resp.is_running(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        };
        self.record_health(running);
        running
    }

    /// The cached health value, without probing.
    pub fn health(&self) -> BridgeHealth {
        self.inner.health.borrow().health.clone()
    }

    fn cached_health(&self) -> Option<bool> {
        let state = self.inner.health.borrow();
        let checked_at = state.checked_at?;
        (checked_at.elapsed() < self.inner.config.health_cache_ttl).then_some(state.health.running)
    }

    /// Store a health observation, emitting `StatusChanged` when the value
    /// flips (or is observed for the first time).
    fn record_health(&self, running: bool) {
        let mut changed = None;
        self.inner.health.send_modify(|state| {
            let flipped = state.health.last_checked_at.is_none() || state.health.running != running;
            state.health.running = running;
            state.health.last_checked_at = Some(Utc::now());
            state.checked_at = Some(Instant::now());
            if flipped {
                changed = Some(state.health.clone());
            }
        });

        if let Some(health) = changed {
            if health.running {
                info!("routing daemon is up");
            } else {
                warn!("routing daemon is down");
            }
            self.inner.events.publish(RoutingEvent::StatusChanged(health));
        }
    }

    async fn require_health(&self) -> Result<(), CoreError> {
        if self.check_health().await {
            Ok(())
        } else {
            Err(CoreError::ControlPlaneUnavailable {
                reason: format!("routing daemon at {} is not healthy", self.inner.config.url),
            })
        }
    }

    // ── Capabilities ─────────────────────────────────────────────────

    pub fn capabilities(&self) -> Capabilities {
        *self.inner.capabilities.borrow()
    }

    fn learn(&self, update: impl FnOnce(&mut Capabilities)) {
        self.inner.capabilities.send_if_modified(|caps| {
            let before = *caps;
            update(caps);
            if *caps != before {
                debug!(capabilities = ?caps, "capabilities updated");
            }
            *caps != before
        });
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// `GET /status`. Does not require a healthy cache; a reachable daemon
    /// with JACK stopped yields `running == false`.
    pub async fn status(&self) -> Result<BridgeStatus, CoreError> {
        let resp = self.call(self.inner.client.status()).await?;
        self.record_health(resp.running);
        Ok(BridgeStatus {
            running: resp.running,
            sample_rate: resp.sample_rate,
            buffer_size: resp.buffer_size,
            client_name: resp.client_name,
        })
    }

    pub async fn list_ports(&self) -> Result<Vec<Port>, CoreError> {
        self.require_health().await?;
        let ports = self.call(self.inner.client.list_ports()).await?;
        Ok(ports.iter().map(Port::from).collect())
    }

    pub async fn list_connections(&self) -> Result<Vec<ConnectionKey>, CoreError> {
        self.require_health().await?;
        let connections = self.call(self.inner.client.list_connections()).await?;
        Ok(connections.into_iter().map(ConnectionKey::from).collect())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Connect `from -> to`. "Already connected" is a success.
    pub async fn connect(&self, from: &str, to: &str) -> Result<ConnectOutcome, CoreError> {
        self.require_health().await?;
        let resp = self
            .call(self.inner.client.connect(from, to))
            .await
            .map_err(|e| match e {
                CoreError::ControlPlaneUnavailable { .. } => e,
                other => CoreError::ConnectFailed {
                    from: from.to_owned(),
                    to: to.to_owned(),
                    reason: other.to_string(),
                },
            })?;
        debug!(from, to, already_connected = resp.already_connected, "connected");
        Ok(ConnectOutcome {
            already_connected: resp.already_connected,
        })
    }

    /// Native disconnect. Fails fast with `UnsupportedOperation` once the
    /// daemon has said it cannot disconnect.
    pub async fn disconnect(&self, from: &str, to: &str) -> Result<(), CoreError> {
        if self.capabilities().native_disconnect == Capability::Unsupported {
            return Err(unsupported("disconnect"));
        }
        self.require_health().await?;

        match self.call(self.inner.client.disconnect(from, to)).await {
            Ok(()) => {
                self.learn(|c| c.native_disconnect = Capability::Supported);
                debug!(from, to, "disconnected");
                Ok(())
            }
            Err(e) if e.is_unsupported() => {
                self.learn(|c| c.native_disconnect = Capability::Unsupported);
                info!("routing daemon has no native disconnect");
                Err(e)
            }
            Err(e @ CoreError::ControlPlaneUnavailable { .. }) => Err(e),
            Err(other) => Err(CoreError::DisconnectFailed {
                from: from.to_owned(),
                to: to.to_owned(),
                reason: other.to_string(),
            }),
        }
    }

    /// Remove every connection the daemon reports, returning how many were
    /// removed.
    ///
    /// Tries native `POST /clear` first; if that is unsupported, lists the
    /// connections and disconnects each natively. Individual failures in
    /// the per-pair path are logged and skipped.
    pub async fn clear_all(&self) -> Result<u32, CoreError> {
        if self.capabilities().native_clear != Capability::Unsupported {
            self.require_health().await?;
            match self.call(self.inner.client.clear()).await {
                Ok(count) => {
                    self.learn(|c| c.native_clear = Capability::Supported);
                    debug!(count, "cleared natively");
                    return Ok(count);
                }
                Err(e) if e.is_unsupported() => {
                    self.learn(|c| c.native_clear = Capability::Unsupported);
                    info!("routing daemon has no native clear; disconnecting pair by pair");
                }
                Err(e) => return Err(e),
            }
        }

        if self.capabilities().native_disconnect == Capability::Unsupported {
            return Err(unsupported("clear"));
        }

        let connections = self.list_connections().await?;
        let mut cleared = 0u32;
        for key in &connections {
            match self.disconnect(&key.from, &key.to).await {
                Ok(()) => cleared += 1,
                Err(e) if e.is_unsupported() && cleared == 0 => return Err(unsupported("clear")),
                Err(e) if e.is_unsupported() => break,
                Err(e) => warn!(connection = %key, error = %e, "disconnect during clear failed"),
            }
        }
        debug!(cleared, total = connections.len(), "cleared pair by pair");
        Ok(cleared)
    }

    // ── Call wrapper ─────────────────────────────────────────────────

    /// Run one remote call under the in-flight limit. Unreachability marks
    /// the cached health false immediately.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, patchbay_api::Error>>,
    ) -> Result<T, CoreError> {
        let _permit =
            self.inner
                .permits
                .acquire()
                .await
                .map_err(|_| CoreError::ControlPlaneUnavailable {
                    reason: "control plane is shut down".into(),
                })?;

        match fut.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unreachable() => {
                debug!(error = %e, "routing daemon unreachable");
                self.record_health(false);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn unsupported(operation: &str) -> CoreError {
    CoreError::UnsupportedOperation {
        operation: operation.to_owned(),
    }
}
