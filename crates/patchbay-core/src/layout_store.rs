// ── Layout persistence ──
//
// Snapshots the tracked graph to a JSON file and replays it through the
// reconciler on startup. Writes go to a temp file and are renamed into
// place; the previous generation is kept as `<file>.backup`. A file that
// fails to parse is moved to `<file>.corrupt` and never overwritten.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control_plane::ControlPlane;
use crate::error::CoreError;
use crate::events::{ChangeAction, ConnectionChange, EventBus};
use crate::model::LayoutSnapshot;
use crate::reconciler::{BulkResult, Reconciler};
use crate::tables::{AliasTable, PresetTable};

const BACKUP_SUFFIX: &str = ".backup";
const CORRUPT_SUFFIX: &str = ".corrupt";
const TEMP_SUFFIX: &str = ".tmp";

/// Outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
    /// When the restored snapshot was taken.
    pub snapshot_timestamp: chrono::DateTime<Utc>,
    pub result: BulkResult,
}

struct AutosaveTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutosaveTask {
    /// Cancel and wait. A save already running completes first.
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "autosave task ended abnormally");
        }
    }
}

/// Cheaply cloneable handle to the layout store.
#[derive(Clone)]
pub struct LayoutStore {
    inner: Arc<LayoutStoreInner>,
}

struct LayoutStoreInner {
    path: PathBuf,
    control: ControlPlane,
    reconciler: Reconciler,
    aliases: AliasTable,
    presets: PresetTable,
    events: EventBus,
    starting_up: AtomicBool,
    /// A startup restore could not reach the daemon. Until it succeeds the
    /// tracked graph does not reflect the saved layout and must not be
    /// written over it.
    restore_pending: AtomicBool,
    /// Serializes file writes.
    write_lock: Mutex<()>,
    autosave: Mutex<Option<AutosaveTask>>,
}

impl LayoutStore {
    pub fn new(
        path: impl Into<PathBuf>,
        reconciler: Reconciler,
        aliases: AliasTable,
        presets: PresetTable,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(LayoutStoreInner {
                path: path.into(),
                control: reconciler.control_plane().clone(),
                reconciler,
                aliases,
                presets,
                events,
                starting_up: AtomicBool::new(false),
                restore_pending: AtomicBool::new(false),
                write_lock: Mutex::new(()),
                autosave: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.inner.path, BACKUP_SUFFIX)
    }

    pub fn corrupt_path(&self) -> PathBuf {
        with_suffix(&self.inner.path, CORRUPT_SUFFIX)
    }

    pub fn is_starting_up(&self) -> bool {
        self.inner.starting_up.load(Ordering::SeqCst)
    }

    /// Whether a failed startup restore is still waiting to be retried.
    pub fn is_restore_pending(&self) -> bool {
        self.inner.restore_pending.load(Ordering::SeqCst)
    }

    // ── Save / load ──────────────────────────────────────────────────

    /// Persist the tracked graph. Returns `false` without writing when the
    /// daemon is unhealthy or a startup restore is in progress.
    ///
    /// If the startup restore failed, the first save against a healthy
    /// daemon retries it instead of writing.
    pub async fn save(&self) -> Result<bool, CoreError> {
        if self.is_starting_up() {
            debug!("layout save skipped during startup restore");
            return Ok(false);
        }
        if !self.inner.control.check_health().await {
            debug!("layout save skipped, routing daemon unhealthy");
            return Ok(false);
        }
        if self.inner.restore_pending.swap(false, Ordering::SeqCst) {
            self.retry_pending_restore().await;
            return Ok(false);
        }

        let _write = self.inner.write_lock.lock().await;
        let snapshot = self
            .inner
            .reconciler
            .with_graph(|graph| LayoutSnapshot {
                timestamp: Utc::now(),
                connections: graph.keys().cloned().collect(),
                tracked_connections: graph.connections(),
                device_config: (*self.inner.aliases.snapshot()).clone(),
                presets: (*self.inner.presets.snapshot()).clone(),
            })
            .await;

        self.write_atomic(&snapshot).await?;
        debug!(
            path = %self.inner.path.display(),
            connections = snapshot.connections.len(),
            "layout saved"
        );
        Ok(true)
    }

    async fn write_atomic(&self, snapshot: &LayoutSnapshot) -> Result<(), CoreError> {
        let path = &self.inner.path;
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }

        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let backup = self.backup_path();
            tokio::fs::copy(path, &backup)
                .await
                .map_err(|e| CoreError::io(&backup, e))?;
        }

        let tmp = with_suffix(path, TEMP_SUFFIX);
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| CoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        Ok(())
    }

    /// Read the saved layout. No effect on the reconciler.
    pub async fn load(&self) -> Result<LayoutSnapshot, CoreError> {
        let path = &self.inner.path;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::NoSavedState { path: path.clone() });
            }
            Err(e) => return Err(CoreError::io(path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| CoreError::StateCorrupt {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    // ── Restore ──────────────────────────────────────────────────────

    /// Replace the daemon's connections with the saved layout.
    ///
    /// Fails only when the daemon is unreachable or there is no usable
    /// layout; individual connection failures are counted. A corrupt
    /// layout is moved aside first.
    pub async fn restore(&self) -> Result<RestoreReport, CoreError> {
        if !self.inner.control.check_health().await {
            return Err(CoreError::ControlPlaneUnavailable {
                reason: "routing daemon is not healthy, cannot restore".into(),
            });
        }

        let snapshot = match self.load().await {
            Ok(snapshot) => snapshot,
            Err(e @ CoreError::StateCorrupt { .. }) => {
                self.quarantine().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let pairs = snapshot.restore_pairs();
        let replaced = self.inner.reconciler.replace_all(&pairs).await?;
        self.inner.restore_pending.store(false, Ordering::SeqCst);
        let result = replaced.result;

        info!(
            restored = result.successful,
            failed = result.failed,
            snapshot = %snapshot.timestamp,
            "layout restored"
        );
        self.inner.events.connection_changed(ConnectionChange::detail(
            ChangeAction::Restored,
            format!("{} restored, {} failed", result.successful, result.failed),
        ));

        Ok(RestoreReport {
            restored: result.successful,
            failed: result.failed,
            snapshot_timestamp: snapshot.timestamp,
            result,
        })
    }

    /// Second attempt at the startup restore. Stays pending while the
    /// daemon is unreachable; any other outcome settles it.
    async fn retry_pending_restore(&self) {
        match self.restore().await {
            Ok(report) => info!(
                restored = report.restored,
                failed = report.failed,
                "deferred startup restore completed"
            ),
            Err(CoreError::NoSavedState { .. }) => {
                debug!("saved layout disappeared before the deferred restore");
            }
            Err(e @ CoreError::StateCorrupt { .. }) => {
                warn!(error = %e, "saved layout unusable");
            }
            Err(e) => {
                warn!(error = %e, "deferred startup restore failed, will retry");
                self.inner.restore_pending.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Move an unparseable layout to `<file>.corrupt`.
    async fn quarantine(&self) {
        let corrupt = self.corrupt_path();
        match tokio::fs::rename(&self.inner.path, &corrupt).await {
            Ok(()) => warn!(
                path = %corrupt.display(),
                "corrupt layout moved aside, starting from an empty layout"
            ),
            Err(e) => warn!(error = %e, "could not move corrupt layout aside"),
        }
    }

    /// Restore once at startup with saves suppressed. A missing or corrupt
    /// layout is logged and yields `Ok(None)`. Any other failure leaves the
    /// restore pending for the next save.
    pub async fn restore_on_startup(&self) -> Result<Option<RestoreReport>, CoreError> {
        self.inner.starting_up.store(true, Ordering::SeqCst);
        self.inner.restore_pending.store(false, Ordering::SeqCst);
        let result = self.restore().await;
        self.inner.starting_up.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => Ok(Some(report)),
            Err(CoreError::NoSavedState { path }) => {
                info!(path = %path.display(), "no saved layout to restore");
                Ok(None)
            }
            Err(e @ CoreError::StateCorrupt { .. }) => {
                warn!(error = %e, "saved layout unusable");
                Ok(None)
            }
            Err(e) => {
                self.inner.restore_pending.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    // ── Autosave ─────────────────────────────────────────────────────

    /// Start saving every `interval`, replacing any running autosave. A
    /// zero interval only stops the current one.
    pub async fn start_autosave(&self, interval: Duration) {
        let mut slot = self.inner.autosave.lock().await;
        if let Some(task) = slot.take() {
            task.stop().await;
        }
        if interval.is_zero() {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(autosave_task(self.clone(), interval, cancel.clone()));
        *slot = Some(AutosaveTask { cancel, handle });
        debug!(interval = ?interval, "autosave started");
    }

    /// Stop autosave, waiting for an in-flight save to finish.
    pub async fn stop_autosave(&self) {
        let task = self.inner.autosave.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
            debug!("autosave stopped");
        }
    }

    pub async fn is_autosaving(&self) -> bool {
        self.inner.autosave.lock().await.is_some()
    }

    /// Stop autosave and write a final snapshot. Nothing is written while
    /// the startup restore is still pending.
    pub async fn shutdown(&self) -> Result<bool, CoreError> {
        self.stop_autosave().await;
        if self.is_restore_pending() {
            warn!("startup restore never completed, saved layout left untouched");
            return Ok(false);
        }
        let saved = self.save().await?;
        if saved {
            info!(path = %self.inner.path.display(), "layout saved on shutdown");
        } else {
            warn!("layout not saved on shutdown");
        }
        Ok(saved)
    }
}

/// Periodic save loop. Cancellation is only observed between ticks.
async fn autosave_task(store: LayoutStore, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = store.save().await {
                    warn!(error = %e, "autosave failed");
                }
            }
        }
    }
}

/// `layout.json` + `.backup` -> `layout.json.backup`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
