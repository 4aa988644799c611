// ── Runtime engine configuration ──
//
// These types describe how the engine talks to the routing daemon and
// where it keeps its layout. They never touch disk: the config crate (or
// a test) builds an `EngineConfig` and hands it in.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::model::{Capability, Preset};

/// How to reach the routing daemon.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Bridge URL (e.g., `http://localhost:6666`).
    pub url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long a health probe result stays valid.
    pub health_cache_ttl: Duration,
    /// Maximum concurrent remote calls.
    pub max_in_flight: usize,
    /// Pin the native-disconnect capability instead of learning it.
    pub native_disconnect: Capability,
    /// Pin the native-clear capability instead of learning it.
    pub native_clear: Capability,
}

impl ControlPlaneConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(5),
            health_cache_ttl: Duration::from_secs(5),
            max_in_flight: 4,
            native_disconnect: Capability::Unknown,
            native_clear: Capability::Unknown,
        }
    }
}

/// A way of removing a single connection, tried in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DisconnectStrategy {
    /// `POST /disconnect` on the daemon.
    Native,
    /// Clear everything, then reconnect all but the target.
    ClearAndRebuild,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Pause after a clear before reconnecting.
    pub settle_delay: Duration,
    /// Re-read the daemon's connection list after every mutation.
    pub resync_after_mutation: bool,
    pub disconnect_strategies: Vec<DisconnectStrategy>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            resync_after_mutation: true,
            disconnect_strategies: vec![
                DisconnectStrategy::Native,
                DisconnectStrategy::ClearAndRebuild,
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Layout file; `<path>.backup` and `<path>.corrupt` live next to it.
    pub path: PathBuf,
    /// Autosave period. Zero disables autosave.
    pub autosave_interval: Duration,
    pub restore_on_startup: bool,
}

impl LayoutConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            autosave_interval: Duration::from_secs(30),
            restore_on_startup: true,
        }
    }
}

/// Everything needed to construct an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub control_plane: ControlPlaneConfig,
    pub reconciler: ReconcilerConfig,
    pub layout: LayoutConfig,
    /// Capacity of the event broadcast ring.
    pub event_capacity: usize,
    /// Alias name to concrete port name.
    pub aliases: BTreeMap<String, String>,
    pub presets: BTreeMap<String, Preset>,
}

impl EngineConfig {
    pub fn new(url: Url, layout_path: impl Into<PathBuf>) -> Self {
        Self {
            control_plane: ControlPlaneConfig::new(url),
            reconciler: ReconcilerConfig::default(),
            layout: LayoutConfig::new(layout_path),
            event_capacity: 256,
            aliases: BTreeMap::new(),
            presets: BTreeMap::new(),
        }
    }
}
