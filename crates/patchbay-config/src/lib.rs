//! Configuration for the patchbay routing engine.
//!
//! Layered loading (built-in defaults, then `config.toml`, then
//! `PATCHBAY_` environment variables), validation, and translation to
//! `patchbay_core::EngineConfig`. The core crate never reads files; this
//! crate is the only place that does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use patchbay_core::{Capability, DisconnectStrategy, EngineConfig, Preset};

/// Prefix for environment overrides. Nested keys use `__`:
/// `PATCHBAY_CONTROL_PLANE__URL`.
pub const ENV_PREFIX: &str = "PATCHBAY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub control_plane: ControlPlaneSection,
    pub engine: EngineSection,
    pub layout: LayoutSection,
    pub logging: LoggingSection,
    /// Alias name to concrete `client:port` name.
    pub aliases: BTreeMap<String, String>,
    pub presets: BTreeMap<String, Preset>,
}

/// `[control_plane]`: how to reach the JACK bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlPlaneSection {
    pub url: String,
    pub timeout_ms: u64,
    pub health_cache_ttl_ms: u64,
    pub max_in_flight: usize,
    /// Pin native disconnect support instead of probing for it.
    pub native_disconnect: Option<bool>,
    /// Pin native clear support instead of probing for it.
    pub native_clear: Option<bool>,
}

impl Default for ControlPlaneSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:6666".into(),
            timeout_ms: 5_000,
            health_cache_ttl_ms: 5_000,
            max_in_flight: 4,
            native_disconnect: None,
            native_clear: None,
        }
    }
}

/// `[engine]`: reconciler tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSection {
    pub settle_delay_ms: u64,
    pub resync_after_mutation: bool,
    pub disconnect_strategies: Vec<DisconnectStrategy>,
    pub event_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            resync_after_mutation: true,
            disconnect_strategies: vec![
                DisconnectStrategy::Native,
                DisconnectStrategy::ClearAndRebuild,
            ],
            event_capacity: 256,
        }
    }
}

/// `[layout]`: persisted routing layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSection {
    /// Defaults to `layout.json` in the platform data directory.
    pub path: Option<PathBuf>,
    /// Zero disables autosave.
    pub autosave_interval_secs: u64,
    pub restore_on_startup: bool,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            path: None,
            autosave_interval_secs: 30,
            restore_on_startup: true,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Also write logs to this file when running as a daemon.
    pub file: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "patchbay", "patchbay")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(".patchbay").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default layout file location.
pub fn default_layout_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(".patchbay").join("layout.json"),
        |dirs| dirs.data_dir().join("layout.json"),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load config from defaults, the TOML file at `path` (or the platform
/// default), and the environment. A missing file is not an error.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;

    config.validate()?;
    Ok(config)
}

/// Serialize config to TOML and write it to `path`.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

// ── Validation and translation ──────────────────────────────────────

fn capability(pinned: Option<bool>) -> Capability {
    match pinned {
        None => Capability::Unknown,
        Some(true) => Capability::Supported,
        Some(false) => Capability::Unsupported,
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge_url()?;

        if self.control_plane.timeout_ms == 0 {
            return Err(invalid("control_plane.timeout_ms", "must be greater than zero"));
        }
        if self.control_plane.max_in_flight == 0 {
            return Err(invalid("control_plane.max_in_flight", "must be at least 1"));
        }
        if self.engine.disconnect_strategies.is_empty() {
            return Err(invalid(
                "engine.disconnect_strategies",
                "at least one strategy is required",
            ));
        }
        if self.engine.event_capacity == 0 {
            return Err(invalid("engine.event_capacity", "must be at least 1"));
        }

        for (name, port) in &self.aliases {
            if patchbay_core::Port::validate_name(port).is_err() {
                return Err(invalid(
                    &format!("aliases.{name}"),
                    format!("{port:?} is not a client:port name"),
                ));
            }
        }
        for (name, preset) in &self.presets {
            if preset.connections.is_empty() {
                return Err(invalid(&format!("presets.{name}"), "has no connections"));
            }
        }
        Ok(())
    }

    fn bridge_url(&self) -> Result<url::Url, ConfigError> {
        let url: url::Url = self
            .control_plane
            .url
            .parse()
            .map_err(|e| invalid("control_plane.url", format!("{e}: {}", self.control_plane.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "control_plane.url",
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        Ok(url)
    }

    pub fn layout_path(&self) -> PathBuf {
        self.layout.path.clone().unwrap_or_else(default_layout_path)
    }

    /// Build the engine configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;

        let mut config = EngineConfig::new(self.bridge_url()?, self.layout_path());

        let cp = &mut config.control_plane;
        cp.timeout = Duration::from_millis(self.control_plane.timeout_ms);
        cp.health_cache_ttl = Duration::from_millis(self.control_plane.health_cache_ttl_ms);
        cp.max_in_flight = self.control_plane.max_in_flight;
        cp.native_disconnect = capability(self.control_plane.native_disconnect);
        cp.native_clear = capability(self.control_plane.native_clear);

        config.reconciler.settle_delay = Duration::from_millis(self.engine.settle_delay_ms);
        config.reconciler.resync_after_mutation = self.engine.resync_after_mutation;
        config
            .reconciler
            .disconnect_strategies
            .clone_from(&self.engine.disconnect_strategies);

        config.layout.autosave_interval = Duration::from_secs(self.layout.autosave_interval_secs);
        config.layout.restore_on_startup = self.layout.restore_on_startup;

        config.event_capacity = self.engine.event_capacity;
        config.aliases.clone_from(&self.aliases);
        config.presets.clone_from(&self.presets);
        Ok(config)
    }
}
