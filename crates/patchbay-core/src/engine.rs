// ── Engine ──
//
// The constructed service context. Owns one instance of each service,
// wired to one event bus and one set of lookup tables, and hands out
// cheap clones. There is no global state.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::control_plane::ControlPlane;
use crate::error::CoreError;
use crate::events::{EventBus, Subscription};
use crate::layout_store::{LayoutStore, RestoreReport};
use crate::model::Preset;
use crate::preset::PresetApplier;
use crate::reconciler::Reconciler;
use crate::tables::{AliasTable, PresetTable};

pub struct Engine {
    config: EngineConfig,
    events: EventBus,
    aliases: AliasTable,
    presets: PresetTable,
    control: ControlPlane,
    reconciler: Reconciler,
    layout: LayoutStore,
    applier: PresetApplier,
}

impl Engine {
    /// Build every service from `config`. Does not contact the daemon.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let events = EventBus::new(config.event_capacity);
        let control = ControlPlane::new(config.control_plane.clone(), events.clone())?;
        Ok(Self::with_control_plane(config, control, events))
    }

    /// Build around an existing control plane (which must publish to
    /// `events`).
    pub fn with_control_plane(config: EngineConfig, control: ControlPlane, events: EventBus) -> Self {
        let aliases = AliasTable::new(config.aliases.clone());
        let presets = PresetTable::new(config.presets.clone());
        let reconciler = Reconciler::new(control.clone(), config.reconciler.clone(), events.clone());
        let layout = LayoutStore::new(
            config.layout.path.clone(),
            reconciler.clone(),
            aliases.clone(),
            presets.clone(),
            events.clone(),
        );
        let applier = PresetApplier::new(
            reconciler.clone(),
            aliases.clone(),
            presets.clone(),
            events.clone(),
        );

        Self {
            config,
            events,
            aliases,
            presets,
            control,
            reconciler,
            layout,
            applier,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn control_plane(&self) -> &ControlPlane {
        &self.control
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn layout(&self) -> &LayoutStore {
        &self.layout
    }

    pub fn presets(&self) -> &PresetApplier {
        &self.applier
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Swap the alias and preset tables. Takes effect on the next apply
    /// or save.
    pub fn reload_tables(
        &self,
        aliases: BTreeMap<String, String>,
        presets: BTreeMap<String, Preset>,
    ) {
        info!(aliases = aliases.len(), presets = presets.len(), "lookup tables reloaded");
        self.aliases.replace(aliases);
        self.presets.replace(presets);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Startup sequence for a long-running process: restore the saved
    /// layout (if configured), then start autosave.
    ///
    /// An unreachable daemon at startup is logged, not fatal; the restore is
    /// retried by the first autosave that finds the daemon healthy.
    pub async fn start(&self) -> Option<RestoreReport> {
        let report = if self.config.layout.restore_on_startup {
            match self.layout.restore_on_startup().await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "startup restore failed");
                    None
                }
            }
        } else {
            None
        };

        self.layout
            .start_autosave(self.config.layout.autosave_interval)
            .await;
        report
    }

    /// Stop autosave and write a final layout.
    pub async fn shutdown(&self) -> Result<bool, CoreError> {
        self.layout.shutdown().await
    }
}
