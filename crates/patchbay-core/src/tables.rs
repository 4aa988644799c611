// ── Alias and preset lookup tables ──
//
// Both tables are read-only to the engine and swapped whole on reload.
// Readers take a cheap snapshot; a swap is visible to the next lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::{Preset, PresetSummary};

/// Symbolic name to concrete port name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    inner: Arc<ArcSwap<BTreeMap<String, String>>>,
}

impl AliasTable {
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(aliases)),
        }
    }

    /// Exact-match lookup. Unknown names do not fall through as port names.
    pub fn resolve(&self, alias: &str) -> Option<String> {
        self.inner.load().get(alias).cloned()
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<String, String>> {
        self.inner.load_full()
    }

    pub fn replace(&self, aliases: BTreeMap<String, String>) {
        self.inner.store(Arc::new(aliases));
    }
}

/// Preset name to preset.
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    inner: Arc<ArcSwap<BTreeMap<String, Preset>>>,
}

impl PresetTable {
    /// Build the table, filling in each preset's `name` from its key when
    /// the definition left it empty.
    pub fn new(presets: BTreeMap<String, Preset>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(normalize(presets))),
        }
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        self.inner.load().get(name).cloned()
    }

    pub fn list(&self) -> Vec<PresetSummary> {
        self.inner.load().values().map(PresetSummary::from).collect()
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<String, Preset>> {
        self.inner.load_full()
    }

    pub fn replace(&self, presets: BTreeMap<String, Preset>) {
        self.inner.store(Arc::new(normalize(presets)));
    }
}

fn normalize(mut presets: BTreeMap<String, Preset>) -> BTreeMap<String, Preset> {
    for (key, preset) in &mut presets {
        if preset.name.is_empty() {
            preset.name.clone_from(key);
        }
    }
    presets
}
