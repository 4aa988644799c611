// ── Preset domain types ──

use serde::{Deserialize, Serialize};

/// One symbolic connection in a preset: alias names, not port names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetConnection {
    pub from: String,
    pub to: String,
}

/// A named list of symbolic connections. Aliases resolve at apply time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub connections: Vec<PresetConnection>,
}

/// Listing entry for a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSummary {
    pub name: String,
    pub description: String,
    pub connections: usize,
}

impl From<&Preset> for PresetSummary {
    fn from(preset: &Preset) -> Self {
        Self {
            name: preset.name.clone(),
            description: preset.description.clone(),
            connections: preset.connections.len(),
        }
    }
}
