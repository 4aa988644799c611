// ── Persisted layout snapshot ──
//
// On-disk shape:
//
//   { "timestamp": "...",
//     "connections": [{"from": "...", "to": "..."}],
//     "tracked_connections": [{"from": "...", "to": "...", "timestamp": "..."}],
//     "device_config": { "<alias>": "<port>" },
//     "presets": { "<name>": { "name", "description", "connections" } } }

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::{Connection, ConnectionKey};
use super::preset::Preset;

/// Immutable record of the routing graph at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSnapshot {
    pub timestamp: DateTime<Utc>,
    pub connections: Vec<ConnectionKey>,
    pub tracked_connections: Vec<Connection>,
    /// Alias table in effect when the snapshot was taken.
    pub device_config: BTreeMap<String, String>,
    pub presets: BTreeMap<String, Preset>,
}

impl LayoutSnapshot {
    /// Every pair to restore: `connections` first, then any tracked
    /// connection not already listed. Order is preserved, duplicates dropped.
    pub fn restore_pairs(&self) -> Vec<ConnectionKey> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .cloned()
            .chain(self.tracked_connections.iter().map(Connection::key))
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn restore_pairs_is_ordered_union() {
        let snapshot = LayoutSnapshot {
            connections: vec![ConnectionKey::new("a:out", "b:in")],
            tracked_connections: vec![
                Connection::new("a:out", "b:in"),
                Connection::new("c:out", "d:in"),
            ],
            ..LayoutSnapshot::default()
        };
        assert_eq!(
            snapshot.restore_pairs(),
            vec![
                ConnectionKey::new("a:out", "b:in"),
                ConnectionKey::new("c:out", "d:in"),
            ]
        );
    }

    #[test]
    fn missing_fields_default() {
        let snapshot: LayoutSnapshot =
            serde_json::from_str(r#"{"connections":[{"from":"a:out","to":"b:in"}]}"#).unwrap();
        assert_eq!(snapshot.connections.len(), 1);
        assert!(snapshot.tracked_connections.is_empty());
        assert!(snapshot.presets.is_empty());
    }
}
