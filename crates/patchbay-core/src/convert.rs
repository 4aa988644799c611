// ── Wire-to-domain conversion ──
//
// Bridges report ports either as bare names or as `{name, direction, type}`
// objects. Missing fields are inferred from JACK naming conventions.

use patchbay_api::{WireConnection, WirePort};

use crate::model::{ConnectionKey, Port, PortDirection, PortKind};

/// Infer a direction from a port's short name when the bridge didn't say.
/// JACK's system client names hardware inputs `capture_N` (signal flows
/// out of them) and hardware outputs `playback_N`.
fn infer_direction(name: &str) -> PortDirection {
    let short = name.split_once(':').map_or(name, |(_, s)| s).to_ascii_lowercase();
    if short.contains("capture") || short.ends_with("_out") || short.starts_with("out") {
        PortDirection::Output
    } else if short.contains("playback") || short.ends_with("_in") || short.starts_with("in") {
        PortDirection::Input
    } else {
        PortDirection::Unknown
    }
}

fn infer_kind(name: &str, reported: Option<&str>) -> PortKind {
    let midi = |s: &str| s.to_ascii_lowercase().contains("midi");
    if reported.is_some_and(midi) || midi(name) {
        PortKind::Midi
    } else {
        PortKind::Audio
    }
}

impl From<&WirePort> for Port {
    fn from(wire: &WirePort) -> Self {
        let name = wire.name();
        let direction = wire
            .direction()
            .and_then(|d| d.parse::<PortDirection>().ok())
            .filter(|d| *d != PortDirection::Unknown)
            .unwrap_or_else(|| infer_direction(name));

        Port {
            name: name.to_owned(),
            client: Port::client_of(name).to_owned(),
            direction,
            kind: infer_kind(name, wire.kind()),
        }
    }
}

impl From<WireConnection> for ConnectionKey {
    fn from(wire: WireConnection) -> Self {
        ConnectionKey::new(wire.from, wire.to)
    }
}
