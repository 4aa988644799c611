// ── Routing domain model ──
//
// Canonical types the engine works in. Wire shapes from `patchbay-api`
// are converted into these in `crate::convert`; nothing outside that
// module sees a wire type.

pub mod connection;
pub mod health;
pub mod layout;
pub mod port;
pub mod preset;

// ── Re-exports ──────────────────────────────────────────────────────

pub use connection::{Connection, ConnectionKey};
pub use health::{BridgeHealth, BridgeStatus, Capabilities, Capability};
pub use layout::LayoutSnapshot;
pub use port::{Port, PortDirection, PortKind};
pub use preset::{Preset, PresetConnection, PresetSummary};
