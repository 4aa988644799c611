//! Connection reconciliation engine for a JACK routing daemon reached
//! over HTTP.
//!
//! This crate turns routing intents into remote operations and keeps a
//! local view of the graph consistent with the daemon:
//!
//! - **[`ControlPlane`]**: resilient client over `patchbay-api`. Cached
//!   single-flight health probes, bounded in-flight calls, capability
//!   tracking for optional operations (native disconnect / clear).
//!
//! - **[`Reconciler`]**: idempotent connect / disconnect / clear / bulk
//!   operations over a tracked graph, serialized by one async mutex and
//!   published through a `watch` snapshot. Disconnect falls back to
//!   clear-and-rebuild on daemons without a native disconnect.
//!
//! - **[`LayoutStore`]**: atomic JSON snapshots with a rotating backup,
//!   periodic autosave, and restore on startup.
//!
//! - **[`PresetApplier`]**: resolves named alias lists into concrete ports
//!   and drives the reconciler, with a side-effect-free dry run.
//!
//! - **[`Engine`]**: owns one of each, wired to one [`EventBus`].

pub mod config;
pub mod control_plane;
pub mod convert;
pub mod engine;
pub mod error;
pub mod events;
pub mod layout_store;
pub mod model;
pub mod preset;
pub mod reconciler;
pub mod tables;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    ControlPlaneConfig, DisconnectStrategy, EngineConfig, LayoutConfig, ReconcilerConfig,
};
pub use control_plane::{ConnectOutcome, ControlPlane};
pub use engine::Engine;
pub use error::CoreError;
pub use events::{ChangeAction, ConnectionChange, Delivery, EventBus, RoutingEvent, Subscription};
pub use layout_store::{LayoutStore, RestoreReport};
pub use preset::{
    ApplyOptions, PresetApplier, PresetApplyReport, PresetItem, ResolvedConnection,
    UnresolvedConnection, ValidationReport,
};
pub use reconciler::{
    BulkItem, BulkResult, ConnectResult, DisconnectOutcome, FailedConnection, ItemOutcome,
    Reconciler, ReplaceResult, SyncDelta, TrackedGraph,
};
pub use tables::{AliasTable, PresetTable};

pub use model::{
    BridgeHealth, BridgeStatus, Capabilities, Capability, Connection, ConnectionKey,
    LayoutSnapshot, Port, PortDirection, PortKind, Preset, PresetConnection, PresetSummary,
};
