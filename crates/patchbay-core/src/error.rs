// ── Core error types ──
//
// Routing-level errors from patchbay-core. Consumers never see HTTP
// statuses or wire decoding failures directly; the
// `From<patchbay_api::Error>` impl translates transport-layer errors into
// these variants. Partial failure is not an error: bulk, preset and
// rebuild operations return structured results with failure lists.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Control plane ────────────────────────────────────────────────
    #[error("Control plane unavailable: {reason}")]
    ControlPlaneUnavailable { reason: String },

    #[error("Operation not supported by the routing daemon: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Routing daemon error: {message}")]
    Remote { message: String },

    // ── Routing ──────────────────────────────────────────────────────
    #[error("Invalid port {port:?}: {reason}")]
    InvalidPort { port: String, reason: String },

    #[error("Failed to connect {from} -> {to}: {reason}")]
    ConnectFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Failed to disconnect {from} -> {to}: {reason}")]
    DisconnectFailed {
        from: String,
        to: String,
        reason: String,
    },

    // ── Presets ──────────────────────────────────────────────────────
    #[error("Alias not found: {alias}")]
    AliasNotFound { alias: String },

    #[error("Preset not found: {name}")]
    PresetNotFound { name: String },

    // ── Layout persistence ───────────────────────────────────────────
    #[error("No saved layout at {}", path.display())]
    NoSavedState { path: PathBuf },

    #[error("Saved layout at {} is corrupt: {reason}", path.display())]
    StateCorrupt { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the routing daemon could not be reached (or reports
    /// itself down). Callers may treat the graph as stale.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ControlPlaneUnavailable { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<patchbay_api::Error> for CoreError {
    fn from(err: patchbay_api::Error) -> Self {
        match err {
            e @ (patchbay_api::Error::Transport(_) | patchbay_api::Error::Timeout { .. }) => {
                CoreError::ControlPlaneUnavailable {
                    reason: e.to_string(),
                }
            }
            patchbay_api::Error::Unsupported(operation) => CoreError::UnsupportedOperation {
                operation: operation.to_owned(),
            },
            patchbay_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid bridge URL: {e}"),
            },
            patchbay_api::Error::ClientBuild(message) => CoreError::Config { message },
            patchbay_api::Error::Bridge { message } => CoreError::Remote { message },
            patchbay_api::Error::Deserialization { message, body: _ } => CoreError::Remote {
                message: format!("unreadable response: {message}"),
            },
            other @ (patchbay_api::Error::Http { .. } | patchbay_api::Error::LspParse { .. }) => {
                CoreError::Remote {
                    message: other.to_string(),
                }
            }
        }
    }
}
