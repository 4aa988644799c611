//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use patchbay_config::ConfigError;
use patchbay_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the routing daemon at {url}")]
    #[diagnostic(
        code(patchbay::unavailable),
        help(
            "Check that the JACK bridge is running and JACK is started.\n\
             Reason: {reason}\n\
             Try: patchbay status --url <bridge-url>"
        )
    )]
    Unavailable { url: String, reason: String },

    #[error("The routing daemon does not support {operation}")]
    #[diagnostic(
        code(patchbay::unsupported),
        help("Enable the clear-and-rebuild disconnect strategy in [engine] disconnect_strategies.")
    )]
    Unsupported { operation: String },

    #[error("Routing daemon error: {message}")]
    #[diagnostic(code(patchbay::remote))]
    Remote { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(patchbay::not_found),
        help("Run: patchbay {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Partial failure ──────────────────────────────────────────────
    #[error("{operation}: {failed} of {total} connections failed")]
    #[diagnostic(
        code(patchbay::partial_failure),
        help("Rerun with --output json for per-connection errors.")
    )]
    PartialFailure {
        operation: String,
        failed: usize,
        total: usize,
    },

    // ── Layout ───────────────────────────────────────────────────────
    #[error("No saved layout at {path}")]
    #[diagnostic(
        code(patchbay::no_layout),
        help("Save one with: patchbay layout save")
    )]
    NoSavedLayout { path: String },

    #[error("Saved layout at {path} is unreadable: {reason}")]
    #[diagnostic(
        code(patchbay::corrupt_layout),
        help("The file was moved aside with a .corrupt suffix. The .backup file holds the previous layout.")
    )]
    CorruptLayout { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(patchbay::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(patchbay::config),
        help("Check the config file (patchbay config path) and PATCHBAY_* environment variables.")
    )]
    Config(Box<ConfigError>),

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(patchbay::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("I/O error: {0}")]
    #[diagnostic(code(patchbay::io))]
    Io(String),

    #[error(transparent)]
    #[diagnostic(code(patchbay::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::NoSavedLayout { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the bridge URL to an unavailability error.
    pub fn with_url(self, bridge: &str) -> Self {
        match self {
            Self::Unavailable { reason, .. } => Self::Unavailable {
                url: bridge.to_owned(),
                reason,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ControlPlaneUnavailable { reason } => Self::Unavailable {
                url: "(configured bridge)".into(),
                reason,
            },

            CoreError::UnsupportedOperation { operation } => Self::Unsupported { operation },

            CoreError::Remote { message } => Self::Remote { message },

            e @ (CoreError::ConnectFailed { .. } | CoreError::DisconnectFailed { .. }) => {
                Self::Remote {
                    message: e.to_string(),
                }
            }

            CoreError::InvalidPort { port, reason } => Self::Validation {
                field: format!("port {port:?}"),
                reason,
            },

            CoreError::AliasNotFound { alias } => Self::NotFound {
                resource_type: "alias".into(),
                identifier: alias,
                list_command: "config show".into(),
            },

            CoreError::PresetNotFound { name } => Self::NotFound {
                resource_type: "preset".into(),
                identifier: name,
                list_command: "presets list".into(),
            },

            CoreError::NoSavedState { path } => Self::NoSavedLayout {
                path: path.display().to_string(),
            },

            CoreError::StateCorrupt { path, reason } => Self::CorruptLayout {
                path: path.display().to_string(),
                reason,
            },

            e @ CoreError::Io { .. } => Self::Io(e.to_string()),

            CoreError::Serialization(e) => Self::Json(e),

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
