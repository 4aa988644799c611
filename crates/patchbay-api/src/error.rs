use thiserror::Error;

/// Top-level error type for the `patchbay-api` crate.
///
/// Covers transport failures, bridge-reported failures, capability gaps
/// and decoding problems. `patchbay-core` maps these into routing-level
/// errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Bridge ──────────────────────────────────────────────────────
    /// Non-success HTTP status that carries no bridge-level meaning.
    #[error("Bridge returned HTTP {status} for {path}")]
    Http { status: u16, path: String },

    /// The bridge answered but reported `success: false`.
    #[error("Bridge reported failure: {message}")]
    Bridge { message: String },

    /// The bridge does not implement this operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Legacy `jack_lsp` text output did not match the grammar.
    #[error("Malformed jack_lsp output at line {line}: {reason}")]
    LspParse { line: usize, reason: String },
}

impl Error {
    /// Returns `true` if the bridge could not be reached or the exchange
    /// broke off (as opposed to answering with a failure). Any transport
    /// error counts, including a body cut short mid-response.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }

    /// Returns `true` if this is a capability gap on the bridge side.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
