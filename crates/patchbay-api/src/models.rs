// Wire types for the JACK bridge control-plane API
//
// Every response struct is `#[serde(default)]`: bridges differ in which
// fields they emit, and an absent field means the falsy default. Failures
// arrive as HTTP 200 with `{"success": false, "error": "..."}`, so the
// `success`/`error` pair is modelled on every mutating response.

use serde::{Deserialize, Serialize};

/// Error string the bridge uses for routes it does not know.
pub const NOT_FOUND_ERROR: &str = "Not found";

// ── Health & status ─────────────────────────────────────────────────

/// `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthResponse {
    /// `"healthy"` / `"unhealthy"` on bridges that report it.
    pub status: Option<String>,
    #[serde(alias = "jack_running")]
    pub running: bool,
    pub service: Option<String>,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl HealthResponse {
    /// Whether the bridge reports its JACK server as up.
    pub fn is_running(&self) -> bool {
        self.running || matches!(self.status.as_deref(), Some("healthy" | "ok"))
    }
}

/// `GET /status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub success: Option<bool>,
    #[serde(alias = "jack_running")]
    pub running: bool,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub client_name: Option<String>,
    pub error: Option<String>,
}

// ── Ports ───────────────────────────────────────────────────────────

/// One entry of `GET /ports`. Plain bridges send bare names, richer ones
/// send `{name, direction, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePort {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        direction: Option<String>,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

impl WirePort {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Direction string as reported (`"input"`, `"output"`), if any.
    pub fn direction(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Detailed { direction, .. } => direction.as_deref(),
        }
    }

    /// Port type string as reported (`"audio"`, `"midi"`, or a JACK type
    /// description), if any.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Detailed { kind, .. } => kind.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsResponse {
    pub success: Option<bool>,
    pub ports: Vec<WirePort>,
    pub error: Option<String>,
}

// ── Connections ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireConnection {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionsResponse {
    pub success: Option<bool>,
    pub connections: Vec<WireConnection>,
    pub error: Option<String>,
}

/// Body of `POST /connect` and `POST /disconnect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

// ── Mutations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectResponse {
    pub success: bool,
    pub already_connected: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisconnectResponse {
    pub success: bool,
    /// Set by bridges that know the route but cannot perform it.
    pub unsupported: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearResponse {
    pub success: bool,
    #[serde(alias = "count")]
    pub cleared: u32,
    pub unsupported: bool,
    pub error: Option<String>,
}
