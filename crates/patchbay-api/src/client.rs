// Bridge HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, the bridge's
// HTTP-200-with-`success:false` failure convention, capability-gap
// detection, and the `jack_lsp` text fallback. One method per endpoint;
// no caching or retry happens here.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::lsp;
use crate::models::{
    ClearResponse, ConnectRequest, ConnectResponse, ConnectionsResponse, DisconnectResponse,
    HealthResponse, NOT_FOUND_ERROR, PortsResponse, StatusResponse, WireConnection, WirePort,
};
use crate::transport::TransportConfig;

const BODY_PREVIEW_CHARS: usize = 200;

/// A response body read to completion, with enough metadata to decide how
/// to decode it.
struct Payload {
    status: StatusCode,
    is_text: bool,
    body: String,
}

impl Payload {
    fn preview(&self) -> String {
        self.body.chars().take(BODY_PREVIEW_CHARS).collect()
    }
}

/// HTTP statuses that mean "this bridge has no such operation".
fn is_unsupported_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

/// Turn a `{success, error}` pair into an error when the bridge reported
/// failure. A missing `success` with an `error` string is also a failure.
fn check_reported(success: Option<bool>, error: Option<String>) -> Result<(), Error> {
    match (success, error) {
        (Some(false), error) => Err(Error::Bridge {
            message: error.unwrap_or_else(|| "request failed".into()),
        }),
        (None, Some(message)) => Err(Error::Bridge { message }),
        _ => Ok(()),
    }
}

/// Raw HTTP client for a JACK bridge's control-plane API.
///
/// The `base_url` may carry a path prefix (`http://host:6666/jack/`);
/// endpoints are resolved relative to it.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_ms: u64,
}

impl BridgeClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
            timeout_ms: transport.timeout_ms(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`. `timeout` is the
    /// request timeout configured on `http`; it is only used for reporting.
    pub fn with_client(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /health`
    ///
    /// Unhealthy bridges may answer with a non-2xx status and a JSON body;
    /// the body is still returned when it decodes.
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let payload = self.get("health").await?;
        if !payload.status.is_success() {
            return serde_json::from_str(&payload.body).map_err(|_| Error::Http {
                status: payload.status.as_u16(),
                path: "health".into(),
            });
        }
        decode(&payload)
    }

    /// `GET /status`
    ///
    /// A bridge whose JACK server is down answers `success: false`; that is
    /// returned as a status with `running == false`, not as an error.
    pub async fn status(&self) -> Result<StatusResponse, Error> {
        let payload = self.get("status").await?;
        ensure_success_status(&payload, "status")?;
        decode(&payload)
    }

    /// `GET /ports`
    pub async fn list_ports(&self) -> Result<Vec<WirePort>, Error> {
        let payload = self.get("ports").await?;
        ensure_success_status(&payload, "ports")?;

        if payload.is_text {
            trace!("decoding /ports as jack_lsp text");
            return Ok(lsp::parse(&payload.body)?.wire_ports());
        }

        let resp: PortsResponse = decode(&payload)?;
        check_reported(resp.success, resp.error)?;
        Ok(resp.ports)
    }

    /// `GET /connections`
    pub async fn list_connections(&self) -> Result<Vec<WireConnection>, Error> {
        let payload = self.get("connections").await?;
        ensure_success_status(&payload, "connections")?;

        if payload.is_text {
            trace!("decoding /connections as jack_lsp text");
            return Ok(lsp::parse(&payload.body)?.connections());
        }

        let resp: ConnectionsResponse = decode(&payload)?;
        check_reported(resp.success, resp.error)?;
        Ok(resp.connections)
    }

    /// `POST /connect`
    ///
    /// Succeeds when the bridge reports the pair connected, including
    /// "already connected".
    pub async fn connect(&self, source: &str, destination: &str) -> Result<ConnectResponse, Error> {
        let payload = self
            .post(
                "connect",
                &ConnectRequest {
                    source,
                    destination,
                },
            )
            .await?;
        ensure_success_status(&payload, "connect")?;

        let resp: ConnectResponse = decode(&payload)?;
        if !resp.success {
            return Err(Error::Bridge {
                message: resp
                    .error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("failed to connect {source} -> {destination}")),
            });
        }
        Ok(resp)
    }

    /// `POST /disconnect`
    ///
    /// Returns `Error::Unsupported` when the bridge has no native
    /// disconnect.
    pub async fn disconnect(&self, source: &str, destination: &str) -> Result<(), Error> {
        let payload = self
            .post(
                "disconnect",
                &ConnectRequest {
                    source,
                    destination,
                },
            )
            .await?;
        if is_unsupported_status(payload.status) {
            return Err(Error::Unsupported("disconnect"));
        }
        ensure_success_status(&payload, "disconnect")?;

        let resp: DisconnectResponse = decode(&payload)?;
        if resp.unsupported || resp.error.as_deref() == Some(NOT_FOUND_ERROR) {
            return Err(Error::Unsupported("disconnect"));
        }
        if !resp.success {
            return Err(Error::Bridge {
                message: resp
                    .error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("failed to disconnect {source} -> {destination}")),
            });
        }
        Ok(())
    }

    /// `POST /clear`, returning how many connections the bridge removed.
    pub async fn clear(&self) -> Result<u32, Error> {
        let payload = self.post("clear", &serde_json::json!({})).await?;
        if is_unsupported_status(payload.status) {
            return Err(Error::Unsupported("clear"));
        }
        ensure_success_status(&payload, "clear")?;

        let resp: ClearResponse = decode(&payload)?;
        if resp.unsupported || resp.error.as_deref() == Some(NOT_FOUND_ERROR) {
            return Err(Error::Unsupported("clear"));
        }
        check_reported(Some(resp.success), resp.error)?;
        Ok(resp.cleared)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn get(&self, path: &str) -> Result<Payload, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        self.execute(self.http.get(url)).await
    }

    async fn post(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<Payload, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        self.execute(self.http.post(url).json(body)).await
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Payload, Error> {
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let is_text = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain"));
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(status = status.as_u16(), bytes = body.len(), "response");
        Ok(Payload {
            status,
            is_text,
            body,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            Error::Transport(e)
        }
    }
}

/// Ensure the base path ends in `/` so `Url::join` appends instead of
/// replacing the last segment.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn ensure_success_status(payload: &Payload, path: &str) -> Result<(), Error> {
    if payload.status.is_success() {
        Ok(())
    } else {
        Err(Error::Http {
            status: payload.status.as_u16(),
            path: path.to_owned(),
        })
    }
}

fn decode<T: DeserializeOwned>(payload: &Payload) -> Result<T, Error> {
    serde_json::from_str(&payload.body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", payload.preview()),
        body: payload.body.clone(),
    })
}
