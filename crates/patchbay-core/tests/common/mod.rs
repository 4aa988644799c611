#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures: an in-memory routing daemon served through wiremock.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use patchbay_core::{ConnectionKey, Engine, EngineConfig, Preset};

pub const PORTS: &[&str] = &[
    "system:capture_1",
    "system:capture_2",
    "system:playback_1",
    "system:playback_2",
    "a:out",
    "b:in",
    "c:out",
    "d:in",
    "e:out",
    "f:in",
];

#[derive(Debug)]
struct BridgeState {
    running: bool,
    ports: Vec<String>,
    connections: Vec<(String, String)>,
    native_disconnect: bool,
    native_clear: bool,
    refuse: Vec<(String, String)>,
}

/// Stateful stand-in for the JACK bridge. Mirrors the daemon's wire
/// behaviour: failures are HTTP 200 with `success: false`, unknown routes
/// are HTTP 200 with `{"error": "Not found"}`.
#[derive(Debug, Clone)]
pub struct FakeBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState {
                running: true,
                ports: PORTS.iter().map(|p| (*p).to_owned()).collect(),
                connections: Vec::new(),
                native_disconnect: true,
                native_clear: true,
                refuse: Vec::new(),
            })),
        }
    }
}

impl FakeBridge {
    /// A bridge with no `/disconnect` route.
    pub fn without_native_disconnect() -> Self {
        let bridge = Self::default();
        bridge.state.lock().unwrap().native_disconnect = false;
        bridge
    }

    pub fn without_native_clear(self) -> Self {
        self.state.lock().unwrap().native_clear = false;
        self
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().unwrap().running = running;
    }

    /// Make future connects of `from -> to` fail.
    pub fn refuse(&self, from: &str, to: &str) {
        self.state
            .lock()
            .unwrap()
            .refuse
            .push((from.into(), to.into()));
    }

    /// Connect directly on the daemon, behind the engine's back.
    pub fn add_connection(&self, from: &str, to: &str) {
        self.state
            .lock()
            .unwrap()
            .connections
            .push((from.into(), to.into()));
    }

    pub fn connections(&self) -> Vec<ConnectionKey> {
        let mut keys: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .connections
            .iter()
            .map(|(f, t)| ConnectionKey::new(f.as_str(), t.as_str()))
            .collect();
        keys.sort();
        keys
    }

    pub async fn serve(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    fn pair(request: &Request) -> (String, String) {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let field = |name: &str| body[name].as_str().unwrap_or_default().to_owned();
        (field("source"), field("destination"))
    }
}

fn not_running() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": false,
        "error": "JACK not running"
    }))
}

impl Respond for FakeBridge {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let path = request.url.path().to_owned();
        let method = request.method.as_str().to_owned();

        match (method.as_str(), path.as_str()) {
            ("GET", "/health") => ResponseTemplate::new(200).set_body_json(json!({
                "status": if state.running { "healthy" } else { "unhealthy" },
                "jack_running": state.running,
                "service": "jack-bridge",
                "version": "1.0.0"
            })),
            _ if !state.running => not_running(),
            ("GET", "/status") => ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "jack_running": true,
                "sample_rate": 48000,
                "buffer_size": 256
            })),
            ("GET", "/ports") => {
                ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "ports": state.ports
                }))
            }
            ("GET", "/connections") => {
                let connections: Vec<Value> = state
                    .connections
                    .iter()
                    .map(|(from, to)| json!({"from": from, "to": to}))
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "connections": connections
                }))
            }
            ("POST", "/connect") => {
                let pair = Self::pair(request);
                let known = state.ports.contains(&pair.0) && state.ports.contains(&pair.1);
                if !known || state.refuse.contains(&pair) {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "success": false,
                        "error": "Connection failed"
                    }))
                } else if state.connections.contains(&pair) {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "success": true,
                        "already_connected": true,
                        "message": "Ports already connected"
                    }))
                } else {
                    state.connections.push(pair);
                    ResponseTemplate::new(200).set_body_json(json!({
                        "success": true,
                        "already_connected": false,
                        "message": "Connected"
                    }))
                }
            }
            ("POST", "/disconnect") if state.native_disconnect => {
                let pair = Self::pair(request);
                state.connections.retain(|c| *c != pair);
                ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
            }
            ("POST", "/clear") if state.native_clear => {
                let count = state.connections.len();
                state.connections.clear();
                ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "count": count
                }))
            }
            _ => ResponseTemplate::new(200).set_body_json(json!({
                "error": "Not found",
                "path": path
            })),
        }
    }
}

// ── Engine fixtures ─────────────────────────────────────────────────

pub fn config_for(server: &MockServer, layout_path: PathBuf) -> EngineConfig {
    let mut config = EngineConfig::new(Url::parse(&server.uri()).unwrap(), layout_path);
    config.control_plane.timeout = Duration::from_secs(2);
    config.control_plane.health_cache_ttl = Duration::ZERO;
    config.reconciler.settle_delay = Duration::from_millis(10);
    config.layout.autosave_interval = Duration::ZERO;
    config
}

pub struct Harness {
    pub bridge: FakeBridge,
    pub server: MockServer,
    pub engine: Engine,
    pub dir: TempDir,
}

impl Harness {
    pub async fn start(bridge: FakeBridge) -> Self {
        Self::start_with(bridge, |_| {}).await
    }

    pub async fn start_with(bridge: FakeBridge, tweak: impl FnOnce(&mut EngineConfig)) -> Self {
        let server = bridge.serve().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(&server, dir.path().join("layout.json"));
        tweak(&mut config);
        let engine = Engine::new(config).unwrap();
        Self {
            bridge,
            server,
            engine,
            dir,
        }
    }

    pub fn layout_path(&self) -> PathBuf {
        self.dir.path().join("layout.json")
    }

    /// Number of requests the bridge saw for `method path`.
    pub async fn hits(&self, method: &str, path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == method && r.url.path() == path)
            .count()
    }
}

pub fn key(from: &str, to: &str) -> ConnectionKey {
    ConnectionKey::new(from, to)
}

pub fn tracked_keys(engine: &Engine) -> Vec<ConnectionKey> {
    let mut keys: Vec<_> = engine
        .reconciler()
        .tracked()
        .iter()
        .map(patchbay_core::Connection::key)
        .collect();
    keys.sort();
    keys
}

pub fn stereo_tables() -> (BTreeMap<String, String>, BTreeMap<String, Preset>) {
    let aliases = BTreeMap::from([
        ("mic_l".to_owned(), "system:capture_1".to_owned()),
        ("mic_r".to_owned(), "system:capture_2".to_owned()),
        ("out_l".to_owned(), "system:playback_1".to_owned()),
        ("out_r".to_owned(), "system:playback_2".to_owned()),
    ]);
    let passthrough: Preset = serde_json::from_value(json!({
        "description": "Stereo input straight to the monitors",
        "connections": [
            {"from": "mic_l", "to": "out_l"},
            {"from": "mic_r", "to": "out_r"}
        ]
    }))
    .unwrap();
    let broken: Preset = serde_json::from_value(json!({
        "description": "References an alias that does not exist",
        "connections": [
            {"from": "mic_l", "to": "out_l"},
            {"from": "synth", "to": "out_r"}
        ]
    }))
    .unwrap();
    let presets = BTreeMap::from([
        ("passthrough".to_owned(), passthrough),
        ("broken".to_owned(), broken),
    ]);
    (aliases, presets)
}
