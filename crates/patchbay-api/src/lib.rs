// patchbay-api: Async Rust client for the JACK bridge control-plane API

pub mod client;
pub mod error;
pub mod lsp;
pub mod models;
pub mod transport;

pub use client::BridgeClient;
pub use error::Error;
pub use models::{
    ClearResponse, ConnectResponse, ConnectionsResponse, DisconnectResponse, HealthResponse,
    PortsResponse, StatusResponse, WireConnection, WirePort,
};
pub use transport::TransportConfig;
