// ── Port domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Signal direction as seen from the port's owner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PortDirection {
    /// Receives signal (playback side).
    Input,
    /// Produces signal (capture side).
    Output,
    #[default]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PortKind {
    #[default]
    Audio,
    Midi,
}

/// A port observed on the routing daemon. Never constructed from local
/// guesses; only from control-plane listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    /// Full `client:port` identifier.
    pub name: String,
    /// Owning client (the part before the first `:`).
    pub client: String,
    pub direction: PortDirection,
    pub kind: PortKind,
}

impl Port {
    /// Owning client name for a `client:port` identifier.
    pub fn client_of(name: &str) -> &str {
        name.split_once(':').map_or(name, |(client, _)| client)
    }

    /// Short name (the part after the first `:`).
    pub fn short_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, short)| short)
    }

    /// Check that `name` is a well-formed `client:port` identifier.
    pub fn validate_name(name: &str) -> Result<(), CoreError> {
        let invalid = |reason: &str| CoreError::InvalidPort {
            port: name.to_owned(),
            reason: reason.to_owned(),
        };

        if name.trim().is_empty() {
            return Err(invalid("port name is empty"));
        }
        if name.trim() != name {
            return Err(invalid("port name has surrounding whitespace"));
        }
        match name.split_once(':') {
            Some((client, port)) if !client.is_empty() && !port.is_empty() => Ok(()),
            _ => Err(invalid("expected client:port")),
        }
    }
}
