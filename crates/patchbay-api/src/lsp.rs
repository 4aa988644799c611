// ── jack_lsp text parser ──
//
// Some bridges proxy `jack_lsp -c [-p] [-t]` output verbatim as
// `text/plain` instead of JSON. This module is the only place that reads
// that format.
//
// Grammar (one token per physical line, blank lines ignored):
//
//   document   := { port_block }
//   port_block := port_line { detail_line }
//   port_line  := NAME                      ; column 0, contains ':'
//   detail_line:= WS "properties:" FLAGS    ; from `-p`
//              |  WS NAME                   ; connected peer, contains ':'
//              |  WS TYPE_DESC              ; from `-t`, no ':'
//
// FLAGS is a comma-separated list; `input` / `output` set the direction,
// other flags (`physical`, `terminal`, ...) are ignored.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::models::{WireConnection, WirePort};

const PROPERTIES_PREFIX: &str = "properties:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LspDirection {
    Input,
    Output,
}

impl LspDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// One port block from `jack_lsp` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LspPort {
    pub name: String,
    pub direction: Option<LspDirection>,
    pub type_desc: Option<String>,
    pub peers: Vec<String>,
}

impl LspPort {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            direction: None,
            type_desc: None,
            peers: Vec::new(),
        }
    }
}

/// Parsed `jack_lsp` output. Ports keep their first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LspDocument {
    pub ports: Vec<LspPort>,
}

/// Parse `jack_lsp` text output.
pub fn parse(text: &str) -> Result<LspDocument, Error> {
    let mut doc = LspDocument::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let indented = line.starts_with([' ', '\t']);
        let token = line.trim_start();

        if !indented {
            if !token.contains(':') {
                return Err(Error::LspParse {
                    line: line_no,
                    reason: format!("port name {token:?} has no client prefix"),
                });
            }
            let idx = *index.entry(token.to_owned()).or_insert_with(|| {
                doc.ports.push(LspPort::new(token));
                doc.ports.len() - 1
            });
            current = Some(idx);
            continue;
        }

        let Some(idx) = current else {
            return Err(Error::LspParse {
                line: line_no,
                reason: "indented line before any port name".into(),
            });
        };
        let Some(port) = doc.ports.get_mut(idx) else {
            continue;
        };

        if let Some(flags) = token.strip_prefix(PROPERTIES_PREFIX) {
            for flag in flags.split(',').map(str::trim) {
                match flag {
                    "input" => port.direction = Some(LspDirection::Input),
                    "output" => port.direction = Some(LspDirection::Output),
                    _ => {}
                }
            }
        } else if token.contains(':') {
            if !port.peers.iter().any(|p| p == token) {
                port.peers.push(token.to_owned());
            }
        } else {
            port.type_desc = Some(token.to_owned());
        }
    }

    Ok(doc)
}

impl LspDocument {
    fn direction_of(&self, name: &str) -> Option<LspDirection> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.direction)
    }

    /// Connection list derived from the peer lines.
    ///
    /// `jack_lsp -c` lists every edge twice (once under each end). Each
    /// unordered pair is emitted once, oriented from the end known to be an
    /// output; when neither end has a known direction the first-seen order
    /// wins.
    pub fn connections(&self) -> Vec<WireConnection> {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut out = Vec::new();

        for port in &self.ports {
            for peer in &port.peers {
                let (a, b) = (port.name.as_str(), peer.as_str());
                let key = if a <= b { (a, b) } else { (b, a) };
                if !seen.insert(key) {
                    continue;
                }

                let reversed = matches!(
                    (port.direction, self.direction_of(b)),
                    (Some(LspDirection::Input), _) | (None, Some(LspDirection::Output))
                );
                let (from, to) = if reversed { (b, a) } else { (a, b) };
                out.push(WireConnection {
                    from: from.to_owned(),
                    to: to.to_owned(),
                });
            }
        }

        out
    }

    /// Port list in the same shape the JSON `/ports` endpoint uses.
    pub fn wire_ports(&self) -> Vec<WirePort> {
        self.ports
            .iter()
            .map(|p| match (p.direction, &p.type_desc) {
                (None, None) => WirePort::Name(p.name.clone()),
                (direction, type_desc) => WirePort::Detailed {
                    name: p.name.clone(),
                    direction: direction.map(|d| d.as_str().to_owned()),
                    kind: type_desc.clone(),
                },
            })
            .collect()
    }
}
