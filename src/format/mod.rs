//! # Format handlers
//!
//! Bidirectional conversion between [`crate::core::GraphRecord`] and its two
//! on-disk encodings: the canonical Markdown document ([`markdown`]) and the
//! JSON alternative kept for backward compatibility ([`json`]).
//!
//! Both handlers work in terms of a unified node list (ordinary nodes and
//! reroute nodes side by side, distinguished by `is_reroute`) since that is
//! the shape the file formats actually use; [`GraphRecord`] keeps them in
//! separate vectors, so [`FlatNodeRecord`] is the shared bridge between the
//! two shapes.
//!
//! [`GraphRecord`]: crate::core::GraphRecord

pub mod json;
pub mod markdown;

pub use json::JsonFormat;
pub use markdown::MarkdownFormat;

use serde::{Deserialize, Serialize};

use crate::core::{GraphRecord, JsonMap, NodeColors, NodeId, NodeRecord, RerouteRecord};

fn default_pos() -> (f64, f64) {
    (0.0, 0.0)
}

fn default_size() -> (f64, f64) {
    (200.0, 150.0)
}

/// The file-format shape of one node entry, ordinary or reroute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FlatNodeRecord {
    pub uuid: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_pos")]
    pub pos: (f64, f64),
    #[serde(default = "default_size")]
    pub size: (f64, f64),
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub gui_code: String,
    #[serde(default)]
    pub gui_get_values_code: String,
    #[serde(default)]
    pub gui_state: JsonMap,
    #[serde(default)]
    pub colors: NodeColors,
    #[serde(default)]
    pub is_reroute: bool,
}

impl Default for FlatNodeRecord {
    fn default() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            pos: default_pos(),
            size: default_size(),
            code: String::new(),
            gui_code: String::new(),
            gui_get_values_code: String::new(),
            gui_state: JsonMap::new(),
            colors: NodeColors::default(),
            is_reroute: false,
        }
    }
}

impl From<&NodeRecord> for FlatNodeRecord {
    fn from(n: &NodeRecord) -> Self {
        Self {
            uuid: n.uuid,
            title: n.title.clone(),
            description: n.description.clone(),
            pos: n.pos,
            size: n.size,
            code: n.code.clone(),
            gui_code: n.gui_code.clone(),
            gui_get_values_code: n.gui_get_values_code.clone(),
            gui_state: n.gui_state.clone(),
            colors: n.colors.clone(),
            is_reroute: false,
        }
    }
}

impl From<&RerouteRecord> for FlatNodeRecord {
    fn from(r: &RerouteRecord) -> Self {
        Self {
            uuid: r.uuid,
            title: "Reroute".to_string(),
            description: String::new(),
            pos: r.pos,
            size: (20.0, 20.0),
            code: String::new(),
            gui_code: String::new(),
            gui_get_values_code: String::new(),
            gui_state: JsonMap::new(),
            colors: NodeColors::default(),
            is_reroute: true,
        }
    }
}

/// Every node/reroute in `record`, flattened into the file-format shape.
pub(crate) fn flatten(record: &GraphRecord) -> Vec<FlatNodeRecord> {
    let mut out: Vec<FlatNodeRecord> = record.nodes.iter().map(FlatNodeRecord::from).collect();
    out.extend(record.reroutes.iter().map(FlatNodeRecord::from));
    out
}

/// Split a flattened entry list back into `GraphRecord`'s separate node and
/// reroute vectors.
pub(crate) fn split(entries: Vec<FlatNodeRecord>) -> (Vec<NodeRecord>, Vec<RerouteRecord>) {
    let mut nodes = Vec::new();
    let mut reroutes = Vec::new();
    for entry in entries {
        if entry.is_reroute {
            reroutes.push(RerouteRecord {
                uuid: entry.uuid,
                pos: entry.pos,
                is_reroute: true,
            });
        } else {
            nodes.push(NodeRecord {
                uuid: entry.uuid,
                title: entry.title,
                description: entry.description,
                pos: entry.pos,
                size: entry.size,
                code: entry.code,
                gui_code: entry.gui_code,
                gui_get_values_code: entry.gui_get_values_code,
                gui_state: entry.gui_state,
                colors: entry.colors,
                is_reroute: false,
            });
        }
    }
    (nodes, reroutes)
}
