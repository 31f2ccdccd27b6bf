//! # Node
//!
//! A node wraps a user-authored Python function, its pins (derived from the
//! function's signature), an optional embedded widget host, and its
//! serializable visual state.

use serde::{Deserialize, Serialize};

use crate::parsing::signature::{derive_signature, ParsedSignature};

use super::pin::Pin;
use super::types::{JsonMap, NodeColors, NodeId, PinDirection, Position, Size};

/// Horizontal padding added to the widest label when computing minimum width.
const LABEL_PADDING: f64 = 60.0;
/// Per-character width estimate used for the text-measurement-free minimum
/// size heuristic (the real metrics come from the rendering collaborator).
const CHAR_WIDTH: f64 = 7.0;
const TITLE_PADDING: f64 = 40.0;
const ROW_SPACING: f64 = 28.0;
const HEADER_HEIGHT: f64 = 40.0;
const MIN_WIDTH: f64 = 150.0;
const MIN_HEIGHT: f64 = 80.0;

/// A function node: pins, source text, widget host sources, and visual state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub description: String,
    pub position: Position,
    pub size: Size,
    /// The decorated Python function source. Empty for a freshly created,
    /// not-yet-authored node.
    pub code: String,
    /// Widget-construction source, run once per rebuild. Empty if the node
    /// has no embedded widget.
    pub gui_code: String,
    /// Widget get/set/restore handler source. Empty if unused.
    pub gui_get_values_code: String,
    pub gui_state: JsonMap,
    pub colors: NodeColors,
    pub function_name: Option<String>,
    pub inputs: Vec<Pin>,
    pub outputs: Vec<Pin>,
}

impl Node {
    pub fn new(title: impl Into<String>, position: Position) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            position,
            size: Size::new(MIN_WIDTH, MIN_HEIGHT),
            code: String::new(),
            gui_code: String::new(),
            gui_get_values_code: String::new(),
            gui_state: JsonMap::new(),
            colors: NodeColors::default(),
            function_name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn all_pins(&self) -> impl Iterator<Item = &Pin> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.all_pins().find(|p| p.name == name)
    }

    pub fn pin_mut(&mut self, name: &str) -> Option<&mut Pin> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.name == name)
    }

    /// Re-parse `code`, replacing the node's pins with the ones derivable
    /// from the decorated function signature, keeping connections alive for
    /// any pin whose name survives the reparse. Returns the names of pins
    /// that were removed (and whose connections the graph must now drop).
    pub fn apply_code(&mut self, code: impl Into<String>) -> Vec<String> {
        self.code = code.into();

        let Some(parsed) = derive_signature(&self.code) else {
            self.function_name = None;
            let removed: Vec<String> = self.all_pins().map(|p| p.name.clone()).collect();
            self.inputs.clear();
            self.outputs.clear();
            return removed;
        };

        self.function_name = Some(parsed.function_name.clone());

        let new_inputs = self.rebuild_inputs(&parsed);
        let new_outputs = self.rebuild_outputs(&parsed);

        let kept: std::collections::HashSet<&str> = new_inputs
            .iter()
            .chain(new_outputs.iter())
            .map(|p| p.name.as_str())
            .collect();
        let removed: Vec<String> = self
            .all_pins()
            .filter(|p| !kept.contains(p.name.as_str()))
            .map(|p| p.name.clone())
            .collect();

        self.inputs = new_inputs;
        self.outputs = new_outputs;
        removed
    }

    fn rebuild_inputs(&self, parsed: &ParsedSignature) -> Vec<Pin> {
        let mut inputs = Vec::new();
        if parsed.has_exec_in {
            inputs.push(self.reuse_or_create("exec_in", PinDirection::Input, true, ""));
        }
        for param in &parsed.inputs {
            inputs.push(self.reuse_or_create(&param.name, PinDirection::Input, false, &param.type_name));
        }
        inputs
    }

    fn rebuild_outputs(&self, parsed: &ParsedSignature) -> Vec<Pin> {
        let mut outputs = Vec::new();
        for out in &parsed.outputs {
            outputs.push(self.reuse_or_create(&out.name, PinDirection::Output, false, &out.type_name));
        }
        outputs.push(self.reuse_or_create("exec_out", PinDirection::Output, true, ""));
        outputs
    }

    fn reuse_or_create(&self, name: &str, direction: PinDirection, is_exec: bool, type_name: &str) -> Pin {
        if let Some(existing) = self.pin(name) {
            if existing.direction == direction && existing.is_execution() == is_exec {
                let mut reused = existing.clone();
                if !is_exec {
                    reused.type_name = type_name.to_ascii_lowercase();
                }
                return reused;
            }
        }
        if is_exec {
            Pin::execution(name, direction)
        } else {
            Pin::data(name, direction, type_name)
        }
    }

    /// Minimum `(width, height)` derivable without a rendering collaborator:
    /// title width, widest pin label, and an optional widget minimum hint.
    pub fn minimum_size(&self, widget_hint: Option<Size>) -> Size {
        let longest_label = self
            .all_pins()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0) as f64;
        let width_from_labels = longest_label * CHAR_WIDTH + LABEL_PADDING;
        let width_from_title = self.title.len() as f64 * CHAR_WIDTH + TITLE_PADDING;
        let mut width = MIN_WIDTH.max(width_from_labels).max(width_from_title);

        let rows = self.inputs.len().max(self.outputs.len()) as f64;
        let mut height = MIN_HEIGHT.max(rows * ROW_SPACING + HEADER_HEIGHT);

        if let Some(hint) = widget_hint {
            width = width.max(hint.width);
            height = height.max(hint.height + HEADER_HEIGHT);
        }

        Size::new(width, height)
    }

    /// Apply a (possibly user-resized or loaded-from-disk) size, correcting
    /// it up to the minimum. `widget_hint` is `None` until the embedded
    /// widget host has been realized, matching the deferred-validation note
    /// in the component design.
    pub fn apply_size(&mut self, desired: Size, widget_hint: Option<Size>) {
        self.size = desired.clamped_to(self.minimum_size(widget_hint));
    }
}

/// On-disk shape for a node record (§6 of the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub uuid: NodeId,
    pub title: String,
    pub description: String,
    pub pos: (f64, f64),
    pub size: (f64, f64),
    pub code: String,
    pub gui_code: String,
    pub gui_get_values_code: String,
    pub gui_state: JsonMap,
    pub colors: NodeColors,
    #[serde(default)]
    pub is_reroute: bool,
}

impl From<&Node> for NodeRecord {
    fn from(n: &Node) -> Self {
        Self {
            uuid: n.id,
            title: n.title.clone(),
            description: n.description.clone(),
            pos: (n.position.x, n.position.y),
            size: (n.size.width, n.size.height),
            code: n.code.clone(),
            gui_code: n.gui_code.clone(),
            gui_get_values_code: n.gui_get_values_code.clone(),
            gui_state: n.gui_state.clone(),
            colors: n.colors.clone(),
            is_reroute: false,
        }
    }
}

impl NodeRecord {
    pub fn into_node(self) -> Node {
        let mut node = Node {
            id: self.uuid,
            title: self.title,
            description: self.description,
            position: Position::new(self.pos.0, self.pos.1),
            size: Size::new(self.size.0, self.size.1),
            code: String::new(),
            gui_code: self.gui_code,
            gui_get_values_code: self.gui_get_values_code,
            gui_state: self.gui_state,
            colors: self.colors,
            function_name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        node.apply_code(self.code);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code() -> &'static str {
        "@node_entry\ndef add(a: int, b: int) -> int:\n    return a + b\n"
    }

    #[test]
    fn apply_code_derives_pins() {
        let mut node = Node::new("Add", Position::zero());
        let removed = node.apply_code(sample_code());
        assert!(removed.is_empty());
        assert_eq!(node.function_name.as_deref(), Some("add"));
        assert_eq!(node.inputs.len(), 3); // exec_in, a, b
        assert_eq!(node.outputs.len(), 2); // output_1, exec_out
    }

    #[test]
    fn reparse_keeps_matching_pin_connections() {
        let mut node = Node::new("Add", Position::zero());
        node.apply_code(sample_code());
        let conn_id = uuid::Uuid::new_v4();
        node.pin_mut("a").unwrap().add_connection(conn_id);

        let removed = node.apply_code("@node_entry\ndef add(a: int, b: int, c: int) -> int:\n    return a + b + c\n");
        assert!(removed.is_empty());
        assert!(node.pin("a").unwrap().connections.contains(&conn_id));
    }

    #[test]
    fn removing_a_parameter_drops_its_pin() {
        let mut node = Node::new("Add", Position::zero());
        node.apply_code(sample_code());
        let removed = node.apply_code("@node_entry\ndef add(a: int) -> int:\n    return a\n");
        assert!(removed.contains(&"b".to_string()));
    }

    #[test]
    fn malformed_code_clears_all_pins() {
        let mut node = Node::new("Add", Position::zero());
        node.apply_code(sample_code());
        let removed = node.apply_code("not a function at all");
        assert_eq!(removed.len(), 5);
        assert!(node.inputs.is_empty());
        assert!(node.outputs.is_empty());
        assert!(node.function_name.is_none());
    }

    #[test]
    fn undersized_loaded_node_is_corrected() {
        let mut node = Node::new("Add", Position::zero());
        node.apply_code(sample_code());
        node.apply_size(Size::new(1.0, 1.0), None);
        let min = node.minimum_size(None);
        assert!(node.size.width >= min.width);
        assert!(node.size.height >= min.height);
    }

    #[test]
    fn record_round_trip_preserves_fields() {
        let mut node = Node::new("Add", Position::new(10.0, 20.0));
        node.apply_code(sample_code());
        let record: NodeRecord = (&node).into();
        let back = record.into_node();
        assert_eq!(back.title, "Add");
        assert_eq!(back.function_name.as_deref(), Some("add"));
        assert_eq!(back.inputs.len(), node.inputs.len());
    }
}
