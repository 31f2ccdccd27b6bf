//! # Type System
//!
//! Primitive value types shared by every node: ids, geometry, colors, and
//! the pin-direction/category enums.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a node (function node or reroute node).
pub type NodeId = Uuid;

/// Stable identifier for a connection.
pub type ConnectionId = Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// A pin's direction relative to its owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    Input,
    Output,
}

/// What a pin conveys: a value, or control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinCategory {
    Data,
    Execution,
}

/// 2D position in visual editor space.
///
/// # Example
///
/// ```
/// use pyflowgraph::Position;
///
/// let pos = Position::new(100.0, 200.0);
/// assert_eq!(pos.x, 100.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Position {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

/// Width/height in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp both dimensions up to at least `minimum`, component-wise.
    /// Used to silently correct under-sized saved nodes on load.
    pub fn clamped_to(&self, minimum: Size) -> Size {
        Size::new(self.width.max(minimum.width), self.height.max(minimum.height))
    }
}

/// An `#RRGGBB` color string, kept as text end-to-end since every consumer
/// (serialization, a rendering collaborator) wants text, not a packed value.
pub type ColorHex = String;

/// Per-node color overrides, stored alongside the node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeColors {
    pub title: ColorHex,
    pub body: ColorHex,
}

impl Default for NodeColors {
    fn default() -> Self {
        Self {
            title: "#3C3C3C".to_string(),
            body: "#2B2B2B".to_string(),
        }
    }
}

/// Per-group color overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupColors {
    pub background: ColorHex,
    pub border: ColorHex,
    pub title_bg: ColorHex,
    pub title_text: ColorHex,
    pub selection: ColorHex,
}

impl Default for GroupColors {
    fn default() -> Self {
        Self {
            background: "#2D2D30".to_string(),
            border: "#4A4A4E".to_string(),
            title_bg: "#3C3C40".to_string(),
            title_text: "#E8E8E8".to_string(),
            selection: "#5A8FDC".to_string(),
        }
    }
}

/// Arbitrary serializable state, used for `gui_state` and the live
/// executor's free-form "graph state" map.
pub type JsonMap = HashMap<String, serde_json::Value>;
