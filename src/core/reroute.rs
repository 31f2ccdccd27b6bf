//! # RerouteNode
//!
//! A degenerate node with a single data input and a single data output,
//! used purely to keep wires tidy. It adopts the type of whatever feeds
//! its input and never invokes user code.

use serde::{Deserialize, Serialize};

use super::pin::{Pin, ANY_TYPE};
use super::types::{NodeId, PinDirection, Position};

pub const REROUTE_INPUT: &str = "in";
pub const REROUTE_OUTPUT: &str = "out";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerouteNode {
    pub id: NodeId,
    pub position: Position,
    pub input: Pin,
    pub output: Pin,
}

impl RerouteNode {
    pub fn new(position: Position) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            position,
            input: Pin::data(REROUTE_INPUT, PinDirection::Input, ANY_TYPE),
            output: Pin::data(REROUTE_OUTPUT, PinDirection::Output, ANY_TYPE),
        }
    }

    pub fn pin(&self, name: &str) -> Option<&Pin> {
        if self.input.name == name {
            Some(&self.input)
        } else if self.output.name == name {
            Some(&self.output)
        } else {
            None
        }
    }

    pub fn pin_mut(&mut self, name: &str) -> Option<&mut Pin> {
        if self.input.name == name {
            Some(&mut self.input)
        } else if self.output.name == name {
            Some(&mut self.output)
        } else {
            None
        }
    }

    /// Adopt `source`'s type for the output pin. Called whenever the
    /// reroute's input connection list changes.
    pub fn adopt_type(&mut self, source: Option<&Pin>) {
        self.output.type_name = source.map(|p| p.type_name.clone()).unwrap_or_else(|| ANY_TYPE.to_string());
    }
}

/// On-disk shape for a reroute record (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerouteRecord {
    pub uuid: NodeId,
    pub pos: (f64, f64),
    pub is_reroute: bool,
}

impl From<&RerouteNode> for RerouteRecord {
    fn from(r: &RerouteNode) -> Self {
        Self {
            uuid: r.id,
            pos: (r.position.x, r.position.y),
            is_reroute: true,
        }
    }
}

impl RerouteRecord {
    pub fn into_reroute(self) -> RerouteNode {
        let mut node = RerouteNode::new(Position::new(self.pos.0, self.pos.1));
        node.id = self.uuid;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_any() {
        let reroute = RerouteNode::new(Position::zero());
        assert_eq!(reroute.output.type_name, ANY_TYPE);
    }

    #[test]
    fn adopts_connected_source_type() {
        let mut reroute = RerouteNode::new(Position::zero());
        let source = Pin::data("result", PinDirection::Output, "int");
        reroute.adopt_type(Some(&source));
        assert_eq!(reroute.output.type_name, "int");
        assert_eq!(reroute.output.color(), source.color());
    }

    #[test]
    fn disconnecting_reverts_to_any() {
        let mut reroute = RerouteNode::new(Position::zero());
        let source = Pin::data("result", PinDirection::Output, "int");
        reroute.adopt_type(Some(&source));
        reroute.adopt_type(None);
        assert_eq!(reroute.output.type_name, ANY_TYPE);
    }
}
