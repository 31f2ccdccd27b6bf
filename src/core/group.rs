//! # Group
//!
//! A named visual cluster referencing member nodes by id. Groups never hold
//! direct references to their members, so a node can be deleted
//! independently of any group that happens to list it.

use serde::{Deserialize, Serialize};

use super::types::{GroupColors, GroupId, NodeId, Position, Size};

const DEFAULT_PADDING: f64 = 20.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub member_node_ids: Vec<NodeId>,
    pub position: Position,
    pub size: Size,
    pub padding: f64,
    pub is_expanded: bool,
    pub colors: GroupColors,
}

impl Group {
    pub fn new(name: impl Into<String>, member_node_ids: Vec<NodeId>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            member_node_ids,
            position: Position::zero(),
            size: Size::new(200.0, 150.0),
            padding: DEFAULT_PADDING,
            is_expanded: true,
            colors: GroupColors::default(),
        }
    }

    /// Recompute bounds from the positions/sizes of the subset of members
    /// currently resolvable in `positions`, expanded by `padding`. Members
    /// whose id no longer resolves (the node was deleted) are skipped.
    pub fn recalculate_bounds(&mut self, positions: &[(NodeId, Position, Size)]) {
        let members: Vec<&(NodeId, Position, Size)> = positions
            .iter()
            .filter(|(id, _, _)| self.member_node_ids.contains(id))
            .collect();
        if members.is_empty() {
            return;
        }

        let min_x = members.iter().map(|(_, p, _)| p.x).fold(f64::INFINITY, f64::min);
        let min_y = members.iter().map(|(_, p, _)| p.y).fold(f64::INFINITY, f64::min);
        let max_x = members
            .iter()
            .map(|(_, p, s)| p.x + s.width)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_y = members
            .iter()
            .map(|(_, p, s)| p.y + s.height)
            .fold(f64::NEG_INFINITY, f64::max);

        self.position = Position::new(min_x - self.padding, min_y - self.padding);
        self.size = Size::new(max_x - min_x + 2.0 * self.padding, max_y - min_y + 2.0 * self.padding);
    }
}

/// On-disk shape for a group record (§6 of the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub uuid: GroupId,
    pub name: String,
    pub description: String,
    pub member_node_uuids: Vec<NodeId>,
    pub pos: (f64, f64),
    pub size: (f64, f64),
    pub padding: f64,
    pub is_expanded: bool,
    pub colors: GroupColors,
}

impl From<&Group> for GroupRecord {
    fn from(g: &Group) -> Self {
        Self {
            uuid: g.id,
            name: g.name.clone(),
            description: g.description.clone(),
            member_node_uuids: g.member_node_ids.clone(),
            pos: (g.position.x, g.position.y),
            size: (g.size.width, g.size.height),
            padding: g.padding,
            is_expanded: g.is_expanded,
            colors: g.colors.clone(),
        }
    }
}

impl GroupRecord {
    pub fn into_group(self) -> Group {
        Group {
            id: self.uuid,
            name: self.name,
            description: self.description,
            member_node_ids: self.member_node_uuids,
            position: Position::new(self.pos.0, self.pos.1),
            size: Size::new(self.size.0, self.size.1),
            padding: self.padding,
            is_expanded: self.is_expanded,
            colors: self.colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_ignore_dangling_members() {
        let a = uuid::Uuid::new_v4();
        let missing = uuid::Uuid::new_v4();
        let mut group = Group::new("g", vec![a, missing]);
        group.recalculate_bounds(&[(a, Position::new(0.0, 0.0), Size::new(100.0, 50.0))]);
        assert_eq!(group.position, Position::new(-20.0, -20.0));
        assert_eq!(group.size, Size::new(140.0, 90.0));
    }

    #[test]
    fn empty_resolvable_members_keeps_prior_bounds() {
        let missing = uuid::Uuid::new_v4();
        let mut group = Group::new("g", vec![missing]);
        let before = (group.position, group.size);
        group.recalculate_bounds(&[]);
        assert_eq!((group.position, group.size), before);
    }
}
