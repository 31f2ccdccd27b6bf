//! Group-lifecycle commands.

use std::any::Any;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::core::{Graph, GroupColors, GroupId, NodeId, Position, Size};

use super::base::Command;

/// `GroupPropertyChange`s on the same group within this window merge.
const PROPERTY_MERGE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct CreateGroupCommand {
    timestamp: Instant,
    name: String,
    member_node_ids: Vec<NodeId>,
    created_id: Option<GroupId>,
}

impl CreateGroupCommand {
    pub fn new(name: impl Into<String>, member_node_ids: Vec<NodeId>) -> Self {
        Self {
            timestamp: Instant::now(),
            name: name.into(),
            member_node_ids,
            created_id: None,
        }
    }
}

impl Command for CreateGroupCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        let id = graph.create_group(self.name.clone(), self.member_node_ids.clone());
        graph.recalculate_group_bounds();
        self.created_id = Some(id);
        true
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        match self.created_id.take() {
            Some(id) => graph.delete_group(id).is_some(),
            None => false,
        }
    }

    fn description(&self) -> String {
        format!("Create group '{}'", self.name)
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Preserves the group's full state (membership, bounds, colors,
/// expansion) so undo restores it byte-for-byte rather than re-deriving it.
#[derive(Debug)]
pub struct DeleteGroupCommand {
    timestamp: Instant,
    group_id: GroupId,
    snapshot: Option<GroupSnapshot>,
}

#[derive(Debug, Clone)]
struct GroupSnapshot {
    name: String,
    description: String,
    member_node_ids: Vec<NodeId>,
    position: Position,
    size: Size,
    padding: f64,
    is_expanded: bool,
    colors: GroupColors,
}

impl DeleteGroupCommand {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            timestamp: Instant::now(),
            group_id,
            snapshot: None,
        }
    }
}

impl Command for DeleteGroupCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        let Some(group) = graph.groups.get(&self.group_id) else {
            return false;
        };
        self.snapshot = Some(GroupSnapshot {
            name: group.name.clone(),
            description: group.description.clone(),
            member_node_ids: group.member_node_ids.clone(),
            position: group.position,
            size: group.size,
            padding: group.padding,
            is_expanded: group.is_expanded,
            colors: group.colors.clone(),
        });
        graph.delete_group(self.group_id).is_some()
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        let Some(snapshot) = self.snapshot.take() else {
            return false;
        };
        use crate::core::Group;
        let mut group = Group::new(snapshot.name, snapshot.member_node_ids);
        group.id = self.group_id;
        group.description = snapshot.description;
        group.position = snapshot.position;
        group.size = snapshot.size;
        group.padding = snapshot.padding;
        group.is_expanded = snapshot.is_expanded;
        group.colors = snapshot.colors;
        graph.groups.insert(self.group_id, group);
        true
    }

    fn description(&self) -> String {
        "Delete group".to_string()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct ResizeGroupCommand {
    timestamp: Instant,
    group_id: GroupId,
    old_bounds: (Position, Size),
    new_bounds: (Position, Size),
}

impl ResizeGroupCommand {
    pub fn new(group_id: GroupId, old_bounds: (Position, Size), new_bounds: (Position, Size)) -> Self {
        Self {
            timestamp: Instant::now(),
            group_id,
            old_bounds,
            new_bounds,
        }
    }
}

impl Command for ResizeGroupCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        graph.resize_group(self.group_id, self.new_bounds.0, self.new_bounds.1).is_ok()
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        graph.resize_group(self.group_id, self.old_bounds.0, self.old_bounds.1).is_ok()
    }

    fn description(&self) -> String {
        "Resize group".to_string()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A keyed batch of property edits (color swatches, padding, name, ...)
/// applied to a group's `gui_state`-equivalent fields. Adjacent changes to
/// the same group within [`PROPERTY_MERGE_WINDOW`] merge: a key touched by
/// only the later command borrows its pre-image from that command's own
/// recorded old value, since the earlier command never touched it.
#[derive(Debug)]
pub struct GroupPropertyChangeCommand {
    timestamp: Instant,
    group_id: GroupId,
    old_values: HashMap<String, Value>,
    new_values: HashMap<String, Value>,
}

impl GroupPropertyChangeCommand {
    pub fn new(group_id: GroupId, old_values: HashMap<String, Value>, new_values: HashMap<String, Value>) -> Self {
        Self {
            timestamp: Instant::now(),
            group_id,
            old_values,
            new_values,
        }
    }

    fn apply(&self, graph: &mut Graph, values: &HashMap<String, Value>) -> bool {
        let Some(group) = graph.groups.get_mut(&self.group_id) else {
            return false;
        };
        for (key, value) in values {
            match key.as_str() {
                "name" => {
                    if let Some(s) = value.as_str() {
                        group.name = s.to_string();
                    }
                }
                "description" => {
                    if let Some(s) = value.as_str() {
                        group.description = s.to_string();
                    }
                }
                "padding" => {
                    if let Some(p) = value.as_f64() {
                        group.padding = p;
                    }
                }
                "is_expanded" => {
                    if let Some(b) = value.as_bool() {
                        group.is_expanded = b;
                    }
                }
                "background" => set_color(&mut group.colors.background, value),
                "border" => set_color(&mut group.colors.border, value),
                "title_bg" => set_color(&mut group.colors.title_bg, value),
                "title_text" => set_color(&mut group.colors.title_text, value),
                "selection" => set_color(&mut group.colors.selection, value),
                _ => {}
            }
        }
        true
    }
}

fn set_color(field: &mut String, value: &Value) {
    if let Some(s) = value.as_str() {
        *field = s.to_string();
    }
}

impl Command for GroupPropertyChangeCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        let values = self.new_values.clone();
        self.apply(graph, &values)
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        let values = self.old_values.clone();
        self.apply(graph, &values)
    }

    fn description(&self) -> String {
        "Change group properties".to_string()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn can_merge_with(&self, previous: &dyn Command) -> bool {
        match previous.as_any().downcast_ref::<GroupPropertyChangeCommand>() {
            Some(prev) => {
                prev.group_id == self.group_id
                    && self.timestamp.saturating_duration_since(prev.timestamp) < PROPERTY_MERGE_WINDOW
            }
            None => false,
        }
    }

    fn merge(&mut self, previous: &dyn Command) {
        let Some(prev) = previous.as_any().downcast_ref::<GroupPropertyChangeCommand>() else {
            return;
        };
        for (key, old_value) in &prev.old_values {
            self.old_values.entry(key.clone()).or_insert_with(|| old_value.clone());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_then_undo_removes_group() {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        let mut cmd = CreateGroupCommand::new("grp", vec![a]);
        assert!(cmd.execute(&mut graph));
        let id = cmd.created_id.unwrap();
        assert!(graph.groups.contains_key(&id));
        assert!(cmd.undo(&mut graph));
        assert!(graph.groups.is_empty());
    }

    #[test]
    fn delete_then_undo_restores_full_state() {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        let id = graph.create_group("grp", vec![a]);
        graph.groups.get_mut(&id).unwrap().padding = 42.0;

        let mut cmd = DeleteGroupCommand::new(id);
        assert!(cmd.execute(&mut graph));
        assert!(graph.groups.is_empty());
        assert!(cmd.undo(&mut graph));
        assert_eq!(graph.groups[&id].padding, 42.0);
        assert_eq!(graph.groups[&id].name, "grp");
    }

    #[test]
    fn property_merge_preserves_earliest_old_value_for_shared_key() {
        let group_id = uuid::Uuid::new_v4();
        let first = GroupPropertyChangeCommand::new(
            group_id,
            HashMap::from([("padding".to_string(), json!(20.0))]),
            HashMap::from([("padding".to_string(), json!(30.0))]),
        );
        let mut second = GroupPropertyChangeCommand::new(
            group_id,
            HashMap::from([("padding".to_string(), json!(30.0))]),
            HashMap::from([("padding".to_string(), json!(40.0))]),
        );
        assert!(second.can_merge_with(&first));
        second.merge(&first);
        assert_eq!(second.old_values["padding"], json!(20.0));
    }

    #[test]
    fn property_merge_borrows_new_keys_from_later_command() {
        let group_id = uuid::Uuid::new_v4();
        let first = GroupPropertyChangeCommand::new(
            group_id,
            HashMap::from([("padding".to_string(), json!(20.0))]),
            HashMap::from([("padding".to_string(), json!(30.0))]),
        );
        let mut second = GroupPropertyChangeCommand::new(
            group_id,
            HashMap::from([("name".to_string(), json!("old-name"))]),
            HashMap::from([("name".to_string(), json!("new-name"))]),
        );
        second.merge(&first);
        assert_eq!(second.old_values["name"], json!("old-name"));
        assert!(!second.old_values.contains_key("padding"));
    }
}
