//! Last-known positions and structure per node.
//!
//! The [`PositionStore`] is the only state that survives between layout
//! requests. It is owned by the orchestrator and written exactly once per
//! request, after a pass commits; everything else reads it. Recording is
//! per-id, so calls with disjoint node sets (after a level navigation, for
//! example) extend the snapshot instead of clobbering it.

use indexmap::{IndexMap, IndexSet};

use gimbal_core::{
    geometry::{Point, Size},
    identifier::Id,
    model::LayoutNode,
};

/// Snapshot of one node as of the last committed pass.
#[derive(Debug, Clone)]
pub struct PreservedEntry {
    position: Point,
    size: Size,
    parent: Option<Id>,
    visible_children: IndexSet<Id>,
}

impl PreservedEntry {
    /// Position at the last commit.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Size at the last commit.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Parent at the last commit.
    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    /// Children that were visible at the last commit.
    pub fn visible_children(&self) -> &IndexSet<Id> {
        &self.visible_children
    }
}

/// Tracks last-known positions and visibility structure per node.
#[derive(Debug, Default)]
pub struct PositionStore {
    entries: IndexMap<Id, PreservedEntry>,
    root_count: usize,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the given nodes, overwriting any prior entries for their
    /// ids. Entries for ids not in `nodes` are kept untouched.
    pub fn record(&mut self, nodes: &[LayoutNode]) {
        let mut children: IndexMap<Id, IndexSet<Id>> = IndexMap::new();
        for node in nodes {
            if let Some(parent) = node.parent() {
                children.entry(parent).or_default().insert(node.id());
            }
        }

        for node in nodes {
            let entry = PreservedEntry {
                position: node.position(),
                size: node.size(),
                parent: node.parent(),
                visible_children: children.get(&node.id()).cloned().unwrap_or_default(),
            };
            self.entries.insert(node.id(), entry);
        }

        self.root_count = nodes.iter().filter(|node| node.is_root()).count();
    }

    /// Preserved position for a node, if one was recorded.
    pub fn position(&self, id: Id) -> Option<Point> {
        self.entries.get(&id).map(|entry| entry.position)
    }

    /// Full preserved entry for a node, if one was recorded.
    pub fn entry(&self, id: Id) -> Option<&PreservedEntry> {
        self.entries.get(&id)
    }

    /// Overwrites the position of every node in `ids` with its preserved
    /// position, where one exists. Returns how many nodes were restored.
    pub fn apply_preserved(&self, nodes: &mut [LayoutNode], ids: &IndexSet<Id>) -> usize {
        let mut restored = 0;
        for node in nodes.iter_mut() {
            if !ids.contains(&node.id()) {
                continue;
            }
            if let Some(position) = self.position(node.id()) {
                node.set_position(position);
                restored += 1;
            }
        }
        restored
    }

    /// Number of root-level nodes at the last commit.
    pub fn previous_root_count(&self) -> usize {
        self.root_count
    }

    /// True until the first commit.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use gimbal_core::model::NodeKind;

    use super::*;

    fn node(id: &str, x: f32, y: f32) -> LayoutNode {
        LayoutNode::new(id.into(), NodeKind::SoftwareSystem).with_position(Point::new(x, y))
    }

    #[test]
    fn test_record_and_query() {
        let mut store = PositionStore::new();
        assert!(store.is_empty());

        store.record(&[node("a", 10.0, 20.0), node("b", 300.0, 20.0)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.position(Id::new("a")), Some(Point::new(10.0, 20.0)));
        assert_eq!(store.position(Id::new("missing")), None);
        assert_eq!(store.previous_root_count(), 2);
    }

    #[test]
    fn test_record_overwrites_only_given_ids() {
        let mut store = PositionStore::new();
        store.record(&[node("a", 0.0, 0.0), node("b", 100.0, 0.0)]);

        // A later pass over a disjoint view keeps the old entries intact.
        store.record(&[node("c", 500.0, 0.0)]);
        assert_eq!(store.position(Id::new("a")), Some(Point::new(0.0, 0.0)));
        assert_eq!(store.position(Id::new("c")), Some(Point::new(500.0, 0.0)));
        assert_eq!(store.previous_root_count(), 1);
    }

    #[test]
    fn test_child_visibility_snapshot() {
        let mut store = PositionStore::new();
        let parent = node("sys", 0.0, 0.0);
        let child = LayoutNode::new("web".into(), NodeKind::Container).with_parent("sys".into());
        store.record(&[parent, child]);

        let entry = store.entry(Id::new("sys")).unwrap();
        assert!(entry.visible_children().contains(&Id::new("web")));
        let child_entry = store.entry(Id::new("web")).unwrap();
        assert_eq!(child_entry.parent(), Some(Id::new("sys")));
        assert!(child_entry.visible_children().is_empty());
    }

    #[test]
    fn test_apply_preserved_restores_positions() {
        let mut store = PositionStore::new();
        store.record(&[node("a", 10.0, 10.0), node("b", 200.0, 10.0)]);

        let mut nodes = vec![node("a", 999.0, 999.0), node("b", 200.0, 10.0)];
        let ids: IndexSet<Id> = [Id::new("a")].into_iter().collect();
        let restored = store.apply_preserved(&mut nodes, &ids);

        assert_eq!(restored, 1);
        assert_eq!(nodes[0].position(), Point::new(10.0, 10.0));
        assert_eq!(nodes[1].position(), Point::new(200.0, 10.0));
    }

    #[test]
    fn test_apply_preserved_skips_unknown_ids() {
        let store = PositionStore::new();
        let mut nodes = vec![node("a", 5.0, 5.0)];
        let ids: IndexSet<Id> = [Id::new("a")].into_iter().collect();
        assert_eq!(store.apply_preserved(&mut nodes, &ids), 0);
        assert_eq!(nodes[0].position(), Point::new(5.0, 5.0));
    }
}
