//! Classifies the transition between two visible diagram states.
//!
//! Given the nodes of the next view and the previous snapshot in the
//! [`PositionStore`], every node id lands in exactly one of three buckets:
//! stable (visible before and after, same parent, same visible children),
//! changed (visible before and after, structure differs), or newly visible.
//! The detector also decides whether the transition is a major structural
//! change, which makes the orchestrator skip incremental strategies
//! entirely.

use indexmap::{IndexMap, IndexSet};
use log::trace;

use gimbal_core::{identifier::Id, model::LayoutNode};

use crate::{config::LayoutPolicy, layout::preserve::PositionStore};

/// The classification of one visible-state transition.
///
/// `stable`, `changed` and `newly_visible` partition the ids of the next
/// view's nodes.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    stable: IndexSet<Id>,
    changed: IndexSet<Id>,
    newly_visible: IndexSet<Id>,
    newly_expanded: Vec<Id>,
    major_structural_change: bool,
}

impl ChangeSet {
    /// Ids visible before and after with unchanged structure.
    pub fn stable(&self) -> &IndexSet<Id> {
        &self.stable
    }

    /// Ids visible before and after whose parent or visible-child set
    /// changed.
    pub fn changed(&self) -> &IndexSet<Id> {
        &self.changed
    }

    /// Ids visible now that were not visible before.
    pub fn newly_visible(&self) -> &IndexSet<Id> {
        &self.newly_visible
    }

    /// Ids that transitioned from collapsed to expanded, in input order.
    pub fn newly_expanded(&self) -> &[Id] {
        &self.newly_expanded
    }

    /// True when the transition is too large for incremental strategies.
    pub fn major_structural_change(&self) -> bool {
        self.major_structural_change
    }

    /// True when nothing structural happened and positions can simply be
    /// preserved.
    pub fn is_noop(&self) -> bool {
        !self.major_structural_change && self.changed.is_empty() && self.newly_visible.is_empty()
    }
}

/// Classifies the next view's nodes against the previous snapshot.
///
/// A node is newly visible when the store has no entry for it, stable when
/// its parent and visible-child set match the snapshot, and changed
/// otherwise. The transition is a major structural change when the
/// root-node count differs from the previous pass, or when newly visible
/// nodes exceed the policy's share of the current total.
pub fn detect_changes(
    nodes: &[LayoutNode],
    previous: &PositionStore,
    policy: &LayoutPolicy,
) -> ChangeSet {
    let mut visible_children: IndexMap<Id, IndexSet<Id>> = IndexMap::new();
    for node in nodes {
        if let Some(parent) = node.parent() {
            visible_children
                .entry(parent)
                .or_default()
                .insert(node.id());
        }
    }

    let mut changes = ChangeSet::default();
    for node in nodes {
        let Some(entry) = previous.entry(node.id()) else {
            changes.newly_visible.insert(node.id());
            continue;
        };

        let current_children = visible_children
            .get(&node.id())
            .cloned()
            .unwrap_or_default();

        if entry.parent() == node.parent() && *entry.visible_children() == current_children {
            changes.stable.insert(node.id());
        } else {
            changes.changed.insert(node.id());
        }

        if entry.visible_children().is_empty() && !current_children.is_empty() {
            changes.newly_expanded.push(node.id());
        }
    }

    let root_count = nodes.iter().filter(|node| node.is_root()).count();
    let total = nodes.len();
    let too_many_new =
        total > 0 && changes.newly_visible.len() as f32 > policy.new_node_ratio() * total as f32;
    changes.major_structural_change = root_count != previous.previous_root_count() || too_many_new;

    trace!(
        stable = changes.stable.len(),
        changed = changes.changed.len(),
        newly_visible = changes.newly_visible.len(),
        newly_expanded = changes.newly_expanded.len(),
        major = changes.major_structural_change;
        "Detected changes"
    );

    changes
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use gimbal_core::{geometry::Point, model::NodeKind};

    use super::*;

    fn root(id: &str) -> LayoutNode {
        LayoutNode::new(id.into(), NodeKind::SoftwareSystem)
    }

    fn child(id: &str, parent: &str) -> LayoutNode {
        LayoutNode::new(id.into(), NodeKind::Container).with_parent(parent.into())
    }

    #[test]
    fn test_everything_new_on_empty_store() {
        let store = PositionStore::new();
        let nodes = vec![root("a"), root("b")];
        let changes = detect_changes(&nodes, &store, &LayoutPolicy::default());

        assert_eq!(changes.newly_visible().len(), 2);
        assert!(changes.stable().is_empty());
        // Root count went from 0 to 2.
        assert!(changes.major_structural_change());
    }

    #[test]
    fn test_unchanged_view_is_stable_noop() {
        let mut store = PositionStore::new();
        let nodes = vec![root("a"), root("b")];
        store.record(&nodes);

        let changes = detect_changes(&nodes, &store, &LayoutPolicy::default());
        assert!(changes.is_noop());
        assert_eq!(changes.stable().len(), 2);
        assert!(changes.newly_expanded().is_empty());
    }

    #[test]
    fn test_expansion_marks_parent_changed_and_expanded() {
        let mut store = PositionStore::new();
        store.record(&[root("sys"), root("other")]);

        let nodes = vec![
            root("sys"),
            root("other"),
            child("web", "sys"),
            child("db", "sys"),
        ];
        let changes = detect_changes(&nodes, &store, &LayoutPolicy::default());

        assert!(changes.changed().contains(&Id::new("sys")));
        assert!(changes.stable().contains(&Id::new("other")));
        assert_eq!(changes.newly_visible().len(), 2);
        assert_eq!(changes.newly_expanded(), &[Id::new("sys")]);
        // Root count unchanged and 2 of 4 nodes are new, under the 60% bar.
        assert!(!changes.major_structural_change());
    }

    #[test]
    fn test_reparented_node_is_changed() {
        let mut store = PositionStore::new();
        store.record(&[
            root("a"),
            root("b"),
            child("x", "a"),
            LayoutNode::new("pad1".into(), NodeKind::Person),
        ]);

        // `x` moves from parent `a` to parent `b`; `a` and `b` both lose or
        // gain a visible child, so all three are changed.
        let nodes = vec![
            root("a"),
            root("b"),
            child("x", "b"),
            LayoutNode::new("pad1".into(), NodeKind::Person),
        ];
        let changes = detect_changes(&nodes, &store, &LayoutPolicy::default());

        assert!(changes.changed().contains(&Id::new("x")));
        assert!(changes.changed().contains(&Id::new("a")));
        assert!(changes.changed().contains(&Id::new("b")));
        assert!(changes.stable().contains(&Id::new("pad1")));
    }

    #[test]
    fn test_root_count_change_is_major() {
        let mut store = PositionStore::new();
        store.record(&[root("a"), root("b")]);

        let changes = detect_changes(&[root("a")], &store, &LayoutPolicy::default());
        assert!(changes.major_structural_change());
    }

    #[test]
    fn test_new_node_ratio_boundary() {
        let mut store = PositionStore::new();
        store.record(&[root("a"), root("b")]);

        // 3 of 5 nodes new = 60% exactly: not major (strictly greater).
        let at_bar = vec![
            root("a"),
            root("b"),
            LayoutNode::new("n1".into(), NodeKind::Person).with_parent("a".into()),
            LayoutNode::new("n2".into(), NodeKind::Person).with_parent("a".into()),
            LayoutNode::new("n3".into(), NodeKind::Person).with_parent("a".into()),
        ];
        let changes = detect_changes(&at_bar, &store, &LayoutPolicy::default());
        assert!(!changes.major_structural_change());

        // 4 of 6 nodes new = 66%: major.
        let mut over_bar = at_bar;
        over_bar.push(LayoutNode::new("n4".into(), NodeKind::Person).with_parent("b".into()));
        let changes = detect_changes(&over_bar, &store, &LayoutPolicy::default());
        assert!(changes.major_structural_change());
    }

    proptest! {
        /// The three buckets partition the input ids: every node lands in
        /// exactly one.
        #[test]
        fn buckets_partition_node_ids(recorded in 0usize..8, extra in 0usize..8) {
            let mut store = PositionStore::new();
            let previous: Vec<LayoutNode> = (0..recorded)
                .map(|i| root(&format!("node{i}")).with_position(Point::new(i as f32 * 10.0, 0.0)))
                .collect();
            store.record(&previous);

            let nodes: Vec<LayoutNode> = (0..recorded + extra)
                .map(|i| root(&format!("node{i}")))
                .collect();
            let changes = detect_changes(&nodes, &store, &LayoutPolicy::default());

            let mut covered = 0;
            for node in &nodes {
                let in_stable = changes.stable().contains(&node.id()) as usize;
                let in_changed = changes.changed().contains(&node.id()) as usize;
                let in_new = changes.newly_visible().contains(&node.id()) as usize;
                prop_assert_eq!(in_stable + in_changed + in_new, 1);
                covered += 1;
            }
            prop_assert_eq!(
                covered,
                changes.stable().len() + changes.changed().len() + changes.newly_visible().len()
            );
        }
    }
}
