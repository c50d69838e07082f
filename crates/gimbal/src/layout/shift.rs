//! Expand one node in place, disturbing only conflicting neighbors.
//!
//! Instead of re-laying out the whole diagram when a node is expanded, this
//! module lays out just the expanding node's children, grows the node around
//! them while keeping its top-left corner fixed, and displaces the sibling
//! roots that geometrically conflict with the growth. Everything else stays
//! exactly where it was.

use indexmap::{IndexMap, IndexSet};
use log::debug;

use gimbal_core::{
    geometry::{Bounds, Insets, Point},
    identifier::Id,
    model::{LayoutEdge, LayoutNode},
};

use crate::{
    config::ShiftPolicy,
    error::LayoutError,
    layout::{
        engines::{EngineRegistry, LayoutConfiguration, SubgraphView},
        preserve::PositionStore,
    },
};

/// Expands `expanded_id` into its children and shifts conflicting siblings.
///
/// The children are arranged by the configured engine in isolation (with an
/// empty expansion set, so nested expansions do not cascade), the parent is
/// resized around their padded bounding box, and every other root node is
/// displaced by the growth deltas when the row/column heuristic says it
/// conflicts. Descendants of other parents are positioned relative to their
/// own parent and move with it automatically.
///
/// All cached edge routes are cleared so the renderer recomputes default
/// paths instead of drawing stale ones.
///
/// # Errors
///
/// Returns [`LayoutError::MissingPreservedState`] when the store holds no
/// entry for `expanded_id` — the orchestrator catches this and falls back to
/// a regular engine pass. Engine failures propagate unmodified.
pub fn apply_neighbor_shift(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    expanded_id: Id,
    store: &PositionStore,
    registry: &EngineRegistry,
    configuration: &LayoutConfiguration,
    policy: &ShiftPolicy,
) -> Result<(Vec<LayoutNode>, Vec<LayoutEdge>), LayoutError> {
    let children: Vec<LayoutNode> = nodes
        .iter()
        .filter(|node| node.parent() == Some(expanded_id))
        .cloned()
        .collect();
    if children.is_empty() {
        return Ok((nodes.to_vec(), edges.to_vec()));
    }

    let entry = store
        .entry(expanded_id)
        .ok_or(LayoutError::MissingPreservedState(expanded_id))?;
    let old_position = entry.position();
    let old_size = entry.size();

    let expanded_kind = nodes
        .iter()
        .find(|node| node.id() == expanded_id)
        .map(|node| node.kind())
        .ok_or_else(|| LayoutError::malformed_node(expanded_id, "expansion target not in view"))?;

    // Arrange only the children and the edges between them.
    let child_ids: IndexSet<Id> = children.iter().map(|child| child.id()).collect();
    let child_edges: Vec<LayoutEdge> = edges
        .iter()
        .filter(|edge| child_ids.contains(&edge.source()) && child_ids.contains(&edge.target()))
        .cloned()
        .collect();

    let engine = registry.get(configuration.engine())?;
    let no_expansions = IndexSet::new();
    let view = SubgraphView::new(
        &children,
        &child_edges,
        configuration.direction(),
        &no_expansions,
    );
    let arrangement = engine
        .layout(&view, configuration.options())
        .map_err(|source| LayoutError::engine(configuration.engine(), source))?;

    let mut child_bounds: IndexMap<Id, Bounds> = IndexMap::with_capacity(children.len());
    for child in &children {
        let bounds = arrangement.node_bounds(child.id()).ok_or_else(|| {
            LayoutError::malformed_node(child.id(), "engine arrangement is missing this node")
        })?;
        child_bounds.insert(child.id(), bounds);
    }

    let mut bounds_iter = child_bounds.values().copied();
    let first = bounds_iter.next().ok_or_else(|| {
        LayoutError::malformed_node(expanded_id, "expansion produced no child bounds")
    })?;
    let bbox = bounds_iter.fold(first, |merged, bounds| merged.merge(&bounds));

    // Grow the parent around the padded child bounding box, floored at both
    // the policy minimum and the node kind's own minimum.
    let grown = bbox
        .to_size()
        .add_padding(Insets::uniform(policy.padding()))
        .max(policy.expanded_min())
        .max(expanded_kind.min_size());
    let delta_w = grown.width() - old_size.width();
    let delta_h = grown.height() - old_size.height();

    debug!(
        node:% = expanded_id,
        children = children.len(),
        delta_w = delta_w,
        delta_h = delta_h;
        "Expanding node in place"
    );

    let old_right = old_position.x() + old_size.width();
    let row_band = old_position.y() + policy.row_band_factor() * old_size.height();
    let new_bottom = old_position.y() + grown.height();

    let mut out_nodes = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut node = node.clone();
        if node.id() == expanded_id {
            // The expanded node keeps its top-left corner and grows.
            node.set_position(old_position);
            node.set_size(grown);
        } else if node.parent() == Some(expanded_id) {
            let bounds = child_bounds[&node.id()];
            let local = Point::new(
                bounds.min_x() - bbox.min_x() + policy.padding(),
                bounds.min_y() - bbox.min_y() + policy.padding(),
            );
            node.set_position(local);
            node.set_size(bounds.to_size());
        } else if node.is_root() {
            let mut position = node.position();
            // Siblings in a lower row move down with the growth.
            if position.y() > row_band {
                position = Point::new(position.x(), position.y() + delta_h);
            }
            // Siblings to the right in the same row band move right.
            let overlaps_row = position.y() < new_bottom
                && position.y() + node.size().height() > old_position.y();
            if position.x() > old_right && overlaps_row {
                position = Point::new(position.x() + delta_w, position.y());
            }
            node.set_position(position);
        }
        out_nodes.push(node);
    }

    let out_edges = edges
        .iter()
        .map(|edge| {
            let mut edge = edge.clone();
            edge.clear_route();
            edge
        })
        .collect();

    Ok((out_nodes, out_edges))
}

#[cfg(test)]
mod tests {
    use gimbal_core::geometry::Size;
    use gimbal_core::model::NodeKind;

    use crate::layout::engines::{
        EngineError, EngineKind, EngineLayout, EngineOptions, LayoutEngine,
    };

    use super::*;

    /// Places nodes left to right at y=0 with a fixed gap, keeping sizes.
    struct RowEngine;

    impl LayoutEngine for RowEngine {
        fn layout(
            &self,
            view: &SubgraphView<'_>,
            options: &EngineOptions,
        ) -> Result<EngineLayout, EngineError> {
            let mut layout = EngineLayout::new();
            let mut x = 0.0;
            for node in view.nodes() {
                layout.place_node(
                    node.id(),
                    Bounds::from_origin(Point::new(x, 0.0), node.size()),
                );
                x += node.size().width() + options.node_spacing();
            }
            Ok(layout)
        }
    }

    fn registry() -> EngineRegistry {
        let mut registry = EngineRegistry::new();
        registry.register(EngineKind::Layered, Box::new(RowEngine));
        registry
    }

    fn sys(id: &str, x: f32, y: f32) -> LayoutNode {
        LayoutNode::new(id.into(), NodeKind::SoftwareSystem).with_position(Point::new(x, y))
    }

    fn container(id: &str, parent: &str) -> LayoutNode {
        LayoutNode::new(id.into(), NodeKind::Container)
            .with_parent(parent.into())
            .with_size(Size::new(220.0, 100.0))
    }

    #[test]
    fn test_expansion_grows_parent_and_contains_children() {
        let mut store = PositionStore::new();
        store.record(&[sys("sys", 0.0, 0.0)]);

        let nodes = vec![sys("sys", 0.0, 0.0), container("web", "sys"), container("db", "sys")];
        let configuration = LayoutConfiguration::default();
        let (out, _) = apply_neighbor_shift(
            &nodes,
            &[],
            Id::new("sys"),
            &store,
            &registry(),
            &configuration,
            &ShiftPolicy::default(),
        )
        .unwrap();

        let parent = out.iter().find(|n| n.id() == Id::new("sys")).unwrap();
        // Children row: 220 + 50 + 220 wide, 100 tall, plus 80 padding per side.
        assert_eq!(parent.position(), Point::new(0.0, 0.0));
        assert_eq!(parent.size(), Size::new(650.0, 260.0));

        let parent_box = parent.bounds();
        for id in ["web", "db"] {
            let child = out.iter().find(|n| n.id() == Id::new(id)).unwrap();
            // Child positions are relative to the parent origin, which sits
            // at the canvas origin here.
            assert!(
                parent_box.contains(&child.bounds()),
                "{id} must lie inside the expanded parent"
            );
        }
    }

    #[test]
    fn test_row_sibling_shifts_right_by_delta_width() {
        let mut store = PositionStore::new();
        store.record(&[sys("sys", 0.0, 0.0), sys("other", 300.0, 0.0)]);

        let nodes = vec![
            sys("sys", 0.0, 0.0),
            sys("other", 300.0, 0.0),
            container("web", "sys"),
            container("db", "sys"),
        ];
        let (out, _) = apply_neighbor_shift(
            &nodes,
            &[],
            Id::new("sys"),
            &store,
            &registry(),
            &LayoutConfiguration::default(),
            &ShiftPolicy::default(),
        )
        .unwrap();

        // New width 650, old width 220, so the row neighbor moves by 430.
        let other = out.iter().find(|n| n.id() == Id::new("other")).unwrap();
        assert_eq!(other.position(), Point::new(730.0, 0.0));
    }

    #[test]
    fn test_lower_row_sibling_shifts_down() {
        let mut store = PositionStore::new();
        store.record(&[sys("sys", 0.0, 0.0), sys("below", 0.0, 400.0)]);

        let nodes = vec![
            sys("sys", 0.0, 0.0),
            sys("below", 0.0, 400.0),
            container("web", "sys"),
        ];
        let (out, _) = apply_neighbor_shift(
            &nodes,
            &[],
            Id::new("sys"),
            &store,
            &registry(),
            &LayoutConfiguration::default(),
            &ShiftPolicy::default(),
        )
        .unwrap();

        // One child: new size 380x260, delta_h = 160. `below` starts past
        // the row band (50), so it moves down; it is left of the old right
        // edge, so it does not move right.
        let below = out.iter().find(|n| n.id() == Id::new("below")).unwrap();
        assert_eq!(below.position(), Point::new(0.0, 560.0));
    }

    #[test]
    fn test_expansion_without_children_is_identity() {
        let store = PositionStore::new();
        let nodes = vec![sys("sys", 0.0, 0.0)];
        let (out, _) = apply_neighbor_shift(
            &nodes,
            &[],
            Id::new("sys"),
            &store,
            &registry(),
            &LayoutConfiguration::default(),
            &ShiftPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, nodes);
    }

    #[test]
    fn test_missing_preserved_state_is_reported() {
        let store = PositionStore::new();
        let nodes = vec![sys("sys", 0.0, 0.0), container("web", "sys")];
        let result = apply_neighbor_shift(
            &nodes,
            &[],
            Id::new("sys"),
            &store,
            &registry(),
            &LayoutConfiguration::default(),
            &ShiftPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(LayoutError::MissingPreservedState(id)) if id == Id::new("sys")
        ));
    }

    #[test]
    fn test_edge_routes_are_invalidated() {
        let mut store = PositionStore::new();
        store.record(&[sys("sys", 0.0, 0.0), sys("other", 900.0, 900.0)]);

        let nodes = vec![
            sys("sys", 0.0, 0.0),
            sys("other", 900.0, 900.0),
            container("web", "sys"),
        ];
        let mut edge = LayoutEdge::new("e1".into(), "sys".into(), "other".into());
        edge.set_route(vec![Point::new(0.0, 0.0), Point::new(900.0, 900.0)], None);

        let (_, out_edges) = apply_neighbor_shift(
            &nodes,
            &[edge],
            Id::new("sys"),
            &store,
            &registry(),
            &LayoutConfiguration::default(),
            &ShiftPolicy::default(),
        )
        .unwrap();
        assert!(out_edges[0].points().is_none());
    }
}
