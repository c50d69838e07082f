//! The strategy decision procedure.
//!
//! [`IncrementalLayouter::apply`] is evaluated in order:
//!
//! 1. Nothing structural changed → reapply preserved positions, no engine
//!    call.
//! 2. Major structural change → full engine pass over the whole graph.
//! 3. A small number of nodes newly expanded → neighbor shifting, processed
//!    as an explicit work queue so several simultaneous expansions apply in
//!    a deterministic order.
//! 4. Otherwise → engine pass over the affected subgraph when it is small
//!    enough, over the full graph when it is not.
//!
//! After an engine pass (but not after neighbor shifting, whose whole point
//! is deliberate displacement), stable root nodes that drifted further than
//! the movement threshold are pinned back to their preserved positions. The
//! store is committed only once the pass has succeeded, so two back-to-back
//! requests observe consistent previous state.

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, trace};

use gimbal_core::{
    geometry::Point,
    identifier::Id,
    model::{LayoutEdge, LayoutNode},
};

use crate::{
    config::LayoutPolicy,
    error::LayoutError,
    layout::{
        changes::{ChangeSet, detect_changes},
        engines::{
            ConfigSelector, EngineLayout, EngineRegistry, LayoutConfiguration, RoutedEdge,
            SelectionContext, SubgraphView, ViewLevel,
        },
        preserve::PositionStore,
        shift::apply_neighbor_shift,
    },
};

/// One layout request: the nodes and edges of the target view plus the
/// selector inputs.
///
/// The request's nodes are the visible nodes of the view; children of
/// collapsed nodes are simply absent.
#[derive(Debug, Clone)]
pub struct LayoutRequest {
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    expanded: IndexSet<Id>,
    level: ViewLevel,
    focus_system: Option<Id>,
    focus_container: Option<Id>,
}

impl LayoutRequest {
    pub fn new(nodes: Vec<LayoutNode>, edges: Vec<LayoutEdge>) -> Self {
        Self {
            nodes,
            edges,
            expanded: IndexSet::new(),
            level: ViewLevel::default(),
            focus_system: None,
            focus_container: None,
        }
    }

    /// Marks which nodes are expanded in this view, consuming and returning
    /// the request.
    pub fn with_expanded(mut self, expanded: IndexSet<Id>) -> Self {
        self.expanded = expanded;
        self
    }

    /// Sets the abstraction level, consuming and returning the request.
    pub fn with_level(mut self, level: ViewLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the focused system, consuming and returning the request.
    pub fn with_focus_system(mut self, id: Id) -> Self {
        self.focus_system = Some(id);
        self
    }

    /// Sets the focused container, consuming and returning the request.
    pub fn with_focus_container(mut self, id: Id) -> Self {
        self.focus_container = Some(id);
        self
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    pub fn expanded(&self) -> &IndexSet<Id> {
        &self.expanded
    }

    pub fn level(&self) -> ViewLevel {
        self.level
    }

    fn selection_context(&self) -> SelectionContext<'_> {
        SelectionContext::new(
            &self.nodes,
            &self.edges,
            self.level,
            self.focus_system,
            self.focus_container,
            &self.expanded,
        )
    }
}

/// Which path the orchestrator actually took for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Positions reapplied from the store; no engine call.
    Preserve,
    /// Full engine pass over the whole graph.
    Full,
    /// One or more expand-in-place operations.
    NeighborShift,
    /// Engine pass over the affected subgraph only.
    Partial,
}

/// The committed result of a layout request.
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    strategy: Strategy,
}

impl LayoutOutcome {
    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    /// The path the orchestrator took.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Consumes the outcome, returning the positioned nodes and edges.
    pub fn into_parts(self) -> (Vec<LayoutNode>, Vec<LayoutEdge>) {
        (self.nodes, self.edges)
    }
}

/// The incremental layout orchestrator.
///
/// Owns the [`PositionStore`]; the `&mut self` entry point is the
/// serialization contract — two passes can never run concurrently against
/// the same store.
#[derive(Debug)]
pub struct IncrementalLayouter {
    policy: LayoutPolicy,
    store: PositionStore,
}

impl IncrementalLayouter {
    pub fn new(policy: LayoutPolicy) -> Self {
        Self {
            policy,
            store: PositionStore::new(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &LayoutPolicy {
        &self.policy
    }

    /// Read access to the preservation store.
    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    /// Applies the cheapest suitable layout strategy to the request.
    ///
    /// # Errors
    ///
    /// Engine invocation failures and unregistered engine kinds propagate
    /// unmodified; there is no internal retry. A missing preserved position
    /// during neighbor shifting is absorbed by falling back to a regular
    /// engine pass.
    pub fn apply(
        &mut self,
        request: &LayoutRequest,
        registry: &EngineRegistry,
        selector: &dyn ConfigSelector,
    ) -> Result<LayoutOutcome, LayoutError> {
        let changes = detect_changes(request.nodes(), &self.store, &self.policy);
        info!(
            stable = changes.stable().len(),
            changed = changes.changed().len(),
            newly_visible = changes.newly_visible().len(),
            major = changes.major_structural_change();
            "Classified layout transition"
        );

        if changes.is_noop() {
            let mut nodes = request.nodes().to_vec();
            let restored = self.store.apply_preserved(&mut nodes, changes.stable());
            debug!(restored = restored; "No structural change; reusing preserved positions");
            let outcome = LayoutOutcome {
                nodes,
                edges: request.edges().to_vec(),
                strategy: Strategy::Preserve,
            };
            self.store.record(outcome.nodes());
            return Ok(outcome);
        }

        let configuration = selector.select(&request.selection_context());
        debug!(configuration = configuration.label(); "Selected layout configuration");

        let expansions = changes.newly_expanded().len();
        let outcome = if changes.major_structural_change() {
            self.full_pass(request, registry, &configuration, &changes)?
        } else if expansions >= 1 && expansions <= self.policy.expansion_cutoff() {
            match self.shift_pass(request, registry, &configuration, &changes) {
                Ok(outcome) => outcome,
                Err(LayoutError::MissingPreservedState(id)) => {
                    debug!(node:% = id; "Neighbor shift unavailable; using engine pass instead");
                    self.default_pass(request, registry, &configuration, &changes)?
                }
                Err(other) => return Err(other),
            }
        } else {
            self.default_pass(request, registry, &configuration, &changes)?
        };

        self.store.record(outcome.nodes());
        Ok(outcome)
    }

    /// Full engine pass over the whole graph.
    fn full_pass(
        &self,
        request: &LayoutRequest,
        registry: &EngineRegistry,
        configuration: &LayoutConfiguration,
        changes: &ChangeSet,
    ) -> Result<LayoutOutcome, LayoutError> {
        let engine = registry.get(configuration.engine())?;
        let view = SubgraphView::new(
            request.nodes(),
            request.edges(),
            configuration.direction(),
            request.expanded(),
        );
        let layout = engine
            .layout(&view, configuration.options())
            .map_err(|source| LayoutError::engine(configuration.engine(), source))?;

        let (mut nodes, edges) = merge_engine_layout(request.nodes(), request.edges(), &layout);
        self.clamp_stable_roots(&mut nodes, changes);
        Ok(LayoutOutcome {
            nodes,
            edges,
            strategy: Strategy::Full,
        })
    }

    /// Applies every pending expansion in input order against the running
    /// state.
    fn shift_pass(
        &self,
        request: &LayoutRequest,
        registry: &EngineRegistry,
        configuration: &LayoutConfiguration,
        changes: &ChangeSet,
    ) -> Result<LayoutOutcome, LayoutError> {
        let mut nodes = request.nodes().to_vec();
        let mut edges = request.edges().to_vec();
        for &expanded_id in changes.newly_expanded() {
            let (next_nodes, next_edges) = apply_neighbor_shift(
                &nodes,
                &edges,
                expanded_id,
                &self.store,
                registry,
                configuration,
                self.policy.shift(),
            )?;
            nodes = next_nodes;
            edges = next_edges;
        }
        Ok(LayoutOutcome {
            nodes,
            edges,
            strategy: Strategy::NeighborShift,
        })
    }

    /// Engine pass over the affected subgraph when it is small enough,
    /// otherwise over the full graph.
    fn default_pass(
        &self,
        request: &LayoutRequest,
        registry: &EngineRegistry,
        configuration: &LayoutConfiguration,
        changes: &ChangeSet,
    ) -> Result<LayoutOutcome, LayoutError> {
        let total = request.nodes().len();
        let mut affected: IndexSet<Id> = changes
            .changed()
            .iter()
            .chain(changes.newly_visible().iter())
            .copied()
            .collect();
        // Parents join the subgraph so children are arranged within their
        // real containers.
        for node in request.nodes() {
            if affected.contains(&node.id()) {
                if let Some(parent) = node.parent() {
                    affected.insert(parent);
                }
            }
        }

        let partial_feasible =
            total > 0 && (affected.len() as f32) < self.policy.partial_ratio() * total as f32;
        if !partial_feasible {
            debug!(
                affected = affected.len(),
                total = total;
                "Affected subgraph too large; using full pass"
            );
            return self.full_pass(request, registry, configuration, changes);
        }

        let subgraph: Vec<LayoutNode> = request
            .nodes()
            .iter()
            .filter(|node| affected.contains(&node.id()))
            .cloned()
            .collect();
        let sub_edges: Vec<LayoutEdge> = request
            .edges()
            .iter()
            .filter(|edge| affected.contains(&edge.source()) && affected.contains(&edge.target()))
            .cloned()
            .collect();

        let engine = registry.get(configuration.engine())?;
        let view = SubgraphView::new(
            &subgraph,
            &sub_edges,
            configuration.direction(),
            request.expanded(),
        );
        let mut layout = engine
            .layout(&view, configuration.options())
            .map_err(|source| LayoutError::engine(configuration.engine(), source))?;

        // Anchor the rearranged region where it previously lived instead of
        // wherever the engine's coordinate system put it.
        if let Some(offset) = anchor_offset(request.nodes(), &subgraph, &layout) {
            layout.translate(offset);
        }

        let (mut nodes, edges) = merge_engine_layout(request.nodes(), request.edges(), &layout);
        self.clamp_stable_roots(&mut nodes, changes);
        debug!(subgraph = subgraph.len(), total = total; "Applied partial engine pass");
        Ok(LayoutOutcome {
            nodes,
            edges,
            strategy: Strategy::Partial,
        })
    }

    /// Pins stable root nodes that drifted past the movement threshold back
    /// to their preserved positions. Children ride along with their parent
    /// and are never clamped.
    fn clamp_stable_roots(&self, nodes: &mut [LayoutNode], changes: &ChangeSet) {
        let threshold = self.policy.movement_threshold();
        for node in nodes.iter_mut() {
            if !node.is_root() || !changes.stable().contains(&node.id()) {
                continue;
            }
            let Some(preserved) = self.store.position(node.id()) else {
                continue;
            };
            let distance = node.position().distance_to(preserved);
            if distance > threshold {
                trace!(
                    node:% = node.id(),
                    distance = distance;
                    "Pinning stable node to preserved position"
                );
                node.set_position(preserved);
            }
        }
    }
}

/// Merges an engine arrangement back into the node and edge lists.
///
/// Nodes the engine placed take their new size and position; positions of
/// nested nodes are converted back to parent-relative coordinates. Nodes the
/// engine did not place keep their current coordinates (and, being
/// parent-relative, move with their parent automatically). Edges the engine
/// routed receive the new route; the rest are untouched.
pub(crate) fn merge_engine_layout(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    layout: &EngineLayout,
) -> (Vec<LayoutNode>, Vec<LayoutEdge>) {
    let index: IndexMap<Id, &LayoutNode> = nodes.iter().map(|node| (node.id(), node)).collect();

    // Absolute origin for every node: the engine result where present, the
    // existing tree otherwise.
    let mut absolute: IndexMap<Id, Point> = IndexMap::with_capacity(nodes.len());
    for node in nodes {
        let origin = match layout.node_bounds(node.id()) {
            Some(bounds) => bounds.origin(),
            None => existing_absolute_origin(node, &index),
        };
        absolute.insert(node.id(), origin);
    }

    let out_nodes = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(bounds) = layout.node_bounds(node.id()) {
                node.set_size(bounds.to_size());
                let origin = absolute[&node.id()];
                let position = match node.parent().and_then(|parent| absolute.get(&parent)) {
                    Some(parent_origin) => origin.sub_point(*parent_origin),
                    None => origin,
                };
                node.set_position(position);
            }
            node
        })
        .collect();

    let routed: IndexMap<Id, &RoutedEdge> = layout
        .edges()
        .iter()
        .map(|edge| (edge.id(), edge))
        .collect();
    let out_edges = edges
        .iter()
        .map(|edge| {
            let mut edge = edge.clone();
            if let Some(route) = routed.get(&edge.id()) {
                edge.set_route(route.points().to_vec(), route.label_position());
            }
            edge
        })
        .collect();

    (out_nodes, out_edges)
}

/// Absolute canvas origin of a node under the current (pre-pass) tree.
fn existing_absolute_origin(node: &LayoutNode, index: &IndexMap<Id, &LayoutNode>) -> Point {
    let mut origin = node.position();
    let mut current = node.parent();
    let mut hops = 0;
    while let Some(parent_id) = current {
        // Unknown parents and cyclic chains terminate the walk; the quality
        // layer is where they get reported.
        if hops > index.len() {
            break;
        }
        let Some(parent) = index.get(&parent_id) else {
            break;
        };
        origin = origin.add_point(parent.position());
        current = parent.parent();
        hops += 1;
    }
    origin
}

/// Offset that moves the engine's arrangement of `subgraph` onto the region
/// those nodes previously occupied.
fn anchor_offset(
    all_nodes: &[LayoutNode],
    subgraph: &[LayoutNode],
    layout: &EngineLayout,
) -> Option<Point> {
    let index: IndexMap<Id, &LayoutNode> = all_nodes.iter().map(|node| (node.id(), node)).collect();

    let mut previous_min: Option<Point> = None;
    for node in subgraph {
        let origin = existing_absolute_origin(node, &index);
        previous_min = Some(match previous_min {
            Some(min) => Point::new(min.x().min(origin.x()), min.y().min(origin.y())),
            None => origin,
        });
    }

    let mut result_min: Option<Point> = None;
    for (_, bounds) in layout.nodes() {
        let origin = bounds.origin();
        result_min = Some(match result_min {
            Some(min) => Point::new(min.x().min(origin.x()), min.y().min(origin.y())),
            None => origin,
        });
    }

    match (previous_min, result_min) {
        (Some(previous), Some(result)) => Some(previous.sub_point(result)),
        _ => None,
    }
}
