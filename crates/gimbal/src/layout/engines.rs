//! The layout-engine boundary.
//!
//! The algorithm that turns a graph into absolute bounding boxes is an
//! external collaborator. This module defines the narrow interface the core
//! drives it through: [`LayoutEngine`] for producing an arrangement,
//! [`EngineRegistry`] for holding the available engine variants, and
//! [`ConfigSelector`] for choosing which variant and direction to use when
//! the core needs a default.

use std::{error::Error, fmt};

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::Deserialize;

use gimbal_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    model::{LayoutEdge, LayoutNode},
};

use crate::error::LayoutError;

/// Errors reported by a layout engine implementation.
pub type EngineError = Box<dyn Error + Send + Sync>;

/// The engine variants a registry may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Rank-based hierarchical arrangement; the default for architecture
    /// diagrams.
    #[default]
    Layered,
    /// Force-directed arrangement.
    Force,
    /// Space-minimizing packing arrangement.
    Compact,
}

impl EngineKind {
    fn as_str(self) -> &'static str {
        match self {
            EngineKind::Layered => "layered",
            EngineKind::Force => "force",
            EngineKind::Compact => "compact",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary flow direction of an arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Down,
    Right,
    Up,
    Left,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Left => "left",
        }
    }

    /// The same flow rotated a quarter turn, used by the optimizer to trade
    /// width for height.
    pub fn rotated(self) -> Self {
        match self {
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spacing knobs passed through to the engine untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    node_spacing: f32,
    rank_spacing: f32,
    padding: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 80.0,
            padding: 40.0,
        }
    }
}

impl EngineOptions {
    /// Spacing between sibling nodes.
    pub fn node_spacing(&self) -> f32 {
        self.node_spacing
    }

    /// Spacing between ranks/layers.
    pub fn rank_spacing(&self) -> f32 {
        self.rank_spacing
    }

    /// Padding inside container nodes.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Returns the options with every spacing knob scaled by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            node_spacing: self.node_spacing * factor,
            rank_spacing: self.rank_spacing * factor,
            padding: self.padding * factor,
        }
    }
}

/// Candidate parameters for one layout attempt.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LayoutConfiguration {
    engine: EngineKind,
    direction: Direction,
    #[serde(default)]
    options: EngineOptions,
}

impl LayoutConfiguration {
    /// Creates a configuration with default engine options.
    pub fn new(engine: EngineKind, direction: Direction) -> Self {
        Self {
            engine,
            direction,
            options: EngineOptions::default(),
        }
    }

    /// Replaces the engine options, consuming and returning the configuration.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Which engine variant to invoke.
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Primary flow direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Opaque pass-through options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Short display label, e.g. `layered-down`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.engine, self.direction)
    }
}

/// The graph slice and view parameters handed to an engine for one pass.
pub struct SubgraphView<'a> {
    nodes: &'a [LayoutNode],
    edges: &'a [LayoutEdge],
    direction: Direction,
    expanded: &'a IndexSet<Id>,
}

impl<'a> SubgraphView<'a> {
    pub fn new(
        nodes: &'a [LayoutNode],
        edges: &'a [LayoutEdge],
        direction: Direction,
        expanded: &'a IndexSet<Id>,
    ) -> Self {
        Self {
            nodes,
            edges,
            direction,
            expanded,
        }
    }

    /// Nodes to arrange.
    pub fn nodes(&self) -> &[LayoutNode] {
        self.nodes
    }

    /// Edges between the nodes of this view.
    pub fn edges(&self) -> &[LayoutEdge] {
        self.edges
    }

    /// Requested flow direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Which nodes are expanded into their children in this view.
    pub fn expanded(&self) -> &IndexSet<Id> {
        self.expanded
    }
}

/// A routed relationship as returned by an engine.
#[derive(Debug, Clone)]
pub struct RoutedEdge {
    id: Id,
    points: Vec<Point>,
    label_position: Option<Point>,
}

impl RoutedEdge {
    pub fn new(id: Id, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            label_position: None,
        }
    }

    /// Attaches a label position, consuming and returning the edge.
    pub fn with_label_position(mut self, position: Point) -> Self {
        self.label_position = Some(position);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn label_position(&self) -> Option<Point> {
        self.label_position
    }
}

/// An engine's arrangement: absolute bounds per node plus routed edges.
#[derive(Debug, Clone, Default)]
pub struct EngineLayout {
    nodes: IndexMap<Id, Bounds>,
    edges: Vec<RoutedEdge>,
}

impl EngineLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the absolute bounds the engine assigned to a node.
    pub fn place_node(&mut self, id: Id, bounds: Bounds) {
        self.nodes.insert(id, bounds);
    }

    /// Records a routed edge.
    pub fn route_edge(&mut self, edge: RoutedEdge) {
        self.edges.push(edge);
    }

    /// Bounds assigned to the given node, if the engine placed it.
    pub fn node_bounds(&self, id: Id) -> Option<Bounds> {
        self.nodes.get(&id).copied()
    }

    /// All placed nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (Id, Bounds)> + '_ {
        self.nodes.iter().map(|(id, bounds)| (*id, *bounds))
    }

    /// All routed edges.
    pub fn edges(&self) -> &[RoutedEdge] {
        &self.edges
    }

    /// Translates every placed node and routed point by `offset`.
    pub fn translate(&mut self, offset: Point) {
        for bounds in self.nodes.values_mut() {
            *bounds = bounds.translate(offset);
        }
        for edge in &mut self.edges {
            for point in &mut edge.points {
                *point = point.add_point(offset);
            }
            if let Some(label) = edge.label_position {
                edge.label_position = Some(label.add_point(offset));
            }
        }
    }
}

/// An opaque graph-layout algorithm.
///
/// Implementations receive the subgraph to arrange and return absolute
/// bounding boxes for every node in it; the core never inspects how the
/// arrangement was produced. Engines must not retry internally — failures
/// are reported to the orchestrator, which owns the fallback policy.
pub trait LayoutEngine {
    fn layout(
        &self,
        view: &SubgraphView<'_>,
        options: &EngineOptions,
    ) -> Result<EngineLayout, EngineError>;
}

/// The engine variants available to this session, keyed by [`EngineKind`].
///
/// Iteration order is registration order, which keeps optimizer candidate
/// generation deterministic.
#[derive(Default)]
pub struct EngineRegistry {
    engines: IndexMap<EngineKind, Box<dyn LayoutEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an engine for the given kind, replacing any previous one.
    pub fn register(&mut self, kind: EngineKind, engine: Box<dyn LayoutEngine>) {
        if self.engines.insert(kind, engine).is_some() {
            debug!(engine:% = kind; "Replaced previously registered layout engine");
        }
    }

    /// Looks up the engine for a kind.
    pub fn get(&self, kind: EngineKind) -> Result<&dyn LayoutEngine, LayoutError> {
        self.engines
            .get(&kind)
            .map(|engine| engine.as_ref())
            .ok_or(LayoutError::EngineUnavailable(kind))
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = EngineKind> + '_ {
        self.engines.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// Diagram abstraction level of the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLevel {
    #[default]
    Landscape,
    #[serde(rename = "system")]
    SystemContext,
    Container,
    Component,
}

/// Everything a selector may consider when choosing a configuration.
pub struct SelectionContext<'a> {
    nodes: &'a [LayoutNode],
    edges: &'a [LayoutEdge],
    level: ViewLevel,
    focus_system: Option<Id>,
    focus_container: Option<Id>,
    expanded: &'a IndexSet<Id>,
}

impl<'a> SelectionContext<'a> {
    pub fn new(
        nodes: &'a [LayoutNode],
        edges: &'a [LayoutEdge],
        level: ViewLevel,
        focus_system: Option<Id>,
        focus_container: Option<Id>,
        expanded: &'a IndexSet<Id>,
    ) -> Self {
        Self {
            nodes,
            edges,
            level,
            focus_system,
            focus_container,
            expanded,
        }
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        self.edges
    }

    pub fn level(&self) -> ViewLevel {
        self.level
    }

    pub fn focus_system(&self) -> Option<Id> {
        self.focus_system
    }

    pub fn focus_container(&self) -> Option<Id> {
        self.focus_container
    }

    pub fn expanded(&self) -> &IndexSet<Id> {
        self.expanded
    }
}

/// Chooses a default engine configuration for a view.
///
/// The selection rules live with the host; the core only consumes the
/// result.
pub trait ConfigSelector {
    fn select(&self, ctx: &SelectionContext<'_>) -> LayoutConfiguration;
}

/// A selector that always returns the same configuration.
#[derive(Debug, Clone, Default)]
pub struct FixedSelector {
    configuration: LayoutConfiguration,
}

impl FixedSelector {
    pub fn new(configuration: LayoutConfiguration) -> Self {
        Self { configuration }
    }
}

impl ConfigSelector for FixedSelector {
    fn select(&self, _ctx: &SelectionContext<'_>) -> LayoutConfiguration {
        self.configuration.clone()
    }
}

#[cfg(test)]
mod tests {
    use gimbal_core::geometry::Size;

    use super::*;

    struct NullEngine;

    impl LayoutEngine for NullEngine {
        fn layout(
            &self,
            _view: &SubgraphView<'_>,
            _options: &EngineOptions,
        ) -> Result<EngineLayout, EngineError> {
            Ok(EngineLayout::new())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = EngineRegistry::new();
        assert!(registry.is_empty());
        registry.register(EngineKind::Layered, Box::new(NullEngine));

        assert!(registry.get(EngineKind::Layered).is_ok());
        assert!(matches!(
            registry.get(EngineKind::Force),
            Err(LayoutError::EngineUnavailable(EngineKind::Force))
        ));
    }

    #[test]
    fn test_registry_preserves_registration_order() {
        let mut registry = EngineRegistry::new();
        registry.register(EngineKind::Force, Box::new(NullEngine));
        registry.register(EngineKind::Layered, Box::new(NullEngine));

        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, vec![EngineKind::Force, EngineKind::Layered]);
    }

    #[test]
    fn test_configuration_label() {
        let configuration = LayoutConfiguration::new(EngineKind::Layered, Direction::Down);
        assert_eq!(configuration.label(), "layered-down");
    }

    #[test]
    fn test_direction_rotation() {
        assert_eq!(Direction::Down.rotated(), Direction::Right);
        assert_eq!(Direction::Right.rotated(), Direction::Down);
    }

    #[test]
    fn test_engine_layout_translate() {
        let mut layout = EngineLayout::new();
        layout.place_node(
            Id::new("a"),
            Bounds::from_origin(Point::new(10.0, 10.0), Size::new(100.0, 50.0)),
        );
        layout.route_edge(
            RoutedEdge::new(Id::new("e"), vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])
                .with_label_position(Point::new(2.0, 2.0)),
        );

        layout.translate(Point::new(100.0, 200.0));

        let bounds = layout.node_bounds(Id::new("a")).unwrap();
        assert_eq!(bounds.origin(), Point::new(110.0, 210.0));
        assert_eq!(layout.edges()[0].points()[0], Point::new(100.0, 200.0));
        assert_eq!(
            layout.edges()[0].label_position(),
            Some(Point::new(102.0, 202.0))
        );
    }

    #[test]
    fn test_fixed_selector_ignores_context() {
        let selector = FixedSelector::new(LayoutConfiguration::new(
            EngineKind::Compact,
            Direction::Right,
        ));
        let expanded = IndexSet::new();
        let ctx = SelectionContext::new(&[], &[], ViewLevel::Landscape, None, None, &expanded);
        assert_eq!(selector.select(&ctx).engine(), EngineKind::Compact);
    }
}
