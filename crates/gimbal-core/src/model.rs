//! Positioned diagram elements
//!
//! [`LayoutNode`] and [`LayoutEdge`] are the records the layout core operates
//! on. A node with a parent is positioned relative to that parent's origin;
//! root nodes use absolute canvas coordinates. Host-specific data rides along
//! in an open attribute bag rather than a typed field per concern.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

/// The element kinds of a hierarchical architecture diagram.
///
/// The kind determines the minimum size a node may take (so labels are never
/// clipped) and is available to layout engines for lane classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Person,
    #[serde(rename = "system")]
    SoftwareSystem,
    Container,
    Component,
    DataStore,
    Queue,
}

impl NodeKind {
    /// Minimum bounding-box dimensions for this kind.
    pub fn min_size(self) -> Size {
        match self {
            NodeKind::Person => Size::new(160.0, 150.0),
            NodeKind::SoftwareSystem | NodeKind::Container => Size::new(220.0, 100.0),
            NodeKind::Component => Size::new(200.0, 90.0),
            NodeKind::DataStore => Size::new(180.0, 90.0),
            NodeKind::Queue => Size::new(180.0, 70.0),
        }
    }
}

/// A positioned diagram element.
///
/// # Examples
///
/// ```
/// use gimbal_core::geometry::Point;
/// use gimbal_core::model::{LayoutNode, NodeKind};
///
/// let node = LayoutNode::new("api".into(), NodeKind::Container)
///     .with_position(Point::new(100.0, 40.0))
///     .with_attribute("technology", "Rust");
///
/// assert!(node.is_root());
/// assert_eq!(node.size(), NodeKind::Container.min_size());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    id: Id,
    kind: NodeKind,
    position: Point,
    size: Size,
    parent: Option<Id>,
    attributes: IndexMap<String, String>,
}

impl LayoutNode {
    /// Creates a node at the origin with the kind's minimum size.
    pub fn new(id: Id, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            position: Point::default(),
            size: kind.min_size(),
            parent: None,
            attributes: IndexMap::new(),
        }
    }

    /// Sets the position, consuming and returning the node.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Sets the size, consuming and returning the node. Floored at the
    /// kind's minimum dimensions.
    pub fn with_size(mut self, size: Size) -> Self {
        self.set_size(size);
        self
    }

    /// Sets the containing node, consuming and returning the node.
    pub fn with_parent(mut self, parent: Id) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attaches a host attribute, consuming and returning the node.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the node identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the element kind
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Top-left position; relative to the parent's origin for nested nodes
    pub fn position(&self) -> Point {
        self.position
    }

    /// Bounding-box dimensions
    pub fn size(&self) -> Size {
        self.size
    }

    /// The containing node, if any
    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    /// Returns true when the node has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Host data carried through the layout untouched
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Bounding box in the node's own coordinate space
    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin(self.position, self.size)
    }

    /// Overwrites the position
    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Overwrites the size, floored at the kind's minimum dimensions
    pub fn set_size(&mut self, size: Size) {
        self.size = size.max(self.kind.min_size());
    }

    /// Moves the node by the given offset
    pub fn translate(&mut self, offset: Point) {
        self.position = self.position.add_point(offset);
    }
}

/// A directed relationship between two nodes.
///
/// `points` holds the routed path when one has been computed; `None` tells the
/// renderer to derive a default route. The label position, when present, has
/// been placed clear of node bounding boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    id: Id,
    source: Id,
    target: Id,
    points: Option<Vec<Point>>,
    label_position: Option<Point>,
}

impl LayoutEdge {
    /// Creates an unrouted edge.
    pub fn new(id: Id, source: Id, target: Id) -> Self {
        Self {
            id,
            source,
            target,
            points: None,
            label_position: None,
        }
    }

    /// Returns the edge identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the source node identifier
    pub fn source(&self) -> Id {
        self.source
    }

    /// Returns the target node identifier
    pub fn target(&self) -> Id {
        self.target
    }

    /// The routed waypoints, or `None` for a renderer-default route
    pub fn points(&self) -> Option<&[Point]> {
        self.points.as_deref()
    }

    /// Position for the edge's text label, if one has been placed
    pub fn label_position(&self) -> Option<Point> {
        self.label_position
    }

    /// Returns true when the edge connects the given node
    pub fn touches(&self, id: Id) -> bool {
        self.source == id || self.target == id
    }

    /// Installs a routed path and label position.
    pub fn set_route(&mut self, points: Vec<Point>, label_position: Option<Point>) {
        self.points = Some(points);
        self.label_position = label_position;
    }

    /// Drops any cached route so the renderer recomputes a default path.
    pub fn clear_route(&mut self) {
        self.points = None;
        self.label_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_takes_kind_minimum_size() {
        let node = LayoutNode::new("db".into(), NodeKind::DataStore);
        assert_eq!(node.size(), Size::new(180.0, 90.0));
    }

    #[test]
    fn test_set_size_floors_at_kind_minimum() {
        let mut node = LayoutNode::new("sys".into(), NodeKind::SoftwareSystem);
        node.set_size(Size::new(10.0, 10.0));
        assert_eq!(node.size(), Size::new(220.0, 100.0));

        node.set_size(Size::new(500.0, 50.0));
        assert_eq!(node.size(), Size::new(500.0, 100.0));
    }

    #[test]
    fn test_node_bounds_and_translate() {
        let mut node = LayoutNode::new("web".into(), NodeKind::Container)
            .with_position(Point::new(40.0, 60.0));
        assert_eq!(node.bounds().origin(), Point::new(40.0, 60.0));
        assert_eq!(node.bounds().max_x(), 260.0);

        node.translate(Point::new(10.0, -10.0));
        assert_eq!(node.position(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_parent_assignment() {
        let node = LayoutNode::new("api".into(), NodeKind::Component).with_parent("backend".into());
        assert!(!node.is_root());
        assert_eq!(node.parent(), Some(Id::new("backend")));
    }

    #[test]
    fn test_attributes_pass_through() {
        let node = LayoutNode::new("queue".into(), NodeKind::Queue)
            .with_attribute("technology", "Kafka")
            .with_attribute("team", "platform");
        assert_eq!(node.attributes().get("technology").unwrap(), "Kafka");
        assert_eq!(node.attributes().len(), 2);
    }

    #[test]
    fn test_edge_route_lifecycle() {
        let mut edge = LayoutEdge::new("e1".into(), "a".into(), "b".into());
        assert!(edge.points().is_none());

        edge.set_route(
            vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)],
            Some(Point::new(25.0, 25.0)),
        );
        assert_eq!(edge.points().unwrap().len(), 2);
        assert_eq!(edge.label_position(), Some(Point::new(25.0, 25.0)));

        edge.clear_route();
        assert!(edge.points().is_none());
        assert!(edge.label_position().is_none());
    }

    #[test]
    fn test_edge_touches() {
        let edge = LayoutEdge::new("e1".into(), "a".into(), "b".into());
        assert!(edge.touches(Id::new("a")));
        assert!(edge.touches(Id::new("b")));
        assert!(!edge.touches(Id::new("c")));
    }
}
