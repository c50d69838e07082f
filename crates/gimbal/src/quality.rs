//! Quality scoring for candidate diagram states.
//!
//! [`calculate_diagram_quality`] is a pure function from a diagram state to
//! quantified metrics: sibling overlap, node spacing, edge crossings, edges
//! routed over foreign nodes, hierarchy containment, aspect ratio, viewport
//! utilization, and alignment consistency. Each aspect scores in `[0, 100]`
//! and the weighted score is their weight-normalized combination, so the
//! optimizer can compare arbitrary candidates on one scale.
//!
//! Malformed input (non-finite coordinates, dangling edge endpoints,
//! cyclic parent chains) raises an error instead of defaulting — a silently
//! wrong score would corrupt the optimizer's selection.
//!
//! The penalty constants below are named so the scoring is reproducible;
//! they are severity knobs, not derived quantities.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use gimbal_core::{
    geometry::{Bounds, Point, Size, segments_intersect},
    identifier::Id,
    model::{LayoutEdge, LayoutNode},
};

use crate::{config::QualityWeights, error::LayoutError};

/// Minimum comfortable gap between sibling nodes.
const MIN_NODE_SPACING: f32 = 40.0;
/// Padding a parent must provide around the union of its children.
const HIERARCHY_PADDING: f32 = 20.0;
/// Flat penalty per overlapping sibling pair.
const OVERLAP_BASE_PENALTY: f32 = 8.0;
/// Additional penalty scaled by how much of the smaller box is covered.
const OVERLAP_AREA_PENALTY: f32 = 20.0;
/// Penalty per pair of crossing edges.
const CROSSING_PENALTY: f32 = 12.0;
/// Penalty per edge routed across a foreign node.
const EDGE_OVER_NODE_PENALTY: f32 = 6.0;
/// Penalty per bend in a routed edge.
const BEND_PENALTY: f32 = 2.0;
/// Penalty per child escaping its parent's bounding box.
const CONTAINMENT_PENALTY: f32 = 15.0;
/// Penalty per parent smaller than its children require.
const SIZE_VIOLATION_PENALTY: f32 = 10.0;
/// Comfortable aspect-ratio band.
const ASPECT_RATIO_MIN: f32 = 0.5;
const ASPECT_RATIO_MAX: f32 = 2.0;
/// Comfortable viewport-utilization band, and the overflow at which the
/// score bottoms out.
const VIEWPORT_LOW: f32 = 0.25;
const VIEWPORT_HIGH: f32 = 0.85;
const VIEWPORT_CEILING: f32 = 2.0;
/// Center-offset fraction under which two siblings count as aligned.
const ALIGNMENT_BAND_FACTOR: f32 = 0.5;
/// Normalized cross-product magnitude above which a waypoint is a bend.
const BEND_SIN_THRESHOLD: f32 = 0.087;

/// Route-length statistics across all edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EdgeLengthStats {
    pub min: f32,
    pub max: f32,
    pub average: f32,
}

/// Letter bucket of the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Buckets a weighted score: A ≥ 90, B ≥ 80, C ≥ 70, D ≥ 60, else F.
    pub fn from_score(score: f32) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// Snapshot scoring of one candidate diagram state.
///
/// Every `*_score` field lies in `[0, 100]`; `weighted_score` is the
/// weight-normalized combination of the per-aspect scores.
#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    pub overlap_score: f32,
    pub spacing_score: f32,
    pub edge_crossings: usize,
    pub crossing_score: f32,
    pub edges_over_nodes: usize,
    pub edge_bends: usize,
    pub edge_route_score: f32,
    pub edge_length: EdgeLengthStats,
    pub hierarchy_score: f32,
    pub parent_child_containment: Vec<Id>,
    pub parent_child_size_violations: Vec<Id>,
    pub aspect_ratio: f32,
    pub aspect_ratio_score: f32,
    pub viewport_utilization: f32,
    pub viewport_score: f32,
    pub consistency_score: f32,
    pub weighted_score: f32,
    pub grade: Grade,
    pub overlapping_nodes: Vec<(Id, Id)>,
}

impl QualityMetrics {
    /// Metrics for a diagram with nothing in it.
    fn empty(weights: &QualityWeights) -> Self {
        let weighted_score = if weights.total() > 0.0 { 100.0 } else { 0.0 };
        Self {
            overlap_score: 100.0,
            spacing_score: 100.0,
            edge_crossings: 0,
            crossing_score: 100.0,
            edges_over_nodes: 0,
            edge_bends: 0,
            edge_route_score: 100.0,
            edge_length: EdgeLengthStats::default(),
            hierarchy_score: 100.0,
            parent_child_containment: Vec::new(),
            parent_child_size_violations: Vec::new(),
            aspect_ratio: 1.0,
            aspect_ratio_score: 100.0,
            viewport_utilization: 0.0,
            viewport_score: 100.0,
            consistency_score: 100.0,
            weighted_score,
            grade: Grade::from_score(weighted_score),
            overlapping_nodes: Vec::new(),
        }
    }
}

/// Scores a diagram state against the given viewport and weights.
///
/// Pure and deterministic; the inputs are never mutated.
///
/// # Errors
///
/// Returns [`LayoutError::MalformedNode`] / [`LayoutError::MalformedEdge`]
/// for non-finite coordinates, unknown or cyclic parents, and dangling edge
/// endpoints, and [`LayoutError::InvalidViewport`] for a degenerate
/// viewport.
pub fn calculate_diagram_quality(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    viewport: Size,
    weights: &QualityWeights,
) -> Result<QualityMetrics, LayoutError> {
    if !viewport.is_valid() {
        return Err(LayoutError::InvalidViewport);
    }

    let index: IndexMap<Id, &LayoutNode> = nodes.iter().map(|node| (node.id(), node)).collect();
    let ancestors = validate(nodes, edges, &index)?;

    if nodes.is_empty() {
        return Ok(QualityMetrics::empty(weights));
    }

    let absolute = absolute_bounds(nodes, &index, &ancestors);

    let (overlap_score, overlapping_nodes) = score_overlap(nodes, &absolute, &ancestors);
    let (spacing_score, consistency_score) = score_siblings(nodes, &absolute);

    let polylines: Vec<Vec<Point>> = edges
        .iter()
        .map(|edge| edge_polyline(edge, &absolute))
        .collect();
    let edge_crossings = count_crossings(edges, &polylines);
    let edges_over_nodes = count_edges_over_nodes(nodes, edges, &polylines, &absolute, &ancestors);
    let edge_bends = count_bends(&polylines);
    let edge_length = length_stats(&polylines);

    let crossing_score = (100.0 - CROSSING_PENALTY * edge_crossings as f32).clamp(0.0, 100.0);
    let edge_route_score = (100.0
        - EDGE_OVER_NODE_PENALTY * edges_over_nodes as f32
        - BEND_PENALTY * edge_bends as f32)
        .clamp(0.0, 100.0);

    let (hierarchy_score, parent_child_containment, parent_child_size_violations) =
        score_hierarchy(nodes, &absolute);

    let bbox = diagram_bounds(&absolute);
    let aspect_ratio = bbox.width() / bbox.height().max(f32::EPSILON);
    let aspect_ratio_score = score_aspect_ratio(aspect_ratio);
    let viewport_utilization = bbox.area() / viewport.area();
    let viewport_score = score_viewport(viewport_utilization);

    let total = weights.total();
    let weighted_score = if total > 0.0 {
        (weights.overlap() * overlap_score
            + weights.spacing() * spacing_score
            + weights.crossings() * crossing_score
            + weights.edge_routing() * edge_route_score
            + weights.hierarchy() * hierarchy_score
            + weights.aspect_ratio() * aspect_ratio_score
            + weights.viewport() * viewport_score
            + weights.consistency() * consistency_score)
            / total
    } else {
        0.0
    };

    Ok(QualityMetrics {
        overlap_score,
        spacing_score,
        edge_crossings,
        crossing_score,
        edges_over_nodes,
        edge_bends,
        edge_route_score,
        edge_length,
        hierarchy_score,
        parent_child_containment,
        parent_child_size_violations,
        aspect_ratio,
        aspect_ratio_score,
        viewport_utilization,
        viewport_score,
        consistency_score,
        weighted_score,
        grade: Grade::from_score(weighted_score),
        overlapping_nodes,
    })
}

/// Validates the inputs and returns the ancestor set per node.
fn validate(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    index: &IndexMap<Id, &LayoutNode>,
) -> Result<IndexMap<Id, IndexSet<Id>>, LayoutError> {
    for node in nodes {
        if !node.position().is_finite() {
            return Err(LayoutError::malformed_node(node.id(), "non-finite position"));
        }
        if !node.size().is_valid() {
            return Err(LayoutError::malformed_node(
                node.id(),
                "non-finite or non-positive size",
            ));
        }
    }

    let mut ancestors: IndexMap<Id, IndexSet<Id>> = IndexMap::with_capacity(nodes.len());
    for node in nodes {
        let mut chain = IndexSet::new();
        let mut current = node.parent();
        while let Some(parent_id) = current {
            let Some(parent) = index.get(&parent_id) else {
                return Err(LayoutError::malformed_node(
                    node.id(),
                    format!("unknown parent `{parent_id}`"),
                ));
            };
            if !chain.insert(parent_id) {
                return Err(LayoutError::malformed_node(node.id(), "cyclic parent chain"));
            }
            current = parent.parent();
        }
        ancestors.insert(node.id(), chain);
    }

    for edge in edges {
        if !index.contains_key(&edge.source()) || !index.contains_key(&edge.target()) {
            return Err(LayoutError::malformed_edge(
                edge.id(),
                "endpoint references a node not in the diagram",
            ));
        }
        if let Some(points) = edge.points() {
            if points.iter().any(|point| !point.is_finite()) {
                return Err(LayoutError::malformed_edge(edge.id(), "non-finite route point"));
            }
        }
    }

    Ok(ancestors)
}

/// Absolute canvas bounds per node, resolved through the parent chain.
fn absolute_bounds(
    nodes: &[LayoutNode],
    index: &IndexMap<Id, &LayoutNode>,
    ancestors: &IndexMap<Id, IndexSet<Id>>,
) -> IndexMap<Id, Bounds> {
    let mut absolute = IndexMap::with_capacity(nodes.len());
    for node in nodes {
        let mut origin = node.position();
        for ancestor in &ancestors[&node.id()] {
            origin = origin.add_point(index[ancestor].position());
        }
        absolute.insert(node.id(), Bounds::from_origin(origin, node.size()));
    }
    absolute
}

fn score_overlap(
    nodes: &[LayoutNode],
    absolute: &IndexMap<Id, Bounds>,
    ancestors: &IndexMap<Id, IndexSet<Id>>,
) -> (f32, Vec<(Id, Id)>) {
    let mut penalty = 0.0;
    let mut overlapping = Vec::new();
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            // Nodes in an ancestor/descendant relationship are supposed to
            // intersect.
            if ancestors[&a.id()].contains(&b.id()) || ancestors[&b.id()].contains(&a.id()) {
                continue;
            }
            let (box_a, box_b) = (absolute[&a.id()], absolute[&b.id()]);
            if box_a.intersects(&box_b) {
                let smaller = box_a.area().min(box_b.area()).max(f32::EPSILON);
                let ratio = (box_a.intersection_area(&box_b) / smaller).min(1.0);
                penalty += OVERLAP_BASE_PENALTY + OVERLAP_AREA_PENALTY * ratio;
                overlapping.push((a.id(), b.id()));
            }
        }
    }
    ((100.0 - penalty).clamp(0.0, 100.0), overlapping)
}

/// Spacing and alignment consistency, both judged over same-parent pairs.
fn score_siblings(nodes: &[LayoutNode], absolute: &IndexMap<Id, Bounds>) -> (f32, f32) {
    let mut pairs = 0usize;
    let mut crowded = 0usize;
    let mut aligned = 0usize;

    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            if a.parent() != b.parent() {
                continue;
            }
            pairs += 1;
            let (box_a, box_b) = (absolute[&a.id()], absolute[&b.id()]);
            if rect_gap(box_a, box_b) < MIN_NODE_SPACING {
                crowded += 1;
            }

            let (center_a, center_b) = (box_a.center(), box_b.center());
            let row_band = ALIGNMENT_BAND_FACTOR * box_a.height().min(box_b.height());
            let column_band = ALIGNMENT_BAND_FACTOR * box_a.width().min(box_b.width());
            if (center_a.y() - center_b.y()).abs() <= row_band
                || (center_a.x() - center_b.x()).abs() <= column_band
            {
                aligned += 1;
            }
        }
    }

    if pairs == 0 {
        (100.0, 100.0)
    } else {
        (
            100.0 * (1.0 - crowded as f32 / pairs as f32),
            100.0 * aligned as f32 / pairs as f32,
        )
    }
}

/// Shortest distance between two boxes; 0.0 when they touch or overlap.
fn rect_gap(a: Bounds, b: Bounds) -> f32 {
    let dx = (a.min_x() - b.max_x()).max(b.min_x() - a.max_x()).max(0.0);
    let dy = (a.min_y() - b.max_y()).max(b.min_y() - a.max_y()).max(0.0);
    if dx > 0.0 && dy > 0.0 {
        (dx * dx + dy * dy).sqrt()
    } else {
        dx.max(dy)
    }
}

/// The path an edge is judged by: its routed points, or the straight
/// center-to-center segment when no route is cached.
fn edge_polyline(edge: &LayoutEdge, absolute: &IndexMap<Id, Bounds>) -> Vec<Point> {
    match edge.points() {
        Some(points) if points.len() >= 2 => points.to_vec(),
        _ => vec![
            absolute[&edge.source()].center(),
            absolute[&edge.target()].center(),
        ],
    }
}

/// Pairs of edges whose paths cross, excluding edges sharing an endpoint.
fn count_crossings(edges: &[LayoutEdge], polylines: &[Vec<Point>]) -> usize {
    let mut crossings = 0;
    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            let shares_endpoint = edges[i].touches(edges[j].source())
                || edges[i].touches(edges[j].target());
            if shares_endpoint {
                continue;
            }
            let intersects = polylines[i].windows(2).any(|a| {
                polylines[j]
                    .windows(2)
                    .any(|b| segments_intersect(a[0], a[1], b[0], b[1]))
            });
            if intersects {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Edges whose path passes through a node that is neither endpoint nor a
/// container of one.
fn count_edges_over_nodes(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    polylines: &[Vec<Point>],
    absolute: &IndexMap<Id, Bounds>,
    ancestors: &IndexMap<Id, IndexSet<Id>>,
) -> usize {
    let mut count = 0;
    for (edge, polyline) in edges.iter().zip(polylines) {
        let over_some_node = nodes.iter().any(|node| {
            if edge.touches(node.id()) {
                return false;
            }
            if ancestors[&edge.source()].contains(&node.id())
                || ancestors[&edge.target()].contains(&node.id())
            {
                return false;
            }
            let bounds = absolute[&node.id()];
            polyline
                .windows(2)
                .any(|segment| bounds.intersects_segment(segment[0], segment[1]))
        });
        if over_some_node {
            count += 1;
        }
    }
    count
}

/// Direction changes at interior waypoints, summed across all edges.
fn count_bends(polylines: &[Vec<Point>]) -> usize {
    let mut bends = 0;
    for polyline in polylines {
        for window in polyline.windows(3) {
            let first = window[1].sub_point(window[0]);
            let second = window[2].sub_point(window[1]);
            let lengths = first.distance_to(Point::default()) * second.distance_to(Point::default());
            if lengths <= f32::EPSILON {
                continue;
            }
            let cross = first.x() * second.y() - first.y() * second.x();
            if (cross / lengths).abs() > BEND_SIN_THRESHOLD {
                bends += 1;
            }
        }
    }
    bends
}

fn length_stats(polylines: &[Vec<Point>]) -> EdgeLengthStats {
    if polylines.is_empty() {
        return EdgeLengthStats::default();
    }

    let mut min = f32::MAX;
    let mut max: f32 = 0.0;
    let mut sum = 0.0;
    for polyline in polylines {
        let length: f32 = polyline
            .windows(2)
            .map(|segment| segment[0].distance_to(segment[1]))
            .sum();
        min = min.min(length);
        max = max.max(length);
        sum += length;
    }

    EdgeLengthStats {
        min,
        max,
        average: sum / polylines.len() as f32,
    }
}

fn score_hierarchy(
    nodes: &[LayoutNode],
    absolute: &IndexMap<Id, Bounds>,
) -> (f32, Vec<Id>, Vec<Id>) {
    let mut containment = Vec::new();
    for node in nodes {
        if let Some(parent) = node.parent() {
            if !absolute[&parent].contains(&absolute[&node.id()]) {
                containment.push(node.id());
            }
        }
    }

    let mut children_union: IndexMap<Id, Bounds> = IndexMap::new();
    for node in nodes {
        if let Some(parent) = node.parent() {
            let bounds = absolute[&node.id()];
            children_union
                .entry(parent)
                .and_modify(|union| *union = union.merge(&bounds))
                .or_insert(bounds);
        }
    }

    let mut size_violations = Vec::new();
    for (parent_id, union) in &children_union {
        let parent_bounds = absolute[parent_id];
        let required_width = union.width() + 2.0 * HIERARCHY_PADDING;
        let required_height = union.height() + 2.0 * HIERARCHY_PADDING;
        if parent_bounds.width() < required_width || parent_bounds.height() < required_height {
            size_violations.push(*parent_id);
        }
    }

    let score = (100.0
        - CONTAINMENT_PENALTY * containment.len() as f32
        - SIZE_VIOLATION_PENALTY * size_violations.len() as f32)
        .clamp(0.0, 100.0);
    (score, containment, size_violations)
}

fn diagram_bounds(absolute: &IndexMap<Id, Bounds>) -> Bounds {
    let mut iter = absolute.values().copied();
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |merged, bounds| merged.merge(&bounds))
}

fn score_aspect_ratio(ratio: f32) -> f32 {
    if ratio < ASPECT_RATIO_MIN {
        (100.0 * ratio / ASPECT_RATIO_MIN).clamp(0.0, 100.0)
    } else if ratio > ASPECT_RATIO_MAX {
        (100.0 * ASPECT_RATIO_MAX / ratio).clamp(0.0, 100.0)
    } else {
        100.0
    }
}

fn score_viewport(utilization: f32) -> f32 {
    if utilization < VIEWPORT_LOW {
        (100.0 * utilization / VIEWPORT_LOW).clamp(0.0, 100.0)
    } else if utilization <= VIEWPORT_HIGH {
        100.0
    } else {
        (100.0 * (VIEWPORT_CEILING - utilization) / (VIEWPORT_CEILING - VIEWPORT_HIGH))
            .clamp(0.0, 100.0)
    }
}
