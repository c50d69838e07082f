//! Configuration types for layout orchestration.
//!
//! Every heuristic threshold used by the incremental strategies lives here
//! as a named, defaulted field rather than an inline literal. The defaults
//! are empirically tuned values, not derived constants; hosts that need a
//! different feel (denser diagrams, larger canvases) override them through
//! deserialization or the builder methods.
//!
//! # Overview
//!
//! - [`LayoutPolicy`] - Top-level policy combining the orchestrator thresholds
//!   with the nested sections.
//! - [`ShiftPolicy`] - Neighbor-shift expansion geometry.
//! - [`OptimizerPolicy`] - Candidate budget and per-aspect acceptance bars.
//! - [`QualityWeights`] - Relative importance of each quality aspect.

use serde::Deserialize;

use gimbal_core::geometry::Size;

/// Top-level layout policy.
///
/// All types implement [`serde::Deserialize`] with missing fields filled
/// from the defaults, so a host can override a single threshold in its
/// configuration file without restating the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutPolicy {
    /// Maximum distance a stable root node may drift before it is pinned
    /// back to its preserved position.
    movement_threshold: f32,

    /// Fraction of newly visible nodes above which a transition counts as a
    /// major structural change.
    new_node_ratio: f32,

    /// Maximum number of simultaneous expansions handled by neighbor
    /// shifting before falling back to a regular pass.
    expansion_cutoff: usize,

    /// Fraction of the total node count below which the affected subgraph is
    /// laid out on its own instead of the full graph.
    partial_ratio: f32,

    /// Neighbor-shift expansion geometry.
    shift: ShiftPolicy,

    /// Optimizer candidate budget and acceptance bars.
    optimizer: OptimizerPolicy,

    /// Quality aspect weights.
    weights: QualityWeights,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            movement_threshold: 50.0,
            new_node_ratio: 0.6,
            expansion_cutoff: 3,
            partial_ratio: 0.5,
            shift: ShiftPolicy::default(),
            optimizer: OptimizerPolicy::default(),
            weights: QualityWeights::default(),
        }
    }
}

impl LayoutPolicy {
    /// Maximum accepted drift for stable root nodes, in canvas units.
    pub fn movement_threshold(&self) -> f32 {
        self.movement_threshold
    }

    /// Newly-visible fraction that flags a major structural change.
    pub fn new_node_ratio(&self) -> f32 {
        self.new_node_ratio
    }

    /// Maximum simultaneous expansions served by neighbor shifting.
    pub fn expansion_cutoff(&self) -> usize {
        self.expansion_cutoff
    }

    /// Affected-subgraph fraction below which a partial pass is used.
    pub fn partial_ratio(&self) -> f32 {
        self.partial_ratio
    }

    /// Returns the neighbor-shift policy section.
    pub fn shift(&self) -> &ShiftPolicy {
        &self.shift
    }

    /// Returns the optimizer policy section.
    pub fn optimizer(&self) -> &OptimizerPolicy {
        &self.optimizer
    }

    /// Returns the quality weights section.
    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Replaces the movement threshold, consuming and returning the policy.
    pub fn with_movement_threshold(mut self, threshold: f32) -> Self {
        self.movement_threshold = threshold;
        self
    }

    /// Replaces the expansion cutoff, consuming and returning the policy.
    pub fn with_expansion_cutoff(mut self, cutoff: usize) -> Self {
        self.expansion_cutoff = cutoff;
        self
    }
}

/// Geometry rules for expanding a node in place.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShiftPolicy {
    /// Padding added on each side of the children's bounding box when
    /// sizing the expanded parent.
    padding: f32,

    /// Minimum width of an expanded parent.
    expanded_min_width: f32,

    /// Minimum height of an expanded parent.
    expanded_min_height: f32,

    /// Fraction of the expanded node's old height below its top edge at
    /// which a sibling counts as living in a lower row.
    row_band_factor: f32,
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            padding: 80.0,
            expanded_min_width: 220.0,
            expanded_min_height: 100.0,
            row_band_factor: 0.5,
        }
    }
}

impl ShiftPolicy {
    /// Per-side padding around the expanded node's children.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Minimum dimensions for an expanded parent.
    pub fn expanded_min(&self) -> Size {
        Size::new(self.expanded_min_width, self.expanded_min_height)
    }

    /// Row classification band, as a fraction of the old height.
    pub fn row_band_factor(&self) -> f32 {
        self.row_band_factor
    }
}

/// Candidate budget and acceptance bars for the layout optimizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerPolicy {
    /// Maximum number of engine configurations tried per optimization.
    max_iterations: usize,

    /// Maximum configurations tried per quality aspect in the incremental
    /// optimizer.
    candidates_per_aspect: usize,

    /// Overlap score above which the aspect is left alone.
    overlap_acceptance: f32,

    /// Spacing score above which the aspect is left alone.
    spacing_acceptance: f32,

    /// Hierarchy score above which the aspect is left alone.
    hierarchy_acceptance: f32,

    /// Aspect-ratio score at or above which the aspect is left alone.
    aspect_ratio_acceptance: f32,
}

impl Default for OptimizerPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            candidates_per_aspect: 2,
            overlap_acceptance: 95.0,
            spacing_acceptance: 90.0,
            hierarchy_acceptance: 95.0,
            aspect_ratio_acceptance: 80.0,
        }
    }
}

impl OptimizerPolicy {
    /// Maximum engine configurations tried per optimization.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Maximum configurations tried per aspect in the incremental variant.
    pub fn candidates_per_aspect(&self) -> usize {
        self.candidates_per_aspect
    }

    /// Overlap acceptance bar.
    pub fn overlap_acceptance(&self) -> f32 {
        self.overlap_acceptance
    }

    /// Spacing acceptance bar.
    pub fn spacing_acceptance(&self) -> f32 {
        self.spacing_acceptance
    }

    /// Hierarchy acceptance bar.
    pub fn hierarchy_acceptance(&self) -> f32 {
        self.hierarchy_acceptance
    }

    /// Aspect-ratio acceptance bar.
    pub fn aspect_ratio_acceptance(&self) -> f32 {
        self.aspect_ratio_acceptance
    }

    /// Replaces the candidate cap, consuming and returning the policy.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replaces the per-aspect candidate cap, consuming and returning the
    /// policy.
    pub fn with_candidates_per_aspect(mut self, candidates: usize) -> Self {
        self.candidates_per_aspect = candidates;
        self
    }
}

/// Relative importance of each quality aspect in the weighted score.
///
/// The weighted score is the weight-normalized combination of the per-aspect
/// scores, so any non-negative weights produce a value in `[0, 100]`. The
/// defaults sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    overlap: f32,
    spacing: f32,
    crossings: f32,
    edge_routing: f32,
    hierarchy: f32,
    aspect_ratio: f32,
    viewport: f32,
    consistency: f32,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            overlap: 0.20,
            spacing: 0.10,
            crossings: 0.15,
            edge_routing: 0.10,
            hierarchy: 0.20,
            aspect_ratio: 0.10,
            viewport: 0.10,
            consistency: 0.05,
        }
    }
}

impl QualityWeights {
    /// Weight of the sibling-overlap aspect.
    pub fn overlap(&self) -> f32 {
        self.overlap
    }

    /// Weight of the node-spacing aspect.
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Weight of the edge-crossing aspect.
    pub fn crossings(&self) -> f32 {
        self.crossings
    }

    /// Weight of the edge-routing aspect (edges over nodes, bends).
    pub fn edge_routing(&self) -> f32 {
        self.edge_routing
    }

    /// Weight of the hierarchy-containment aspect.
    pub fn hierarchy(&self) -> f32 {
        self.hierarchy
    }

    /// Weight of the aspect-ratio aspect.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Weight of the viewport-utilization aspect.
    pub fn viewport(&self) -> f32 {
        self.viewport
    }

    /// Weight of the alignment-consistency aspect.
    pub fn consistency(&self) -> f32 {
        self.consistency
    }

    /// Sum of all weights, used to normalize the weighted score.
    pub fn total(&self) -> f32 {
        self.overlap
            + self.spacing
            + self.crossings
            + self.edge_routing
            + self.hierarchy
            + self.aspect_ratio
            + self.viewport
            + self.consistency
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = LayoutPolicy::default();
        assert_eq!(policy.movement_threshold(), 50.0);
        assert_eq!(policy.new_node_ratio(), 0.6);
        assert_eq!(policy.expansion_cutoff(), 3);
        assert_eq!(policy.partial_ratio(), 0.5);
        assert_eq!(policy.shift().padding(), 80.0);
        assert_eq!(policy.shift().expanded_min(), Size::new(220.0, 100.0));
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = QualityWeights::default();
        assert!(approx_eq!(f32, weights.total(), 1.0, epsilon = 1e-6));
    }

    #[test]
    fn test_builder_overrides() {
        let policy = LayoutPolicy::default()
            .with_movement_threshold(120.0)
            .with_expansion_cutoff(5);
        assert_eq!(policy.movement_threshold(), 120.0);
        assert_eq!(policy.expansion_cutoff(), 5);
    }
}
