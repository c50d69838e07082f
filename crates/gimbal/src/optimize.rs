//! Multi-configuration layout optimization.
//!
//! [`optimize_layout`] scores the unmodified input, generates alternative
//! engine configurations, lays the graph out under each, and keeps the
//! arrangement with the strictly greatest weighted score. A failing
//! candidate is excluded from scoring rather than failing the call, so the
//! worst possible outcome is "no change".
//!
//! [`optimize_layout_incremental`] instead works down the list of quality
//! aspects from worst-scoring to best, skipping aspects that already meet
//! their acceptance bar, and tries a couple of aspect-targeted
//! configurations for each — accepting only candidates that improve the
//! running best.

use indexmap::IndexSet;
use log::{debug, info};

use gimbal_core::{
    geometry::Size,
    identifier::Id,
    model::{LayoutEdge, LayoutNode},
};

use crate::{
    config::{OptimizerPolicy, QualityWeights},
    error::LayoutError,
    layout::{
        engines::{
            ConfigSelector, Direction, EngineRegistry, LayoutConfiguration, SelectionContext,
            SubgraphView, ViewLevel,
        },
        incremental::merge_engine_layout,
    },
    quality::{QualityMetrics, calculate_diagram_quality},
};

/// Label under which the unmodified input is scored.
const CURRENT_LABEL: &str = "current";

/// Borrowed collaborators and view parameters for one optimization call.
pub struct OptimizeContext<'a> {
    registry: &'a EngineRegistry,
    selector: &'a dyn ConfigSelector,
    policy: &'a OptimizerPolicy,
    weights: &'a QualityWeights,
    viewport: Size,
    level: ViewLevel,
    focus_system: Option<Id>,
    focus_container: Option<Id>,
    expanded: IndexSet<Id>,
}

impl<'a> OptimizeContext<'a> {
    pub fn new(
        registry: &'a EngineRegistry,
        selector: &'a dyn ConfigSelector,
        policy: &'a OptimizerPolicy,
        weights: &'a QualityWeights,
        viewport: Size,
    ) -> Self {
        Self {
            registry,
            selector,
            policy,
            weights,
            viewport,
            level: ViewLevel::default(),
            focus_system: None,
            focus_container: None,
            expanded: IndexSet::new(),
        }
    }

    /// Sets the abstraction level, consuming and returning the context.
    pub fn with_level(mut self, level: ViewLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the focused system, consuming and returning the context.
    pub fn with_focus_system(mut self, id: Id) -> Self {
        self.focus_system = Some(id);
        self
    }

    /// Sets the focused container, consuming and returning the context.
    pub fn with_focus_container(mut self, id: Id) -> Self {
        self.focus_container = Some(id);
        self
    }

    /// Marks the expanded nodes of the view, consuming and returning the
    /// context.
    pub fn with_expanded(mut self, expanded: IndexSet<Id>) -> Self {
        self.expanded = expanded;
        self
    }

    fn selection_context<'n>(
        &'n self,
        nodes: &'n [LayoutNode],
        edges: &'n [LayoutEdge],
    ) -> SelectionContext<'n> {
        SelectionContext::new(
            nodes,
            edges,
            self.level,
            self.focus_system,
            self.focus_container,
            &self.expanded,
        )
    }
}

/// One scored configuration attempt.
#[derive(Debug, Clone)]
pub struct TriedConfiguration {
    pub label: String,
    pub score: f32,
    pub metrics: QualityMetrics,
}

/// The outcome of an optimization call.
///
/// `best_score` always equals the maximum score in `tried`, and the input
/// itself is always among the tried candidates, so the result is never worse
/// than what was passed in.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub best_label: String,
    pub best_score: f32,
    pub best_metrics: QualityMetrics,
    pub tried: Vec<TriedConfiguration>,
}

/// Tries alternative engine configurations and keeps the best-scoring
/// arrangement.
///
/// # Errors
///
/// Only malformed input can fail this call: the unmodified input must be
/// scorable. Candidate failures are logged and excluded.
pub fn optimize_layout(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    ctx: &OptimizeContext<'_>,
) -> Result<OptimizationResult, LayoutError> {
    let mut result = baseline_result(nodes, edges, ctx)?;

    let primary = ctx.selector.select(&ctx.selection_context(nodes, edges));
    let candidates = candidate_configurations(&primary, ctx.registry, ctx.policy.max_iterations());
    info!(
        candidates = candidates.len(),
        baseline = result.best_score;
        "Optimizing layout"
    );

    for configuration in &candidates {
        evaluate_candidate(nodes, edges, configuration, ctx, &mut result);
    }

    Ok(result)
}

/// Aspect-ordered optimization: attack the worst-scoring quality aspects
/// first, skip aspects that already meet their acceptance bar, and stop
/// after trying every aspect at most once.
///
/// # Errors
///
/// As with [`optimize_layout`], only malformed input fails the call.
pub fn optimize_layout_incremental(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    ctx: &OptimizeContext<'_>,
) -> Result<OptimizationResult, LayoutError> {
    let mut result = baseline_result(nodes, edges, ctx)?;
    let primary = ctx.selector.select(&ctx.selection_context(nodes, edges));

    let mut aspects = [
        (QualityAspect::Overlap, result.best_metrics.overlap_score),
        (QualityAspect::Crossings, result.best_metrics.crossing_score),
        (QualityAspect::Hierarchy, result.best_metrics.hierarchy_score),
        (QualityAspect::Spacing, result.best_metrics.spacing_score),
        (
            QualityAspect::AspectRatio,
            result.best_metrics.aspect_ratio_score,
        ),
    ];
    aspects.sort_by(|a, b| a.1.total_cmp(&b.1));

    for (aspect, _) in aspects {
        if aspect_is_acceptable(aspect, &result.best_metrics, ctx.policy) {
            continue;
        }
        debug!(aspect:? = aspect; "Attempting to improve quality aspect");

        let candidates = aspect_candidates(aspect, &primary, ctx.registry);
        for configuration in candidates
            .into_iter()
            .take(ctx.policy.candidates_per_aspect())
        {
            // Candidates build on the running best arrangement.
            let base_nodes = result.nodes.clone();
            let base_edges = result.edges.clone();
            evaluate_candidate(&base_nodes, &base_edges, &configuration, ctx, &mut result);
        }
    }

    Ok(result)
}

/// Scores the unmodified input as the `current` candidate.
fn baseline_result(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    ctx: &OptimizeContext<'_>,
) -> Result<OptimizationResult, LayoutError> {
    let baseline = calculate_diagram_quality(nodes, edges, ctx.viewport, ctx.weights)?;
    Ok(OptimizationResult {
        nodes: nodes.to_vec(),
        edges: edges.to_vec(),
        best_label: CURRENT_LABEL.to_string(),
        best_score: baseline.weighted_score,
        best_metrics: baseline.clone(),
        tried: vec![TriedConfiguration {
            label: CURRENT_LABEL.to_string(),
            score: baseline.weighted_score,
            metrics: baseline,
        }],
    })
}

/// Primary configuration first, then the other registered engine kinds at
/// the same direction, then a rotated variant for a top-down primary;
/// capped at `max_iterations`.
fn candidate_configurations(
    primary: &LayoutConfiguration,
    registry: &EngineRegistry,
    max_iterations: usize,
) -> Vec<LayoutConfiguration> {
    let mut candidates = vec![primary.clone()];
    for kind in registry.kinds() {
        if kind != primary.engine() {
            candidates.push(
                LayoutConfiguration::new(kind, primary.direction())
                    .with_options(primary.options().clone()),
            );
        }
    }
    if primary.direction() == Direction::Down {
        candidates.push(
            LayoutConfiguration::new(primary.engine(), Direction::Right)
                .with_options(primary.options().clone()),
        );
    }
    candidates.truncate(max_iterations);
    candidates
}

/// Lays out and scores one candidate; updates `result` when it strictly
/// improves the best score. Failures are logged and excluded.
fn evaluate_candidate(
    base_nodes: &[LayoutNode],
    base_edges: &[LayoutEdge],
    configuration: &LayoutConfiguration,
    ctx: &OptimizeContext<'_>,
    result: &mut OptimizationResult,
) {
    let label = configuration.label();
    match try_configuration(base_nodes, base_edges, configuration, ctx) {
        Ok((nodes, edges, metrics)) => {
            let score = metrics.weighted_score;
            let improved = score > result.best_score;
            result.tried.push(TriedConfiguration {
                label: label.clone(),
                score,
                metrics: metrics.clone(),
            });
            if improved {
                debug!(
                    configuration = label.as_str(),
                    score = score;
                    "New best configuration"
                );
                result.nodes = nodes;
                result.edges = edges;
                result.best_label = label;
                result.best_score = score;
                result.best_metrics = metrics;
            }
        }
        Err(err) => {
            debug!(
                configuration = label.as_str(),
                error:% = err;
                "Candidate failed; excluded from scoring"
            );
        }
    }
}

fn try_configuration(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    configuration: &LayoutConfiguration,
    ctx: &OptimizeContext<'_>,
) -> Result<(Vec<LayoutNode>, Vec<LayoutEdge>, QualityMetrics), LayoutError> {
    let engine = ctx.registry.get(configuration.engine())?;
    let view = SubgraphView::new(nodes, edges, configuration.direction(), &ctx.expanded);
    let layout = engine
        .layout(&view, configuration.options())
        .map_err(|source| LayoutError::engine(configuration.engine(), source))?;
    let (candidate_nodes, candidate_edges) = merge_engine_layout(nodes, edges, &layout);
    let metrics =
        calculate_diagram_quality(&candidate_nodes, &candidate_edges, ctx.viewport, ctx.weights)?;
    Ok((candidate_nodes, candidate_edges, metrics))
}

/// The quality aspects the incremental optimizer can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityAspect {
    Overlap,
    Crossings,
    Hierarchy,
    Spacing,
    AspectRatio,
}

fn aspect_is_acceptable(
    aspect: QualityAspect,
    metrics: &QualityMetrics,
    policy: &OptimizerPolicy,
) -> bool {
    match aspect {
        QualityAspect::Overlap => metrics.overlap_score > policy.overlap_acceptance(),
        QualityAspect::Crossings => metrics.edge_crossings == 0,
        QualityAspect::Hierarchy => metrics.hierarchy_score > policy.hierarchy_acceptance(),
        QualityAspect::Spacing => metrics.spacing_score > policy.spacing_acceptance(),
        QualityAspect::AspectRatio => {
            metrics.aspect_ratio_score >= policy.aspect_ratio_acceptance()
        }
    }
}

/// Configurations likely to improve one aspect: more breathing room for
/// overlap/spacing/hierarchy problems, a different algorithm for crossings,
/// a rotated flow for a bad aspect ratio.
fn aspect_candidates(
    aspect: QualityAspect,
    primary: &LayoutConfiguration,
    registry: &EngineRegistry,
) -> Vec<LayoutConfiguration> {
    match aspect {
        QualityAspect::Overlap | QualityAspect::Spacing => vec![
            primary.clone().with_options(primary.options().scaled(1.5)),
            primary.clone().with_options(primary.options().scaled(2.0)),
        ],
        QualityAspect::Hierarchy => vec![
            primary.clone().with_options(primary.options().scaled(1.25)),
            primary.clone().with_options(primary.options().scaled(1.75)),
        ],
        QualityAspect::Crossings => registry
            .kinds()
            .filter(|kind| *kind != primary.engine())
            .map(|kind| {
                LayoutConfiguration::new(kind, primary.direction())
                    .with_options(primary.options().clone())
            })
            .collect(),
        QualityAspect::AspectRatio => vec![
            LayoutConfiguration::new(primary.engine(), primary.direction().rotated())
                .with_options(primary.options().clone()),
            LayoutConfiguration::new(primary.engine(), primary.direction().rotated())
                .with_options(primary.options().scaled(1.25)),
        ],
    }
}
