//! Gimbal - incremental, stability-preserving layout for hierarchical
//! architecture diagrams.
//!
//! Positions nodes and edges of a hierarchical diagram (persons, systems,
//! containers, components) on a 2D canvas and keeps those positions visually
//! stable as the visible subset changes. Per request, the orchestrator picks
//! the cheapest suitable strategy: pure position preservation, expand-in-place
//! neighbor shifting, a partial subgraph pass, or a full pass of the
//! configured layout engine. A quality scoring engine and a
//! multi-configuration optimizer sit on top for hosts that want the
//! best-looking arrangement rather than the first one.
//!
//! The layout algorithm itself is an external collaborator behind the
//! [`LayoutEngine`] trait; rendering, parsing, and persistence are out of
//! scope entirely.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gimbal::{
//!     EngineKind, LayoutRequest, LayoutSession,
//!     config::LayoutPolicy,
//!     model::{LayoutNode, NodeKind},
//! };
//!
//! # fn host_engine() -> Box<dyn gimbal::LayoutEngine> { unimplemented!() }
//! let mut session = LayoutSession::new(LayoutPolicy::default())
//!     .with_engine(EngineKind::Layered, host_engine());
//!
//! let nodes = vec![
//!     LayoutNode::new("shop".into(), NodeKind::SoftwareSystem),
//!     LayoutNode::new("crm".into(), NodeKind::SoftwareSystem),
//! ];
//! let outcome = session
//!     .apply_incremental(&LayoutRequest::new(nodes, vec![]))
//!     .expect("layout failed");
//!
//! println!("strategy: {:?}", outcome.strategy());
//! ```

pub use gimbal_core::{geometry, identifier, model};

pub mod config;
mod error;
mod layout;
mod optimize;
mod quality;

pub use error::LayoutError;
pub use layout::{
    IncrementalLayouter, LayoutOutcome, LayoutRequest, Strategy,
    changes::{ChangeSet, detect_changes},
    engines::{
        ConfigSelector, Direction, EngineError, EngineKind, EngineLayout, EngineOptions,
        EngineRegistry, FixedSelector, LayoutConfiguration, LayoutEngine, RoutedEdge,
        SelectionContext, SubgraphView, ViewLevel,
    },
    preserve::PositionStore,
    shift::apply_neighbor_shift,
};
pub use optimize::{
    OptimizationResult, OptimizeContext, TriedConfiguration, optimize_layout,
    optimize_layout_incremental,
};
pub use quality::{EdgeLengthStats, Grade, QualityMetrics, calculate_diagram_quality};

use log::info;

use gimbal_core::geometry::Size;

use config::LayoutPolicy;

/// Owns everything a host needs for a sequence of layout requests: the
/// policy, the engine registry, the configuration selector, and the
/// position-preservation state.
///
/// Requests must be serialized - the `&mut self` entry point enforces that a
/// second pass cannot start until the previous one returned.
pub struct LayoutSession {
    registry: EngineRegistry,
    selector: Box<dyn ConfigSelector>,
    layouter: IncrementalLayouter,
}

impl LayoutSession {
    /// Creates a session with an empty engine registry and a fixed default
    /// selector.
    pub fn new(policy: LayoutPolicy) -> Self {
        Self {
            registry: EngineRegistry::new(),
            selector: Box::new(FixedSelector::default()),
            layouter: IncrementalLayouter::new(policy),
        }
    }

    /// Registers a layout engine, consuming and returning the session.
    pub fn with_engine(mut self, kind: EngineKind, engine: Box<dyn LayoutEngine>) -> Self {
        self.registry.register(kind, engine);
        self
    }

    /// Replaces the configuration selector, consuming and returning the
    /// session.
    pub fn with_selector(mut self, selector: Box<dyn ConfigSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// The active policy.
    pub fn policy(&self) -> &LayoutPolicy {
        self.layouter.policy()
    }

    /// The registered engines.
    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Read access to the preservation store.
    pub fn store(&self) -> &PositionStore {
        self.layouter.store()
    }

    /// Applies the cheapest suitable layout strategy to the request and
    /// commits the result.
    ///
    /// # Errors
    ///
    /// Engine failures and unregistered engine kinds propagate; see
    /// [`IncrementalLayouter::apply`].
    pub fn apply_incremental(&mut self, request: &LayoutRequest) -> Result<LayoutOutcome, LayoutError> {
        info!(
            nodes = request.nodes().len(),
            edges = request.edges().len();
            "Applying incremental layout"
        );
        let outcome = self
            .layouter
            .apply(request, &self.registry, self.selector.as_ref())?;
        info!(strategy:? = outcome.strategy(); "Layout pass committed");
        Ok(outcome)
    }

    /// Tries alternative engine configurations for the given diagram and
    /// returns the best-scoring arrangement.
    ///
    /// # Errors
    ///
    /// Only malformed input fails this call; see [`optimize_layout`].
    pub fn optimize(
        &self,
        nodes: &[model::LayoutNode],
        edges: &[model::LayoutEdge],
        viewport: Size,
    ) -> Result<OptimizationResult, LayoutError> {
        let ctx = OptimizeContext::new(
            &self.registry,
            self.selector.as_ref(),
            self.policy().optimizer(),
            self.policy().weights(),
            viewport,
        );
        optimize_layout(nodes, edges, &ctx)
    }

    /// Aspect-ordered optimization of the given diagram; see
    /// [`optimize_layout_incremental`].
    ///
    /// # Errors
    ///
    /// Only malformed input fails this call.
    pub fn optimize_incremental(
        &self,
        nodes: &[model::LayoutNode],
        edges: &[model::LayoutEdge],
        viewport: Size,
    ) -> Result<OptimizationResult, LayoutError> {
        let ctx = OptimizeContext::new(
            &self.registry,
            self.selector.as_ref(),
            self.policy().optimizer(),
            self.policy().weights(),
            viewport,
        );
        optimize_layout_incremental(nodes, edges, &ctx)
    }
}

impl Default for LayoutSession {
    fn default() -> Self {
        Self::new(LayoutPolicy::default())
    }
}
