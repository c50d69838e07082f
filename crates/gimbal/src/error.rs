//! Error types for Gimbal operations.
//!
//! This module provides the main error type [`LayoutError`] which wraps the
//! error conditions that can occur while orchestrating a layout pass.
//!
//! Recoverable conditions are absorbed at the component that can make a sane
//! alternative decision: a missing preserved position makes the orchestrator
//! fall back to a regular engine pass, and a failing optimizer candidate is
//! simply excluded from scoring. Everything else propagates to the caller.

use std::error::Error;

use thiserror::Error;

use gimbal_core::identifier::Id;

use crate::layout::engines::EngineKind;

/// The main error type for Gimbal operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The position preservation store has no entry for a node that an
    /// incremental strategy requires. The orchestrator treats this as a
    /// signal to fall back, not as a fatal condition.
    #[error("no preserved state recorded for node `{0}`")]
    MissingPreservedState(Id),

    #[error("no `{0}` layout engine is registered")]
    EngineUnavailable(EngineKind),

    #[error("layout engine `{kind}` failed")]
    Engine {
        kind: EngineKind,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("malformed node `{id}`: {reason}")]
    MalformedNode { id: Id, reason: String },

    #[error("malformed edge `{id}`: {reason}")]
    MalformedEdge { id: Id, reason: String },

    #[error("viewport must have finite, positive dimensions")]
    InvalidViewport,
}

impl LayoutError {
    /// Wraps a failure reported by a layout engine.
    pub(crate) fn engine(kind: EngineKind, source: Box<dyn Error + Send + Sync>) -> Self {
        Self::Engine { kind, source }
    }

    pub(crate) fn malformed_node(id: Id, reason: impl Into<String>) -> Self {
        Self::MalformedNode {
            id,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_edge(id: Id, reason: impl Into<String>) -> Self {
        Self::MalformedEdge {
            id,
            reason: reason.into(),
        }
    }
}
