//! Incremental layout orchestration.
//!
//! This module decides, per layout request, how much of the diagram actually
//! needs to move and invokes the opaque layout engine on as little of it as
//! possible.
//!
//! # Pipeline Position
//!
//! ```text
//! Host view change (expand / collapse / drill / edit)
//!     ↓ changes
//! ChangeSet (stable / changed / newly visible)
//!     ↓ incremental (this module)
//! Preserve | NeighborShift | Partial | Full
//!     ↓ engines
//! Positioned nodes and routed edges
//! ```
//!
//! # Submodules
//!
//! - [`changes`] - Classifies the transition between two visible states
//! - [`engines`] - The opaque layout-engine boundary and configuration selection
//! - [`incremental`] - The strategy decision procedure and movement clamp
//! - [`preserve`] - Last-known positions and structure per node
//! - [`shift`] - Expand-in-place with localized sibling displacement

pub mod changes;
pub mod engines;
pub mod incremental;
pub mod preserve;
pub mod shift;

pub use incremental::{IncrementalLayouter, LayoutOutcome, LayoutRequest, Strategy};
