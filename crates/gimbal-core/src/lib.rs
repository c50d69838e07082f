//! Gimbal Core Types and Definitions
//!
//! This crate provides the foundational types for the Gimbal layout system.
//! It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes, bounding boxes, and intersection predicates
//!   ([`geometry`] module)
//! - **Model**: Positioned diagram elements and relationships ([`model`] module)

pub mod geometry;
pub mod identifier;
pub mod model;
