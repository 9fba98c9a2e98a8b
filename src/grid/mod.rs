//! Grid math — micro-unit numerics, ladder geometry, and pivot location.

pub mod geometry;
pub mod numeric;
pub mod pivot;

pub use geometry::GridGeometry;
