//! Spatial index for fast BMU search.

mod kdtree;

pub use kdtree::KdTree;
