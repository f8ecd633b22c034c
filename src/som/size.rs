//! Grid geometry.

use serde::{Deserialize, Serialize};

/// Width and height of the node grid.
///
/// Nodes are numbered column by column: `index = y + x * height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Number of columns (x extent).
    pub width: usize,
    /// Number of rows (y extent).
    pub height: usize,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of nodes.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.width * self.height
    }

    /// Converts a node index to `(x, y)` grid coordinates.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.nodes());
        (index / self.height, index % self.height)
    }

    /// Converts grid coordinates to a node index.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y + x * self.height
    }
}
