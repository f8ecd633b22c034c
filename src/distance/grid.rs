//! Distances between node coordinates on the map grid.

use crate::registry::{text_form, Entry, Registry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static REGISTRY: Lazy<Registry<MapMetric>> = Lazy::new(|| {
    Registry::new(
        "map metric",
        vec![
            Entry {
                name: "euclidean",
                arities: &[0],
                build: |_| Ok(MapMetric::Euclidean),
            },
            Entry {
                name: "manhattan",
                arities: &[0],
                build: |_| Ok(MapMetric::Manhattan),
            },
            Entry {
                name: "chebyshev",
                arities: &[0],
                build: |_| Ok(MapMetric::Chebyshev),
            },
        ],
    )
});

/// Grid topology metric, used to decide whether two nodes are adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MapMetric {
    /// Straight-line distance; only orthogonal neighbors are adjacent.
    Euclidean,
    /// Sum of axis offsets.
    Manhattan,
    /// Largest axis offset; diagonal neighbors are adjacent.
    #[default]
    Chebyshev,
}

impl MapMetric {
    /// Registry of all map metrics.
    pub fn registry() -> &'static Registry<MapMetric> {
        &REGISTRY
    }

    /// Identifier of this metric.
    pub fn name(&self) -> &'static str {
        match self {
            MapMetric::Euclidean => "euclidean",
            MapMetric::Manhattan => "manhattan",
            MapMetric::Chebyshev => "chebyshev",
        }
    }

    /// Distance between grid cells `(x1, y1)` and `(x2, y2)`.
    pub fn distance(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> f64 {
        let dx = x1.abs_diff(x2) as f64;
        let dy = y1.abs_diff(y2) as f64;
        match self {
            MapMetric::Euclidean => (dx * dx + dy * dy).sqrt(),
            MapMetric::Manhattan => dx + dy,
            MapMetric::Chebyshev => dx.max(dy),
        }
    }

    /// True if the two cells are at most one unit apart.
    #[inline]
    pub fn adjacent(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> bool {
        self.distance(x1, y1, x2, y2) <= 1.0
    }
}

impl fmt::Display for MapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

text_form!(MapMetric, MapMetric::registry());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        assert!((MapMetric::Euclidean.distance(0, 0, 3, 4) - 5.0).abs() < 1e-10);
        assert!((MapMetric::Manhattan.distance(0, 0, 3, 4) - 7.0).abs() < 1e-10);
        assert!((MapMetric::Chebyshev.distance(0, 0, 3, 4) - 4.0).abs() < 1e-10);
        assert!((MapMetric::Chebyshev.distance(3, 4, 0, 0) - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_adjacency() {
        assert!(MapMetric::Chebyshev.adjacent(1, 1, 2, 2));
        assert!(!MapMetric::Euclidean.adjacent(1, 1, 2, 2));
        assert!(!MapMetric::Manhattan.adjacent(1, 1, 2, 2));
        for metric in [MapMetric::Euclidean, MapMetric::Manhattan, MapMetric::Chebyshev] {
            assert!(metric.adjacent(1, 1, 1, 2));
            assert!(metric.adjacent(1, 1, 1, 1));
            assert!(!metric.adjacent(0, 0, 0, 2));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("chebyshev".parse::<MapMetric>().unwrap(), MapMetric::Chebyshev);
        assert!("hamming".parse::<MapMetric>().is_err());
    }
}
