//! Vector dissimilarity measures.
//!
//! All metrics compare a node's prototype `x` (never missing) against a
//! query `y` whose missing components are NaN. Missing components never
//! contribute to the result.

pub mod grid;

pub use grid::MapMetric;

use crate::registry::{text_form, Entry, Registry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static REGISTRY: Lazy<Registry<DistanceMetric>> = Lazy::new(|| {
    Registry::new(
        "distance metric",
        vec![
            Entry {
                name: "sumofsquares",
                arities: &[0],
                build: |_| Ok(DistanceMetric::SumOfSquares),
            },
            Entry {
                name: "euclidean",
                arities: &[0],
                build: |_| Ok(DistanceMetric::Euclidean),
            },
            Entry {
                name: "manhattan",
                arities: &[0],
                build: |_| Ok(DistanceMetric::Manhattan),
            },
            Entry {
                name: "hamming",
                arities: &[0],
                build: |_| Ok(DistanceMetric::Hamming),
            },
        ],
    )
});

/// Distance metric between a prototype and a (possibly incomplete) input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceMetric {
    /// Sum of squared differences.
    SumOfSquares,
    /// Square root of the sum of squared differences.
    #[default]
    Euclidean,
    /// Sum of absolute differences.
    Manhattan,
    /// Share of positions on different sides of 0.5, for one-hot
    /// categorical data.
    Hamming,
}

impl DistanceMetric {
    /// Registry of all distance metrics.
    pub fn registry() -> &'static Registry<DistanceMetric> {
        &REGISTRY
    }

    /// Identifier of this metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::SumOfSquares => "sumofsquares",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Hamming => "hamming",
        }
    }

    /// Computes the distance from prototype `x` to input `y`.
    ///
    /// Positions where `y` is NaN are skipped. Hamming divides by the full
    /// vector length, even when some positions are missing.
    pub fn distance(&self, x: &[f64], y: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "Prototype and input lengths must match");

        match self {
            DistanceMetric::SumOfSquares => sum_of_squares(x, y),
            DistanceMetric::Euclidean => sum_of_squares(x, y).sqrt(),
            DistanceMetric::Manhattan => x
                .iter()
                .zip(y.iter())
                .filter(|(_, b)| !b.is_nan())
                .map(|(a, b)| (a - b).abs())
                .sum(),
            DistanceMetric::Hamming => {
                if x.is_empty() {
                    return 0.0;
                }
                let differing = x
                    .iter()
                    .zip(y.iter())
                    .filter(|(a, b)| !b.is_nan() && ((**a < 0.5) != (**b < 0.5)))
                    .count();
                differing as f64 / x.len() as f64
            }
        }
    }
}

#[inline]
fn sum_of_squares(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y.iter())
        .filter(|(_, b)| !b.is_nan())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

text_form!(DistanceMetric, DistanceMetric::registry());
