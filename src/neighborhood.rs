//! Neighborhood functions: how strongly a node follows the BMU's update.

use crate::registry::{text_form, Entry, Registry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static REGISTRY: Lazy<Registry<Neighborhood>> = Lazy::new(|| {
    Registry::new(
        "neighborhood",
        vec![
            Entry {
                name: "gaussian",
                arities: &[0],
                build: |_| Ok(Neighborhood::Gaussian),
            },
            Entry {
                name: "cutgaussian",
                arities: &[0],
                build: |_| Ok(Neighborhood::CutGaussian),
            },
            Entry {
                name: "linear",
                arities: &[0],
                build: |_| Ok(Neighborhood::Linear),
            },
            Entry {
                name: "box",
                arities: &[0],
                build: |_| Ok(Neighborhood::Box),
            },
        ],
    )
});

/// Converts a grid distance and the current radius into an update weight
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Neighborhood {
    /// `exp(-d² / 2r²)` everywhere on the map.
    #[default]
    Gaussian,
    /// Gaussian weight, zero beyond the radius.
    CutGaussian,
    /// `1 - d/r` inside the radius.
    Linear,
    /// 1 inside the radius.
    Box,
}

impl Neighborhood {
    /// Registry of all neighborhood functions.
    pub fn registry() -> &'static Registry<Neighborhood> {
        &REGISTRY
    }

    /// Identifier of this function.
    pub fn name(&self) -> &'static str {
        match self {
            Neighborhood::Gaussian => "gaussian",
            Neighborhood::CutGaussian => "cutgaussian",
            Neighborhood::Linear => "linear",
            Neighborhood::Box => "box",
        }
    }

    /// Update weight of node `(x2, y2)` for a BMU at `(x1, y1)`.
    ///
    /// A radius of zero (or less) leaves only the BMU itself with weight 1.
    pub fn weight(&self, x1: usize, y1: usize, x2: usize, y2: usize, radius: f64) -> f64 {
        let dx = x1.abs_diff(x2) as f64;
        let dy = y1.abs_diff(y2) as f64;
        let dist_sq = dx * dx + dy * dy;

        if radius <= 0.0 {
            return if dist_sq == 0.0 { 1.0 } else { 0.0 };
        }

        match self {
            Neighborhood::Gaussian => gaussian(dist_sq, radius),
            Neighborhood::CutGaussian => {
                if dist_sq > radius * radius {
                    0.0
                } else {
                    gaussian(dist_sq, radius)
                }
            }
            Neighborhood::Linear => {
                let dist = dist_sq.sqrt();
                if dist > radius {
                    0.0
                } else {
                    1.0 - dist / radius
                }
            }
            Neighborhood::Box => {
                if dist_sq > radius * radius {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    /// Grid offset beyond which [`weight`](Self::weight) is always zero, or
    /// `-1` if every node must be evaluated.
    pub fn max_radius(&self, radius: f64) -> i64 {
        match self {
            Neighborhood::Gaussian => -1,
            Neighborhood::CutGaussian | Neighborhood::Linear | Neighborhood::Box => {
                radius.max(0.0).floor() as i64
            }
        }
    }
}

#[inline]
fn gaussian(dist_sq: f64, radius: f64) -> f64 {
    (-dist_sq / (2.0 * radius * radius)).exp()
}

impl fmt::Display for Neighborhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

text_form!(Neighborhood, Neighborhood::registry());
