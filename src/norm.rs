//! Per-column value normalization.
//!
//! Normalizers are fitted once from the training data, before training,
//! and are immutable afterwards. Their textual form carries the fitted
//! parameters (`"gaussian 5.2 1.1"`), so a trained model round-trips. A
//! bare name (`"gaussian"`) yields an unfitted normalizer that behaves like
//! the identity until [`Normalizer::initialize`] is called.

use crate::error::KohonenError;
use crate::registry::{format_spec, text_form, Entry, Registry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static REGISTRY: Lazy<Registry<Normalizer>> = Lazy::new(|| {
    Registry::new(
        "normalizer",
        vec![
            Entry {
                name: "identity",
                arities: &[0],
                build: |_| Ok(Normalizer::Identity),
            },
            Entry {
                name: "gaussian",
                arities: &[0, 2],
                build: |a| match *a {
                    [mean, std] if !mean.is_finite() || !std.is_finite() || std <= 0.0 => {
                        Err(KohonenError::InvalidArgument {
                            name: "gaussian".to_string(),
                            message: format!(
                                "needs a finite mean and a positive std, got {} {}",
                                mean, std
                            ),
                        })
                    }
                    [mean, std] => Ok(Normalizer::Gaussian { mean, std }),
                    _ => Ok(Normalizer::gaussian()),
                },
            },
            Entry {
                name: "uniform",
                arities: &[0, 2],
                build: |a| match *a {
                    [min, max] if !min.is_finite() || !max.is_finite() || max <= min => {
                        Err(KohonenError::InvalidArgument {
                            name: "uniform".to_string(),
                            message: format!(
                                "needs finite bounds with min < max, got {} {}",
                                min, max
                            ),
                        })
                    }
                    [min, max] => Ok(Normalizer::Uniform { min, max }),
                    _ => Ok(Normalizer::uniform()),
                },
            },
        ],
    )
});

/// Column statistics a normalizer is fitted from.
///
/// Implementations ignore missing (NaN) values.
pub trait ColumnStats {
    /// Mean and standard deviation of a column.
    fn mean_std_dev(&self, column: usize) -> (f64, f64);

    /// Minimum and maximum of a column.
    fn range(&self, column: usize) -> (f64, f64);
}

/// Reversible transform applied to one column.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Normalizer {
    /// No transformation.
    #[default]
    Identity,
    /// Z-score: `(v - mean) / std`.
    Gaussian {
        /// Column mean.
        mean: f64,
        /// Column standard deviation.
        std: f64,
    },
    /// Min-max scaling to `[0, 1]`.
    Uniform {
        /// Column minimum.
        min: f64,
        /// Column maximum.
        max: f64,
    },
    /// Z-score normalizer awaiting its first fit. Acts as the identity.
    UnfittedGaussian,
    /// Min-max normalizer awaiting its first fit. Acts as the identity.
    UnfittedUniform,
}

impl Normalizer {
    /// Registry of all normalizers.
    pub fn registry() -> &'static Registry<Normalizer> {
        &REGISTRY
    }

    /// Unfitted z-score normalizer.
    pub fn gaussian() -> Self {
        Normalizer::UnfittedGaussian
    }

    /// Unfitted min-max normalizer.
    pub fn uniform() -> Self {
        Normalizer::UnfittedUniform
    }

    /// True while the normalizer still needs [`initialize`](Self::initialize).
    pub fn needs_fit(&self) -> bool {
        matches!(self, Normalizer::UnfittedGaussian | Normalizer::UnfittedUniform)
    }

    /// Identifier of this normalizer.
    pub fn name(&self) -> &'static str {
        match self {
            Normalizer::Identity => "identity",
            Normalizer::Gaussian { .. } | Normalizer::UnfittedGaussian => "gaussian",
            Normalizer::Uniform { .. } | Normalizer::UnfittedUniform => "uniform",
        }
    }

    /// Fits the parameters from `column` of `source`, replacing any
    /// previous fit.
    ///
    /// Degenerate columns (constant or entirely missing) get a unit scale so
    /// that normalization stays invertible.
    pub fn initialize<S: ColumnStats + ?Sized>(&mut self, source: &S, column: usize) {
        *self = match *self {
            Normalizer::Identity => Normalizer::Identity,
            Normalizer::Gaussian { .. } | Normalizer::UnfittedGaussian => {
                let (m, s) = source.mean_std_dev(column);
                Normalizer::Gaussian {
                    mean: if m.is_finite() { m } else { 0.0 },
                    std: if s.is_finite() && s > 1e-12 { s } else { 1.0 },
                }
            }
            Normalizer::Uniform { .. } | Normalizer::UnfittedUniform => {
                let (lo, hi) = source.range(column);
                if lo.is_finite() && hi.is_finite() {
                    Normalizer::Uniform {
                        min: lo,
                        max: if hi - lo > 1e-12 { hi } else { lo + 1.0 },
                    }
                } else {
                    Normalizer::Uniform { min: 0.0, max: 1.0 }
                }
            }
        };
    }

    /// Transforms a raw value. NaN stays NaN.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        match *self {
            Normalizer::Identity | Normalizer::UnfittedGaussian | Normalizer::UnfittedUniform => value,
            Normalizer::Gaussian { mean, std } => (value - mean) / std,
            Normalizer::Uniform { min, max } => (value - min) / (max - min),
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    #[inline]
    pub fn denormalize(&self, value: f64) -> f64 {
        match *self {
            Normalizer::Identity | Normalizer::UnfittedGaussian | Normalizer::UnfittedUniform => value,
            Normalizer::Gaussian { mean, std } => value * std + mean,
            Normalizer::Uniform { min, max } => value * (max - min) + min,
        }
    }

    fn args(&self) -> Vec<f64> {
        match *self {
            Normalizer::Gaussian { mean, std } => vec![mean, std],
            Normalizer::Uniform { min, max } => vec![min, max],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_spec(self.name(), &self.args()))
    }
}

text_form!(Normalizer, Normalizer::registry());

#[cfg(test)]
mod tests {
    use super::*;

    struct Column(Vec<f64>);

    impl ColumnStats for Column {
        fn mean_std_dev(&self, _column: usize) -> (f64, f64) {
            let n = self.0.len() as f64;
            let mean = self.0.iter().sum::<f64>() / n;
            let var = self.0.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        }

        fn range(&self, _column: usize) -> (f64, f64) {
            let min = self.0.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = self.0.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            (min, max)
        }
    }

    #[test]
    fn test_gaussian_fit() {
        let data = Column(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let mut n = Normalizer::gaussian();
        n.initialize(&data, 0);
        assert_eq!(n, Normalizer::Gaussian { mean: 5.0, std: 2.0 });
        assert!((n.normalize(9.0) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_uniform_fit() {
        let data = Column(vec![-1.0, 0.0, 3.0]);
        let mut n = Normalizer::uniform();
        n.initialize(&data, 0);
        assert!((n.normalize(-1.0)).abs() < 1e-10);
        assert!((n.normalize(3.0) - 1.0).abs() < 1e-10);
        assert!((n.normalize(1.0) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_roundtrip_values() {
        let data = Column(vec![10.0, 12.5, 11.0, 30.0, -4.0]);
        for mut n in [Normalizer::Identity, Normalizer::gaussian(), Normalizer::uniform()] {
            n.initialize(&data, 0);
            for v in [-100.0, -4.0, 0.0, 3.25, 11.0, 1e6] {
                let back = n.denormalize(n.normalize(v));
                assert!((back - v).abs() < 1e-6 * v.abs().max(1.0), "{n} {v}");
            }
        }
    }

    #[test]
    fn test_degenerate_columns() {
        let constant = Column(vec![3.0, 3.0, 3.0]);
        let mut g = Normalizer::gaussian();
        g.initialize(&constant, 0);
        assert_eq!(g, Normalizer::Gaussian { mean: 3.0, std: 1.0 });

        let mut u = Normalizer::uniform();
        u.initialize(&constant, 0);
        assert_eq!(u, Normalizer::Uniform { min: 3.0, max: 4.0 });
    }

    #[test]
    fn test_nan_passes_through() {
        let n = Normalizer::Gaussian { mean: 1.0, std: 2.0 };
        assert!(n.normalize(f64::NAN).is_nan());
        assert!(n.denormalize(f64::NAN).is_nan());
    }

    #[test]
    fn test_parse_roundtrip() {
        for n in [
            Normalizer::Identity,
            Normalizer::Gaussian { mean: 5.5, std: 0.25 },
            Normalizer::Uniform { min: -2.0, max: 8.0 },
        ] {
            assert_eq!(n.to_string().parse::<Normalizer>().unwrap(), n);
        }
        assert_eq!("gaussian".parse::<Normalizer>().unwrap(), Normalizer::gaussian());
        assert_eq!(Normalizer::uniform().to_string(), "uniform");
        assert!("gaussian 1".parse::<Normalizer>().is_err());
        assert!("log".parse::<Normalizer>().is_err());
    }

    #[test]
    fn test_unfitted_acts_as_identity() {
        for n in [Normalizer::gaussian(), Normalizer::uniform()] {
            assert!(n.needs_fit());
            assert_eq!(n.normalize(7.5), 7.5);
            assert_eq!(n.denormalize(-3.0), -3.0);
        }
        assert!(!Normalizer::Identity.needs_fit());
        assert!(!Normalizer::Gaussian { mean: 0.0, std: 1.0 }.needs_fit());

        let mut n = Normalizer::gaussian();
        n.initialize(&Column(vec![1.0, 3.0]), 0);
        assert!(!n.needs_fit());
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        for text in [
            "gaussian 5 0",
            "gaussian 5 -1",
            "gaussian nan 1",
            "uniform 2 2",
            "uniform 3 1",
            "uniform 0 inf",
        ] {
            let err = text.parse::<Normalizer>().unwrap_err();
            assert!(matches!(err, KohonenError::InvalidArgument { .. }), "{text}");
        }
        assert!("gaussian 5 0.5".parse::<Normalizer>().is_ok());
        assert!("uniform -1 1".parse::<Normalizer>().is_ok());
    }
}
