//! Decay schedules for the learning rate and the neighborhood radius.

use crate::error::KohonenError;
use crate::registry::{format_spec, text_form, Entry, Registry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static REGISTRY: Lazy<Registry<Decay>> = Lazy::new(|| {
    Registry::new(
        "decay",
        vec![
            Entry {
                name: "constant",
                arities: &[1],
                build: |a| Ok(Decay::Constant { value: a[0] }),
            },
            Entry {
                name: "linear",
                arities: &[2],
                build: |a| {
                    Ok(Decay::Linear {
                        start: a[0],
                        end: a[1],
                    })
                },
            },
            Entry {
                name: "power",
                arities: &[2],
                build: |a| {
                    if a[0] <= 0.0 || a[1] <= 0.0 {
                        return Err(KohonenError::InvalidArgument {
                            name: "power".to_string(),
                            message: "start and end must be positive".to_string(),
                        });
                    }
                    Ok(Decay::Power {
                        start: a[0],
                        end: a[1],
                    })
                },
            },
            Entry {
                name: "polynomial",
                arities: &[3],
                build: |a| {
                    if !a[2].is_finite() || a[2] <= 0.0 {
                        return Err(KohonenError::InvalidArgument {
                            name: "polynomial".to_string(),
                            message: "exponent must be positive".to_string(),
                        });
                    }
                    Ok(Decay::Polynomial {
                        start: a[0],
                        end: a[1],
                        exponent: a[2],
                    })
                },
            },
        ],
    )
});

/// Maps `(epoch, total epochs)` to a scalar moving from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Decay {
    /// The same value in every epoch.
    Constant {
        /// The value.
        value: f64,
    },
    /// Linear interpolation.
    Linear {
        /// Value at epoch 0.
        start: f64,
        /// Value at the last epoch.
        end: f64,
    },
    /// Geometric interpolation, `start * (end/start)^t`.
    Power {
        /// Value at epoch 0.
        start: f64,
        /// Value at the last epoch.
        end: f64,
    },
    /// `end + (start - end) * (1 - t)^exponent`.
    Polynomial {
        /// Value at epoch 0.
        start: f64,
        /// Value at the last epoch.
        end: f64,
        /// Curve exponent; 1 is linear.
        exponent: f64,
    },
}

impl Decay {
    /// Registry of all decay schedules.
    pub fn registry() -> &'static Registry<Decay> {
        &REGISTRY
    }

    /// Identifier of this schedule.
    pub fn name(&self) -> &'static str {
        match self {
            Decay::Constant { .. } => "constant",
            Decay::Linear { .. } => "linear",
            Decay::Power { .. } => "power",
            Decay::Polynomial { .. } => "polynomial",
        }
    }

    /// Value at epoch 0.
    pub fn start(&self) -> f64 {
        match *self {
            Decay::Constant { value } => value,
            Decay::Linear { start, .. }
            | Decay::Power { start, .. }
            | Decay::Polynomial { start, .. } => start,
        }
    }

    /// Value at the final epoch.
    pub fn end(&self) -> f64 {
        match *self {
            Decay::Constant { value } => value,
            Decay::Linear { end, .. } | Decay::Power { end, .. } | Decay::Polynomial { end, .. } => {
                end
            }
        }
    }

    /// Value of the schedule at `epoch` out of `total`.
    ///
    /// With `total == 0` the start value is returned.
    pub fn decay(&self, epoch: usize, total: usize) -> f64 {
        let t = if total == 0 {
            0.0
        } else {
            epoch as f64 / total as f64
        };

        match *self {
            Decay::Constant { value } => value,
            Decay::Linear { start, end } => start + (end - start) * t,
            Decay::Power { start, end } => start * (end / start).powf(t),
            Decay::Polynomial {
                start,
                end,
                exponent,
            } => end + (start - end) * (1.0 - t).powf(exponent),
        }
    }

    fn args(&self) -> Vec<f64> {
        match *self {
            Decay::Constant { value } => vec![value],
            Decay::Linear { start, end } | Decay::Power { start, end } => vec![start, end],
            Decay::Polynomial {
                start,
                end,
                exponent,
            } => vec![start, end, exponent],
        }
    }
}

impl fmt::Display for Decay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_spec(self.name(), &self.args()))
    }
}

text_form!(Decay, Decay::registry());

#[cfg(test)]
mod tests {
    use super::*;

    fn schedules() -> Vec<Decay> {
        vec![
            Decay::Constant { value: 0.3 },
            Decay::Linear {
                start: 0.5,
                end: 0.01,
            },
            Decay::Power {
                start: 0.5,
                end: 0.01,
            },
            Decay::Polynomial {
                start: 0.5,
                end: 0.01,
                exponent: 2.0,
            },
            Decay::Linear {
                start: 1.0,
                end: 8.0,
            },
        ]
    }

    #[test]
    fn test_endpoints() {
        for d in schedules() {
            assert!((d.decay(0, 100) - d.start()).abs() < 1e-10, "{d}");
            assert!((d.decay(100, 100) - d.end()).abs() < 1e-10, "{d}");
        }
    }

    #[test]
    fn test_monotonic() {
        for d in [
            Decay::Linear {
                start: 0.5,
                end: 0.01,
            },
            Decay::Power {
                start: 0.5,
                end: 0.01,
            },
            Decay::Power {
                start: 1.0,
                end: 10.0,
            },
        ] {
            let ascending = d.end() > d.start();
            let mut prev = d.decay(0, 50);
            for epoch in 1..=50 {
                let v = d.decay(epoch, 50);
                if ascending {
                    assert!(v >= prev, "{d} at {epoch}");
                } else {
                    assert!(v <= prev, "{d} at {epoch}");
                }
                prev = v;
            }
        }
    }

    #[test]
    fn test_midpoints() {
        let d = Decay::Linear {
            start: 1.0,
            end: 0.0,
        };
        assert!((d.decay(5, 10) - 0.5).abs() < 1e-10);

        let d = Decay::Power {
            start: 1.0,
            end: 0.01,
        };
        assert!((d.decay(5, 10) - 0.1).abs() < 1e-10);

        let d = Decay::Polynomial {
            start: 1.0,
            end: 0.0,
            exponent: 2.0,
        };
        assert!((d.decay(5, 10) - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_zero_total() {
        let d = Decay::Linear {
            start: 0.5,
            end: 0.1,
        };
        assert_eq!(d.decay(0, 0), 0.5);
    }

    #[test]
    fn test_parse_roundtrip() {
        for d in schedules() {
            let text = d.to_string();
            assert_eq!(text.parse::<Decay>().unwrap(), d, "{text}");
        }
        assert_eq!(
            "linear 0.5 0.01".parse::<Decay>().unwrap(),
            Decay::Linear {
                start: 0.5,
                end: 0.01
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "exponential 1 2".parse::<Decay>(),
            Err(KohonenError::UnknownIdentifier { .. })
        ));
        assert!(matches!(
            "linear 0.5".parse::<Decay>(),
            Err(KohonenError::ArgumentCount { found: 1, .. })
        ));
        assert!(matches!(
            "power 0 1".parse::<Decay>(),
            Err(KohonenError::InvalidArgument { .. })
        ));
        for text in ["polynomial 4 0.5 0", "polynomial 4 0.5 -2", "polynomial 4 0.5 inf"] {
            assert!(
                matches!(text.parse::<Decay>(), Err(KohonenError::InvalidArgument { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_polynomial_stays_within_bounds() {
        let decay: Decay = "polynomial 4 0.5 0.5".parse().unwrap();
        for epoch in 0..=10 {
            let v = decay.decay(epoch, 10);
            assert!((0.5..=4.0).contains(&v), "epoch {epoch}: {v}");
        }
    }

    #[test]
    fn test_serde_as_text() {
        let d = Decay::Polynomial {
            start: 0.5,
            end: 0.01,
            exponent: 2.0,
        };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"polynomial 0.5 0.01 2\"");
        let back: Decay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
