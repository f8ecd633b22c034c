//! Configuration for map construction and training.

use crate::decay::Decay;
use crate::distance::{DistanceMetric, MapMetric};
use crate::neighborhood::Neighborhood;
use crate::norm::Normalizer;
use crate::som::Size;
use serde::{Deserialize, Serialize};

/// Geometry and layer definitions of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SomConfig {
    /// Grid size.
    pub size: Size,

    /// Layer definitions, in order. Must not be empty.
    pub layers: Vec<LayerConfig>,

    /// Seed for random weight initialization.
    /// Default: None (random).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            size: Size::new(10, 10),
            layers: Vec::new(),
            seed: None,
        }
    }
}

/// Definition of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Layer name, unique within the map.
    pub name: String,

    /// Column names, in order.
    pub columns: Vec<String>,

    /// Categorical (one-hot) layer.
    /// Default: false.
    #[serde(default)]
    pub categorical: bool,

    /// Distance metric.
    /// Default: euclidean, or hamming for categorical layers.
    #[serde(default)]
    pub metric: Option<DistanceMetric>,

    /// Normalizer per column. Empty means identity for every column.
    #[serde(default)]
    pub norm: Vec<Normalizer>,

    /// Contribution of this layer to the combined BMU distance.
    /// Default: 1.0.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Initial node values, `nodes * columns` long, node-major.
    /// Default: None (uniform random in `[0, 1)`).
    #[serde(default)]
    pub data: Option<Vec<f64>>,

    /// `data` holds raw values that must be normalized on load.
    /// Default: false.
    #[serde(default)]
    pub denormalized: bool,
}

fn default_weight() -> f64 {
    1.0
}

impl LayerConfig {
    /// Creates a numeric layer definition with default settings.
    pub fn new<S: Into<String>>(name: S, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            categorical: false,
            metric: None,
            norm: Vec::new(),
            weight: 1.0,
            data: None,
            denormalized: false,
        }
    }

    /// The configured metric, or the default for the layer type.
    pub fn metric_or_default(&self) -> DistanceMetric {
        self.metric.unwrap_or(if self.categorical {
            DistanceMetric::Hamming
        } else {
            DistanceMetric::Euclidean
        })
    }
}

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the training rows.
    /// Default: 100.
    pub epochs: usize,

    /// Learning rate schedule.
    /// Default: linear 0.5 -> 0.01.
    pub learning_rate: Decay,

    /// Neighborhood radius schedule, in grid units.
    /// Default: linear 5 -> 0.5.
    pub radius: Decay,

    /// Neighborhood function.
    /// Default: gaussian.
    #[serde(default)]
    pub neighborhood: Neighborhood,

    /// Grid metric for reporting the topographic error after each epoch.
    /// Default: None (not reported).
    #[serde(default)]
    pub map_metric: Option<MapMetric>,

    /// Random seed for row shuffling.
    /// Default: None (random).
    #[serde(default)]
    pub seed: Option<u64>,

    /// ViSom regularization coefficient. Accepted but not applied.
    /// Default: None.
    #[serde(default)]
    pub visom_lambda: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: Decay::Linear {
                start: 0.5,
                end: 0.01,
            },
            radius: Decay::Linear {
                start: 5.0,
                end: 0.5,
            },
            neighborhood: Neighborhood::Gaussian,
            map_metric: None,
            seed: None,
            visom_lambda: None,
        }
    }
}
