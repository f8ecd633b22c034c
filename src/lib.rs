//! # Kohonen - Multi-layer Self-Organizing Maps
//!
//! A Self-Organizing Map is a grid of prototype nodes that is iteratively
//! pulled towards the input rows, so that nearby nodes come to represent
//! similar inputs.
//!
//! ## Overview
//!
//! Every record is split into **layers**: independently normalized column
//! groups with their own distance metric and weight, e.g. numeric features
//! compared with Euclidean distance next to one-hot categories compared
//! with Hamming distance. The Best Matching Unit (BMU) of a record is the
//! node minimizing the weighted sum of the per-layer distances. Missing
//! values (NaN) are ignored both in the search and in the update.
//!
//! ## Key Features
//!
//! - **Pluggable strategies** for distances, neighborhoods, decay schedules
//!   and normalizers, configured by name (`"linear 0.5 0.01"`)
//! - **Epoch-based training** with seeded shuffling and streamed progress
//! - **Semi-supervised label propagation** into categorical layers
//! - **KD-tree accelerated** BMU search
//! - **Analytics**: quantization/topographic error, node density, per-node
//!   error, U-matrix, missing-value imputation, layer prediction
//! - **Persistence** as a compact binary file or human-readable JSON
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kohonen::{Evaluator, LayerConfig, Predictor, Som, SomConfig, Size, Table, Trainer, TrainingConfig};
//!
//! let config = SomConfig {
//!     size: Size::new(10, 10),
//!     layers: vec![LayerConfig::new("features", &["x", "y"])],
//!     seed: Some(42),
//! };
//! let som = Som::new(&config)?;
//!
//! let table = Table::new(vec!["x".into(), "y".into()], data)?;
//! let mut trainer = Trainer::new(som, vec![Some(table.clone())], TrainingConfig::default())?;
//! trainer.train();
//! let som = trainer.into_som();
//!
//! let predictor = Predictor::new(&som, vec![Some(table)])?.with_kdtree();
//! println!("QE = {}", Evaluator::new(&predictor).quantization_error());
//! ```
//!
//! ## Architecture
//!
//! - [`distance`], [`neighborhood`], [`decay`], [`norm`] - strategy families
//! - [`table`] - row-major input data
//! - [`som`] - map data model and training
//! - [`inference`] - prediction and quality metrics
//! - [`index`] - kd-tree for BMU search
//! - [`storage`] - model files

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decay;
pub mod distance;
pub mod error;
pub mod index;
pub mod inference;
pub mod neighborhood;
pub mod norm;
pub mod registry;
pub mod som;
pub mod storage;
pub mod table;

// Re-export commonly used types
pub use config::{LayerConfig, SomConfig, TrainingConfig};
pub use decay::Decay;
pub use distance::{DistanceMetric, MapMetric};
pub use error::{KohonenError, Result};
pub use index::KdTree;
pub use inference::{BmuRecord, Evaluator, Predictor};
pub use neighborhood::Neighborhood;
pub use norm::Normalizer;
pub use som::{Layer, Sample, Size, Som, Trainer, TrainerState, TrainingHandle, TrainingProgress};
pub use storage::{ModelFormat, ModelHeader};
pub use table::Table;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
