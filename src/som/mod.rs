//! Multi-layer Self-Organizing Map.
//!
//! - **Grid**: node numbering and coordinates (size.rs)
//! - **Layers**: per-layer prototypes, metric and normalizers (layer.rs)
//! - **Map**: combined BMU search and neighborhood updates (map.rs)
//! - **Training**: epoch loop, progress streaming, label propagation (training.rs)

mod layer;
mod map;
mod size;
pub mod training;

pub use layer::Layer;
pub(crate) use map::sample_row;
pub use map::{Sample, Som};
pub use size::Size;
pub use training::{Trainer, TrainerState, TrainingHandle, TrainingProgress};
