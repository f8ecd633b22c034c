//! Inference and quality metrics over trained maps.

mod evaluator;
mod predictor;

pub use evaluator::Evaluator;
pub use predictor::{BmuRecord, Predictor};
