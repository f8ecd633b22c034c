//! Model persistence.

mod format;

pub use format::{ModelFormat, ModelHeader};
