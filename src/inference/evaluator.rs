//! Aggregate map quality metrics.

use crate::distance::MapMetric;
use crate::inference::Predictor;
use crate::som::sample_row;
use rayon::prelude::*;

/// Summarizes how well a map fits the rows of a [`Predictor`].
///
/// BMUs are computed once on construction.
pub struct Evaluator<'p, 'a> {
    predictor: &'p Predictor<'a>,
    bmus: Vec<(usize, f64)>,
}

impl<'p, 'a> Evaluator<'p, 'a> {
    /// Creates an evaluator.
    pub fn new(predictor: &'p Predictor<'a>) -> Self {
        Self {
            predictor,
            bmus: predictor.bmus(),
        }
    }

    /// Divides a total over all rows by the row count.
    fn per_row(&self, total: f64) -> f64 {
        if self.bmus.is_empty() {
            0.0
        } else {
            total / self.bmus.len() as f64
        }
    }

    /// Mean BMU distance.
    pub fn quantization_error(&self) -> f64 {
        self.per_row(self.bmus.iter().map(|&(_, d)| d).sum())
    }

    /// Mean squared BMU distance.
    pub fn mean_squared_error(&self) -> f64 {
        self.per_row(self.bmus.iter().map(|&(_, d)| d * d).sum())
    }

    /// Root of [`Evaluator::mean_squared_error`].
    pub fn root_mean_squared_error(&self) -> f64 {
        self.mean_squared_error().sqrt()
    }

    /// Share of rows whose two nearest nodes are not adjacent on the grid
    /// under `metric`.
    ///
    /// Always uses the exact combined distance, whatever search the
    /// predictor is configured with.
    pub fn topographic_error(&self, metric: MapMetric) -> f64 {
        let som = self.predictor.som();
        let tables = self.predictor.normalized_tables();

        let errors = (0..self.predictor.rows())
            .into_par_iter()
            .filter(|&row| {
                let sample = sample_row(tables, row);
                match som.find_k_nearest_unchecked(&sample, 2)[..] {
                    [(first, _), (second, _)] => {
                        let (x1, y1) = som.coords(first);
                        let (x2, y2) = som.coords(second);
                        !metric.adjacent(x1, y1, x2, y2)
                    }
                    _ => false,
                }
            })
            .count();

        self.per_row(errors as f64)
    }
}
