//! One named slab of prototype values across all nodes of a map.

use crate::config::LayerConfig;
use crate::distance::DistanceMetric;
use crate::error::{KohonenError, Result};
use crate::norm::Normalizer;
use crate::table::Table;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// A layer of the map.
///
/// Each node owns `columns` values of the layer, stored node-major in one
/// flat array. Values are kept in normalized space; the layer's
/// normalizers convert to and from raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    columns: Vec<String>,
    categorical: bool,
    metric: DistanceMetric,
    weight: f64,
    normalizers: Vec<Normalizer>,
    nodes: usize,
    data: Vec<f64>,
}

impl Layer {
    /// Creates a numeric layer with identity normalizers and weight 1.
    ///
    /// `data` holds `nodes * columns.len()` normalized values.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        metric: DistanceMetric,
        nodes: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(KohonenError::Config(
                "a layer needs at least one column".to_string(),
            ));
        }
        if data.len() != nodes * columns.len() {
            return Err(KohonenError::Shape {
                len: data.len(),
                columns: columns.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            normalizers: vec![Normalizer::Identity; columns.len()],
            columns,
            categorical: false,
            metric,
            weight: 1.0,
            nodes,
            data,
        })
    }

    /// Creates a layer from its definition.
    ///
    /// Without initial data, values are drawn uniformly from `[0, 1)`.
    pub fn from_config<R: Rng>(config: &LayerConfig, nodes: usize, rng: &mut R) -> Result<Self> {
        let data = match &config.data {
            Some(data) => data.clone(),
            None => {
                let uniform = Uniform::new(0.0, 1.0);
                (0..nodes * config.columns.len())
                    .map(|_| uniform.sample(rng))
                    .collect()
            }
        };

        let mut layer = Self::new(
            config.name.clone(),
            config.columns.clone(),
            config.metric_or_default(),
            nodes,
            data,
        )?
        .with_weight(config.weight)?
        .with_categorical(config.categorical);

        if !config.norm.is_empty() {
            layer = layer.with_normalizers(config.norm.clone())?;
        }
        if config.categorical && layer.normalizers.iter().any(|n| *n != Normalizer::Identity) {
            return Err(KohonenError::Config(format!(
                "categorical layer '{}' cannot be normalized",
                layer.name
            )));
        }

        if config.denormalized && config.data.is_some() {
            for node in 0..nodes {
                for col in 0..layer.columns.len() {
                    let raw = layer.get(node, col);
                    let norm = layer.normalizers[col].normalize(raw);
                    layer.set(node, col, norm);
                }
            }
        }

        Ok(layer)
    }

    /// Sets the layer weight in the combined distance.
    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(KohonenError::Config(format!(
                "layer '{}' has invalid weight {}",
                self.name, weight
            )));
        }
        self.weight = weight;
        Ok(self)
    }

    /// Marks the layer as categorical.
    pub fn with_categorical(mut self, categorical: bool) -> Self {
        self.categorical = categorical;
        self
    }

    /// Replaces the per-column normalizers.
    pub fn with_normalizers(mut self, normalizers: Vec<Normalizer>) -> Result<Self> {
        if normalizers.len() != self.columns.len() {
            return Err(KohonenError::Config(format!(
                "layer '{}' has {} columns but {} normalizers",
                self.name,
                self.columns.len(),
                normalizers.len()
            )));
        }
        self.normalizers = normalizers;
        Ok(self)
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// True for one-hot categorical layers.
    pub fn is_categorical(&self) -> bool {
        self.categorical
    }

    /// Distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Weight in the combined distance.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Per-column normalizers.
    pub fn normalizers(&self) -> &[Normalizer] {
        &self.normalizers
    }

    /// Number of nodes.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// All values, node-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(&self, node: usize, column: usize) -> usize {
        assert!(
            node < self.nodes && column < self.columns.len(),
            "node {} column {} outside layer '{}'",
            node,
            column,
            self.name
        );
        node * self.columns.len() + column
    }

    /// Prototype vector of a node.
    ///
    /// # Panics
    ///
    /// Panics if `node >= nodes()`.
    #[inline]
    pub fn node(&self, node: usize) -> &[f64] {
        let start = self.offset(node, 0);
        &self.data[start..start + self.columns.len()]
    }

    /// Mutable prototype vector of a node.
    ///
    /// # Panics
    ///
    /// Panics if `node >= nodes()`.
    #[inline]
    pub fn node_mut(&mut self, node: usize) -> &mut [f64] {
        let start = self.offset(node, 0);
        let width = self.columns.len();
        &mut self.data[start..start + width]
    }

    /// Normalized value of one node column.
    #[inline]
    pub fn get(&self, node: usize, column: usize) -> f64 {
        self.data[self.offset(node, column)]
    }

    /// Sets the normalized value of one node column.
    #[inline]
    pub fn set(&mut self, node: usize, column: usize, value: f64) {
        let offset = self.offset(node, column);
        self.data[offset] = value;
    }

    /// Distance from a node to a normalized input vector of this layer's
    /// width. [`Som::distance`](crate::som::Som::distance) checks the width.
    #[inline]
    pub(crate) fn distance(&self, node: usize, input: &[f64]) -> f64 {
        self.metric.distance(self.node(node), input)
    }

    /// Prototype vector of a node in raw (denormalized) space.
    pub fn denormalized_node(&self, node: usize) -> Vec<f64> {
        self.node(node)
            .iter()
            .zip(&self.normalizers)
            .map(|(v, n)| n.denormalize(*v))
            .collect()
    }

    /// Fails unless the table's columns equal this layer's columns, in order.
    pub fn check_table(&self, table: &Table) -> Result<()> {
        if table.columns() != self.columns.as_slice() {
            return Err(KohonenError::ColumnMismatch {
                layer: self.name.clone(),
                expected: self.columns.clone(),
                found: table.columns().to_vec(),
            });
        }
        Ok(())
    }

    /// Fits the still-unfitted normalizers from the matching table columns.
    ///
    /// Normalizers that already carry parameters, e.g. from a loaded model,
    /// are kept as they are.
    pub fn initialize_normalizers(&mut self, table: &Table) {
        for (col, norm) in self.normalizers.iter_mut().enumerate() {
            if norm.needs_fit() {
                norm.initialize(table, col);
            }
        }
    }

    /// Normalized copy of a raw table.
    pub fn normalize_table(&self, table: &Table) -> Table {
        let mut out = table.clone();
        for row in 0..out.rows() {
            for (v, n) in out.row_mut(row).iter_mut().zip(&self.normalizers) {
                *v = n.normalize(*v);
            }
        }
        out
    }

    /// Exports the layer definition, with node values in normalized or raw
    /// space.
    pub fn to_config(&self, denormalized: bool) -> LayerConfig {
        let data = if denormalized {
            (0..self.nodes)
                .flat_map(|node| self.denormalized_node(node))
                .collect()
        } else {
            self.data.clone()
        };

        LayerConfig {
            name: self.name.clone(),
            columns: self.columns.clone(),
            categorical: self.categorical,
            metric: Some(self.metric),
            norm: self.normalizers.clone(),
            weight: self.weight,
            data: Some(data),
            denormalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_layer_creation() {
        let layer = Layer::new(
            "L1",
            cols(&["x", "y"]),
            DistanceMetric::Euclidean,
            3,
            vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        )
        .unwrap();
        assert_eq!(layer.nodes(), 3);
        assert_eq!(layer.node(1), &[1.0, 1.0]);
        assert_eq!(layer.get(2, 1), 2.0);
        assert_eq!(layer.normalizers().len(), 2);
        assert_eq!(layer.weight(), 1.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Layer::new("L1", cols(&["x", "y"]), DistanceMetric::Euclidean, 3, vec![0.0; 5])
            .unwrap_err();
        assert!(matches!(err, KohonenError::Shape { .. }));
    }

    #[test]
    fn test_random_initialization() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = LayerConfig::new("L1", &["a", "b", "c"]);
        let layer = Layer::from_config(&config, 10, &mut rng).unwrap();
        assert_eq!(layer.data().len(), 30);
        assert!(layer.data().iter().all(|v| (0.0..1.0).contains(v)));
        assert!(layer.data().iter().any(|&v| v != layer.data()[0]));
    }

    #[test]
    fn test_config_validation() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut config = LayerConfig::new("L1", &["a", "b"]);
        config.norm = vec![Normalizer::gaussian()];
        assert!(Layer::from_config(&config, 4, &mut rng).is_err());

        let mut config = LayerConfig::new("L1", &["a"]);
        config.weight = -1.0;
        assert!(Layer::from_config(&config, 4, &mut rng).is_err());

        let mut config = LayerConfig::new("cls", &["a", "b"]);
        config.categorical = true;
        config.norm = vec![Normalizer::gaussian(), Normalizer::Identity];
        assert!(Layer::from_config(&config, 4, &mut rng).is_err());
    }

    #[test]
    fn test_denormalized_config_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let layer = Layer::new("L1", cols(&["a"]), DistanceMetric::Euclidean, 2, vec![0.5, -1.0])
            .unwrap()
            .with_normalizers(vec![Normalizer::Gaussian { mean: 10.0, std: 2.0 }])
            .unwrap();

        let exported = layer.to_config(true);
        assert_eq!(exported.data.as_deref(), Some(&[11.0, 8.0][..]));

        let back = Layer::from_config(&exported, 2, &mut rng).unwrap();
        assert_eq!(back.data(), layer.data());
    }

    #[test]
    fn test_initialize_keeps_fitted_normalizers() {
        let mut layer = Layer::new("L1", cols(&["a", "b"]), DistanceMetric::Euclidean, 1, vec![0.0; 2])
            .unwrap()
            .with_normalizers(vec![
                Normalizer::Gaussian { mean: 10.0, std: 2.0 },
                Normalizer::uniform(),
            ])
            .unwrap();
        let table = Table::new(cols(&["a", "b"]), vec![100.0, 1.0, 300.0, 5.0]).unwrap();
        layer.initialize_normalizers(&table);
        assert_eq!(
            layer.normalizers(),
            &[
                Normalizer::Gaussian { mean: 10.0, std: 2.0 },
                Normalizer::Uniform { min: 1.0, max: 5.0 },
            ]
        );
    }

    #[test]
    fn test_check_table() {
        let layer = Layer::new("L1", cols(&["x", "y"]), DistanceMetric::Euclidean, 1, vec![0.0; 2])
            .unwrap();
        let good = Table::new(cols(&["x", "y"]), vec![1.0, 2.0]).unwrap();
        let swapped = Table::new(cols(&["y", "x"]), vec![1.0, 2.0]).unwrap();
        assert!(layer.check_table(&good).is_ok());
        assert!(matches!(
            layer.check_table(&swapped),
            Err(KohonenError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn test_normalize_table() {
        let layer = Layer::new("L1", cols(&["x"]), DistanceMetric::Euclidean, 1, vec![0.0])
            .unwrap()
            .with_normalizers(vec![Normalizer::Uniform { min: 2.0, max: 4.0 }])
            .unwrap();
        let table = Table::new(cols(&["x"]), vec![2.0, 3.0, f64::NAN]).unwrap();
        let norm = layer.normalize_table(&table);
        assert_eq!(norm.get(0, 0), 0.0);
        assert_eq!(norm.get(1, 0), 0.5);
        assert!(norm.get(2, 0).is_nan());
    }
}
