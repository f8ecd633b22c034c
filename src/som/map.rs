//! Multi-layer Self-Organizing Map.

use crate::config::SomConfig;
use crate::distance::MapMetric;
use crate::error::{KohonenError, Result};
use crate::neighborhood::Neighborhood;
use crate::som::{Layer, Size};
use crate::table::Table;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// One input record, split by layer.
///
/// Entry `i` holds the normalized values for layer `i`, or `None` if the
/// layer takes no part in the search (and is not updated).
pub type Sample<'a> = [Option<&'a [f64]>];

/// A Self-Organizing Map: a grid of nodes whose prototypes are split into
/// independently normalized and weighted layers.
///
/// A node is the tuple of all layers' vectors at the same index; the
/// combined distance of a node to a sample is the weighted sum of the
/// per-layer distances.
#[derive(Debug, Clone, PartialEq)]
pub struct Som {
    size: Size,
    layers: Vec<Layer>,
}

impl Som {
    /// Creates a map from its configuration.
    ///
    /// Layers without initial data are randomly initialized from the
    /// configured seed.
    pub fn new(config: &SomConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let nodes = config.size.nodes();
        let layers = config
            .layers
            .iter()
            .map(|l| Layer::from_config(l, nodes, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        Self::from_layers(config.size, layers)
    }

    /// Creates a map from prepared layers.
    pub fn from_layers(size: Size, layers: Vec<Layer>) -> Result<Self> {
        if size.nodes() == 0 {
            return Err(KohonenError::Config(format!(
                "grid size {}x{} has no nodes",
                size.width, size.height
            )));
        }
        if layers.is_empty() {
            return Err(KohonenError::NoLayers);
        }

        let mut names = HashSet::new();
        for layer in &layers {
            if !names.insert(layer.name()) {
                return Err(KohonenError::Config(format!(
                    "duplicate layer name '{}'",
                    layer.name()
                )));
            }
            if layer.nodes() != size.nodes() {
                return Err(KohonenError::Config(format!(
                    "layer '{}' has {} nodes, grid has {}",
                    layer.name(),
                    layer.nodes(),
                    size.nodes()
                )));
            }
        }

        Ok(Self { size, layers })
    }

    /// Grid size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Total number of nodes.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.size.nodes()
    }

    /// Grid coordinates of a node.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        self.size.coords(index)
    }

    /// All layers, in order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer at a position.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Mutable layer at a position.
    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Position of a named layer.
    pub fn layer_index(&self, name: &str) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| KohonenError::LayerNotFound(name.to_string()))
    }

    /// Layer by name.
    pub fn layer_by_name(&self, name: &str) -> Result<&Layer> {
        self.layer_index(name).map(|i| &self.layers[i])
    }

    /// Fails unless `sample` has one entry per layer and every present
    /// entry has its layer's column count.
    pub fn check_sample(&self, sample: &Sample<'_>) -> Result<()> {
        if sample.len() != self.layers.len() {
            return Err(KohonenError::Config(format!(
                "expected {} sample entries (one per layer), got {}",
                self.layers.len(),
                sample.len()
            )));
        }
        for (l, (layer, input)) in self.layers.iter().zip(sample).enumerate() {
            match input {
                Some(input) if input.len() != layer.column_count() => {
                    return Err(KohonenError::DimensionMismatch {
                        layer: l,
                        expected: layer.column_count(),
                        found: input.len(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.nodes() {
            return Err(KohonenError::IndexOutOfBounds {
                index: node,
                max: self.nodes(),
            });
        }
        Ok(())
    }

    /// Combined distance from a node to a sample.
    ///
    /// Layers without input, and missing input values, contribute nothing.
    pub fn distance(&self, node: usize, sample: &Sample<'_>) -> Result<f64> {
        self.check_node(node)?;
        self.check_sample(sample)?;
        Ok(self.distance_unchecked(node, sample))
    }

    /// [`distance`](Self::distance) for samples already known to fit.
    #[inline]
    pub(crate) fn distance_unchecked(&self, node: usize, sample: &Sample<'_>) -> f64 {
        self.layers
            .iter()
            .zip(sample.iter())
            .filter_map(|(layer, input)| input.map(|v| layer.weight() * layer.distance(node, v)))
            .sum()
    }

    /// Finds the Best Matching Unit for a sample by linear scan.
    ///
    /// Returns the node index and its combined distance. Ties go to the
    /// lowest index, so a sample without any observed value maps to node 0.
    pub fn find_bmu(&self, sample: &Sample<'_>) -> Result<(usize, f64)> {
        self.check_sample(sample)?;
        Ok(self.find_bmu_unchecked(sample))
    }

    pub(crate) fn find_bmu_unchecked(&self, sample: &Sample<'_>) -> (usize, f64) {
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;

        for node in 0..self.nodes() {
            let dist = self.distance_unchecked(node, sample);
            if dist < best_dist {
                best_dist = dist;
                best_idx = node;
            }
        }

        (best_idx, best_dist)
    }

    /// Finds the `k` nearest nodes, sorted by distance then index.
    pub fn find_k_nearest(&self, sample: &Sample<'_>, k: usize) -> Result<Vec<(usize, f64)>> {
        self.check_sample(sample)?;
        Ok(self.find_k_nearest_unchecked(sample, k))
    }

    pub(crate) fn find_k_nearest_unchecked(&self, sample: &Sample<'_>, k: usize) -> Vec<(usize, f64)> {
        let mut nearest: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
        if k == 0 {
            return nearest;
        }

        for node in 0..self.nodes() {
            let dist = self.distance_unchecked(node, sample);
            if nearest.len() == k && dist >= nearest[k - 1].1 {
                continue;
            }
            let pos = nearest.partition_point(|&(_, d)| d <= dist);
            nearest.insert(pos, (node, dist));
            nearest.truncate(k);
        }

        nearest
    }

    /// Moves the nodes around `bmu` towards the sample.
    ///
    /// Each node within the neighborhood's cutoff is moved by
    /// `learning_rate * weight` of the way to the sample, layer by layer.
    /// Layers without input and missing input values are left untouched.
    pub fn update(
        &mut self,
        sample: &Sample<'_>,
        bmu: usize,
        learning_rate: f64,
        radius: f64,
        neighborhood: Neighborhood,
    ) -> Result<()> {
        self.check_node(bmu)?;
        self.check_sample(sample)?;
        self.update_unchecked(sample, bmu, learning_rate, radius, neighborhood);
        Ok(())
    }

    pub(crate) fn update_unchecked(
        &mut self,
        sample: &Sample<'_>,
        bmu: usize,
        learning_rate: f64,
        radius: f64,
        neighborhood: Neighborhood,
    ) {
        let (bx, by) = self.size.coords(bmu);
        let max = neighborhood.max_radius(radius);
        let (x_range, y_range) = if max < 0 {
            (0..self.size.width, 0..self.size.height)
        } else {
            let r = max as usize;
            (
                bx.saturating_sub(r)..(bx + r + 1).min(self.size.width),
                by.saturating_sub(r)..(by + r + 1).min(self.size.height),
            )
        };

        for x in x_range {
            for y in y_range.clone() {
                let h = neighborhood.weight(bx, by, x, y, radius);
                if h <= 0.0 {
                    continue;
                }

                let node = self.size.index(x, y);
                let influence = learning_rate * h;
                for (layer, input) in self.layers.iter_mut().zip(sample.iter()) {
                    let Some(input) = input else { continue };
                    for (w, i) in layer.node_mut(node).iter_mut().zip(input.iter()) {
                        if !i.is_nan() {
                            *w += influence * (i - *w);
                        }
                    }
                }
            }
        }
    }

    /// Unified distance matrix: for every node, the mean combined distance
    /// of its prototype to those of its grid-adjacent nodes.
    pub fn u_matrix(&self, metric: MapMetric) -> Vec<f64> {
        let (w, h) = (self.size.width, self.size.height);

        (0..self.nodes())
            .map(|node| {
                let (x, y) = self.coords(node);
                let prototype: Vec<&[f64]> = self.layers.iter().map(|l| l.node(node)).collect();
                let sample: Vec<Option<&[f64]>> = prototype.into_iter().map(Some).collect();

                let mut sum = 0.0;
                let mut count = 0usize;
                for nx in x.saturating_sub(1)..(x + 2).min(w) {
                    for ny in y.saturating_sub(1)..(y + 2).min(h) {
                        if (nx, ny) == (x, y) || !metric.adjacent(x, y, nx, ny) {
                            continue;
                        }
                        sum += self.distance_unchecked(self.size.index(nx, ny), &sample);
                        count += 1;
                    }
                }

                if count == 0 {
                    0.0
                } else {
                    sum / count as f64
                }
            })
            .collect()
    }

    /// Checks that a set of per-layer tables fits this map.
    ///
    /// There must be one entry per layer; present tables must match their
    /// layer's columns and share one row count, which is returned.
    pub fn check_tables(&self, tables: &[Option<Table>]) -> Result<usize> {
        if tables.len() != self.layers.len() {
            return Err(KohonenError::Config(format!(
                "expected {} tables (one per layer), got {}",
                self.layers.len(),
                tables.len()
            )));
        }

        let mut rows = None;
        for (layer, table) in self.layers.iter().zip(tables) {
            let Some(table) = table else { continue };
            layer.check_table(table)?;
            match rows {
                None => rows = Some(table.rows()),
                Some(expected) if expected != table.rows() => {
                    return Err(KohonenError::RowMismatch {
                        expected,
                        found: table.rows(),
                    });
                }
                Some(_) => {}
            }
        }

        rows.ok_or(KohonenError::NoTables)
    }

    /// Normalized copies of per-layer raw tables.
    pub fn normalize_tables(&self, tables: &[Option<Table>]) -> Vec<Option<Table>> {
        self.layers
            .iter()
            .zip(tables)
            .map(|(layer, table)| table.as_ref().map(|t| layer.normalize_table(t)))
            .collect()
    }

    /// Exports the map as a configuration that rebuilds it via
    /// [`Som::new`].
    pub fn to_config(&self, denormalized: bool) -> SomConfig {
        SomConfig {
            size: self.size,
            layers: self.layers.iter().map(|l| l.to_config(denormalized)).collect(),
            seed: None,
        }
    }
}

/// Splits row `row` of per-layer tables into a sample.
pub(crate) fn sample_row<'a>(tables: &'a [Option<Table>], row: usize) -> Vec<Option<&'a [f64]>> {
    tables
        .iter()
        .map(|t| t.as_ref().map(|t| t.row(row)))
        .collect()
}
