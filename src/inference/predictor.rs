//! Read-only inference over a trained map.

use crate::error::{KohonenError, Result};
use crate::index::KdTree;
use crate::som::{sample_row, Som};
use crate::table::Table;
use log::debug;
use rayon::prelude::*;

/// BMU of one input row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmuRecord {
    /// Row index.
    pub row: usize,
    /// BMU node index.
    pub node: usize,
    /// Grid x coordinate of the BMU.
    pub x: usize,
    /// Grid y coordinate of the BMU.
    pub y: usize,
    /// Combined distance to the BMU.
    pub distance: f64,
}

/// Maps rows of per-layer tables onto a trained [`Som`].
///
/// Tables are given raw, one entry per layer (`None` for layers without
/// data), and normalized with the map's fitted normalizers. The map is only
/// read; outputs that need modified data are returned as new tables.
pub struct Predictor<'a> {
    som: &'a Som,
    tables: Vec<Option<Table>>,
    normalized: Vec<Option<Table>>,
    rows: usize,
    kdtree: Option<KdTree>,
}

impl<'a> Predictor<'a> {
    /// Creates a predictor using linear BMU search.
    pub fn new(som: &'a Som, tables: Vec<Option<Table>>) -> Result<Self> {
        let rows = som.check_tables(&tables)?;
        let normalized = som.normalize_tables(&tables);
        Ok(Self {
            som,
            tables,
            normalized,
            rows,
            kdtree: None,
        })
    }

    /// Switches BMU search to a kd-tree built over the map's current
    /// prototypes.
    ///
    /// Results equal the linear scan when every layer uses the
    /// sum-of-squares metric; otherwise they are approximate.
    pub fn with_kdtree(mut self) -> Self {
        let tree = KdTree::build(self.som);
        debug!("Built kd-tree over {} nodes, {} dims", tree.len(), tree.dims());
        self.kdtree = Some(tree);
        self
    }

    /// The map.
    pub fn som(&self) -> &Som {
        self.som
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The raw input tables.
    pub fn tables(&self) -> &[Option<Table>] {
        &self.tables
    }

    pub(crate) fn normalized_tables(&self) -> &[Option<Table>] {
        &self.normalized
    }

    fn search(&self, sample: &[Option<&[f64]>]) -> (usize, f64) {
        if let Some((node, _)) = self.kdtree.as_ref().and_then(|t| t.nearest_unchecked(sample)) {
            return (node, self.som.distance_unchecked(node, sample));
        }
        self.som.find_bmu_unchecked(sample)
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(KohonenError::IndexOutOfBounds {
                index: row,
                max: self.rows,
            });
        }
        Ok(())
    }

    /// BMU node and combined distance of one row.
    pub fn bmu(&self, row: usize) -> Result<(usize, f64)> {
        self.check_row(row)?;
        Ok(self.search(&sample_row(&self.normalized, row)))
    }

    /// BMU node and combined distance of every row.
    pub fn bmus(&self) -> Vec<(usize, f64)> {
        (0..self.rows)
            .into_par_iter()
            .map(|row| self.search(&sample_row(&self.normalized, row)))
            .collect()
    }

    /// BMU of every row with its grid position.
    pub fn bmu_table(&self) -> Vec<BmuRecord> {
        self.bmus()
            .into_iter()
            .enumerate()
            .map(|(row, (node, distance))| {
                let (x, y) = self.som.coords(node);
                BmuRecord {
                    row,
                    node,
                    x,
                    y,
                    distance,
                }
            })
            .collect()
    }

    /// Number of rows mapped to each node.
    pub fn density(&self) -> Vec<usize> {
        let mut density = vec![0; self.som.nodes()];
        for (node, _) in self.bmus() {
            density[node] += 1;
        }
        density
    }

    /// Per-node mean squared BMU distance of the rows mapped to it, or its
    /// root with `rmse`. Nodes without rows report zero.
    pub fn error(&self, rmse: bool) -> Vec<f64> {
        let nodes = self.som.nodes();
        let mut sums = vec![0.0; nodes];
        let mut counts = vec![0usize; nodes];
        for (node, dist) in self.bmus() {
            sums[node] += dist * dist;
            counts[node] += 1;
        }

        sums.iter()
            .zip(&counts)
            .map(|(&sum, &count)| {
                if count == 0 {
                    return 0.0;
                }
                let mse = sum / count as f64;
                if rmse {
                    mse.sqrt()
                } else {
                    mse
                }
            })
            .collect()
    }

    /// Copies of the input tables with every missing value replaced by the
    /// row's BMU prototype value, in raw units.
    ///
    /// The BMU is found from the observed values only. A row with no
    /// observed value at all maps to node 0.
    pub fn fill_missing(&self) -> Vec<Option<Table>> {
        let incomplete: Vec<usize> = (0..self.rows)
            .filter(|&row| {
                self.tables
                    .iter()
                    .flatten()
                    .any(|t| t.has_missing(row))
            })
            .collect();

        let bmus: Vec<usize> = incomplete
            .par_iter()
            .map(|&row| self.search(&sample_row(&self.normalized, row)).0)
            .collect();

        let mut filled = self.tables.clone();
        for (layer, table) in self.som.layers().iter().zip(filled.iter_mut()) {
            let Some(table) = table else { continue };
            for (&row, &node) in incomplete.iter().zip(&bmus) {
                if !table.has_missing(row) {
                    continue;
                }
                let prototype = layer.denormalized_node(node);
                for (v, p) in table.row_mut(row).iter_mut().zip(prototype) {
                    if v.is_nan() {
                        *v = p;
                    }
                }
            }
        }

        debug!("Filled missing values in {} rows", incomplete.len());
        filled
    }

    /// Predicts the named layers for every row.
    ///
    /// The named layers are ignored in the BMU search; each output table
    /// holds the BMU's prototypes for one named layer, in raw units and in
    /// the order given.
    pub fn predict_layers(&self, layers: &[&str]) -> Result<Vec<Table>> {
        let indices = layers
            .iter()
            .map(|name| self.som.layer_index(name))
            .collect::<Result<Vec<_>>>()?;

        let bmus = self.bmus_without(&indices)?;

        indices
            .iter()
            .map(|&i| {
                let layer = &self.som.layers()[i];
                let data = bmus
                    .iter()
                    .flat_map(|&node| layer.denormalized_node(node))
                    .collect();
                Table::new(layer.columns().to_vec(), data)
            })
            .collect()
    }

    /// Predicts a class for every row from a categorical layer.
    ///
    /// The class layer is ignored in the BMU search. Each entry is the
    /// index of the BMU's strongest class column and that column's share of
    /// the BMU's class values.
    pub fn classify(&self, layer: &str) -> Result<Vec<(usize, f64)>> {
        let index = self.som.layer_index(layer)?;
        let class_layer = &self.som.layers()[index];
        if !class_layer.is_categorical() {
            return Err(KohonenError::Config(format!(
                "layer '{}' is not categorical",
                layer
            )));
        }

        let bmus = self.bmus_without(&[index])?;
        Ok(bmus
            .into_iter()
            .map(|node| {
                let values = class_layer.node(node);
                let mut best = 0;
                for (i, v) in values.iter().enumerate() {
                    if *v > values[best] {
                        best = i;
                    }
                }
                let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
                let share = if total > 0.0 {
                    values[best].max(0.0) / total
                } else {
                    0.0
                };
                (best, share)
            })
            .collect())
    }

    fn bmus_without(&self, excluded: &[usize]) -> Result<Vec<usize>> {
        let searchable = self
            .normalized
            .iter()
            .enumerate()
            .any(|(i, t)| t.is_some() && !excluded.contains(&i));
        if !searchable {
            return Err(KohonenError::Config(
                "no layer with data is left for the BMU search".to_string(),
            ));
        }

        Ok((0..self.rows)
            .into_par_iter()
            .map(|row| {
                let mut sample = sample_row(&self.normalized, row);
                for &i in excluded {
                    sample[i] = None;
                }
                self.search(&sample).0
            })
            .collect())
    }
}
