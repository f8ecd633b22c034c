//! KD-tree over node prototypes for sub-linear BMU search.
//!
//! Each node is a point in the concatenation of all layers' columns. Layer
//! `l`'s coordinates are scaled by `sqrt(weight_l)`, so the squared
//! Euclidean distance in tree space equals the weighted combined distance
//! of a map whose layers all use the sum-of-squares metric. For other
//! metrics the tree result is an approximation.
//!
//! The tree is built from a snapshot of the prototypes and must be rebuilt
//! after they change.

use crate::error::{KohonenError, Result};
use crate::som::{Sample, Som};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct KdNode {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Spatial index over the nodes of a [`Som`].
#[derive(Debug, Clone)]
pub struct KdTree {
    dims: usize,
    /// First tree dimension of each layer.
    offsets: Vec<usize>,
    scales: Vec<f64>,
    /// Scaled node coordinates, `nodes * dims`.
    points: Vec<f64>,
    tree: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    /// Builds a tree over the current prototypes of `som`.
    pub fn build(som: &Som) -> Self {
        let layers = som.layers();

        let mut offsets = Vec::with_capacity(layers.len());
        let mut dims = 0;
        for layer in layers {
            offsets.push(dims);
            dims += layer.column_count();
        }
        let scales: Vec<f64> = layers.iter().map(|l| l.weight().sqrt()).collect();

        let mut points = Vec::with_capacity(som.nodes() * dims);
        for node in 0..som.nodes() {
            for (layer, scale) in layers.iter().zip(&scales) {
                points.extend(layer.node(node).iter().map(|v| v * scale));
            }
        }

        let mut index = Self {
            dims,
            offsets,
            scales,
            points,
            tree: Vec::with_capacity(som.nodes()),
            root: None,
        };
        if dims > 0 {
            index.root = index.build_subtree((0..som.nodes()).collect(), 0);
        }
        index
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True if no node is indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of dimensions (total columns over all layers).
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    fn coord(&self, point: usize, axis: usize) -> f64 {
        self.points[point * self.dims + axis]
    }

    /// Splits at the positional median along the axis, so the depth stays
    /// logarithmic even when many prototypes coincide. Equal coordinates
    /// may land on either side of the pivot.
    fn build_subtree(&mut self, mut indices: Vec<usize>, depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let axis = depth % self.dims;
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            self.coord(a, axis)
                .total_cmp(&self.coord(b, axis))
                .then(a.cmp(&b))
        });

        let right = indices.split_off(mid + 1);
        let pivot = indices.pop()?;
        let left = indices;

        let slot = self.tree.len();
        self.tree.push(KdNode {
            point: pivot,
            axis,
            left: None,
            right: None,
        });
        let left = self.build_subtree(left, depth + 1);
        let right = self.build_subtree(right, depth + 1);
        self.tree[slot].left = left;
        self.tree[slot].right = right;

        Some(slot)
    }

    /// Height of the tree; 0 when empty.
    pub fn depth(&self) -> usize {
        fn height(tree: &[KdNode], slot: Option<usize>) -> usize {
            slot.map_or(0, |s| {
                1 + height(tree, tree[s].left).max(height(tree, tree[s].right))
            })
        }
        height(&self.tree, self.root)
    }

    fn layer_width(&self, layer: usize) -> usize {
        let end = self.offsets.get(layer + 1).copied().unwrap_or(self.dims);
        end - self.offsets[layer]
    }

    fn scaled_query(&self, sample: &Sample<'_>) -> Vec<f64> {
        let mut query = vec![f64::NAN; self.dims];
        for (l, input) in sample.iter().enumerate().take(self.offsets.len()) {
            let Some(input) = input else { continue };
            let start = self.offsets[l];
            let end = start + self.layer_width(l);
            for (q, v) in query[start..end].iter_mut().zip(input.iter()) {
                *q = v * self.scales[l];
            }
        }
        query
    }

    fn squared_distance(&self, point: usize, query: &[f64]) -> f64 {
        let start = point * self.dims;
        self.points[start..start + self.dims]
            .iter()
            .zip(query)
            .filter(|(_, q)| !q.is_nan())
            .map(|(p, q)| (p - q) * (p - q))
            .sum()
    }

    /// Node minimizing the squared distance in tree space to `sample`, and
    /// that distance.
    ///
    /// Missing values and `None` layers are ignored, so an all-missing
    /// sample returns node 0. Ties go to the lowest node index. Fails if
    /// the sample does not have one entry per layer of the layer's width.
    pub fn nearest(&self, sample: &Sample<'_>) -> Result<(usize, f64)> {
        if sample.len() != self.offsets.len() {
            return Err(KohonenError::Config(format!(
                "expected {} sample entries (one per layer), got {}",
                self.offsets.len(),
                sample.len()
            )));
        }
        for (l, input) in sample.iter().enumerate() {
            let width = self.layer_width(l);
            match input {
                Some(input) if input.len() != width => {
                    return Err(KohonenError::DimensionMismatch {
                        layer: l,
                        expected: width,
                        found: input.len(),
                    });
                }
                _ => {}
            }
        }

        self.nearest_unchecked(sample)
            .ok_or_else(|| KohonenError::Config("kd-tree has no nodes".to_string()))
    }

    pub(crate) fn nearest_unchecked(&self, sample: &Sample<'_>) -> Option<(usize, f64)> {
        let root = self.root?;
        let query = self.scaled_query(sample);
        let mut best = (usize::MAX, f64::INFINITY);
        self.search(root, &query, &mut best);
        Some(best)
    }

    fn search(&self, slot: usize, query: &[f64], best: &mut (usize, f64)) {
        let node = &self.tree[slot];

        let dist = self.squared_distance(node.point, query);
        match dist.total_cmp(&best.1) {
            Ordering::Less => *best = (node.point, dist),
            Ordering::Equal if node.point < best.0 => *best = (node.point, dist),
            _ => {}
        }

        let q = query[node.axis];
        if q.is_nan() {
            for child in [node.left, node.right].into_iter().flatten() {
                self.search(child, query, best);
            }
            return;
        }

        let split = self.coord(node.point, node.axis);
        let (near, far) = if q < split {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best);
        }
        if let Some(far) = far {
            let plane = q - split;
            if plane * plane <= best.1 {
                self.search(far, query, best);
            }
        }
    }
}
