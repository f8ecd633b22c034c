//! Epoch-based SOM training.
//!
//! Every epoch visits each training row once, in an order shuffled from the
//! trainer's seeded RNG. For each row the Best Matching Unit is found over
//! all layers that have data, then every node in the BMU's neighborhood is
//! pulled towards the row. Missing values neither count towards the BMU
//! distance nor pull prototypes.

use crate::config::TrainingConfig;
use crate::error::{KohonenError, Result};
use crate::som::sample_row;
use crate::som::Som;
use crate::table::Table;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Snapshot published after each training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingProgress {
    /// Zero-based epoch that just completed.
    pub epoch: usize,
    /// Learning rate used in the epoch.
    pub learning_rate: f64,
    /// Neighborhood radius used in the epoch.
    pub radius: f64,
    /// Mean BMU distance of the rows, measured before each row's update.
    pub mean_distance: f64,
    /// Topographic error after the epoch, if a map metric is configured.
    pub topographic_error: Option<f64>,
}

/// Lifecycle of a [`Trainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    /// No epoch has run yet.
    Unstarted,
    /// Some epochs have run; `epoch` is the next one.
    Running {
        /// Next epoch to run.
        epoch: usize,
    },
    /// All epochs have run.
    Done,
}

/// Drives training of a [`Som`] over per-layer tables.
///
/// The trainer owns the map while training. Tables are given raw, one entry
/// per layer (`None` for layers without data); the trainer fits the layers'
/// unfitted normalizers on them and trains in normalized space. Normalizers
/// that are already fitted, as in a loaded model, are left alone.
pub struct Trainer {
    som: Som,
    tables: Vec<Option<Table>>,
    rows: usize,
    config: TrainingConfig,
    rng: ChaCha8Rng,
    order: Vec<usize>,
    epoch: usize,
}

impl Trainer {
    /// Creates a trainer.
    ///
    /// Fails if the tables do not fit the map's layers (count, columns, row
    /// counts) or if no layer has data.
    pub fn new(mut som: Som, tables: Vec<Option<Table>>, config: TrainingConfig) -> Result<Self> {
        let rows = som.check_tables(&tables)?;

        if let Some(lambda) = config.visom_lambda {
            warn!("ViSom lambda {} is accepted but has no effect", lambda);
        }

        for (i, table) in tables.iter().enumerate() {
            if let (Some(table), Some(layer)) = (table, som.layer_mut(i)) {
                layer.initialize_normalizers(table);
            }
        }
        let tables = som.normalize_tables(&tables);

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            som,
            tables,
            rows,
            config,
            rng,
            order: (0..rows).collect(),
            epoch: 0,
        })
    }

    /// The map being trained.
    pub fn som(&self) -> &Som {
        &self.som
    }

    /// Releases the trained map.
    pub fn into_som(self) -> Som {
        self.som
    }

    /// Training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Number of training rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrainerState {
        if self.epoch >= self.config.epochs {
            TrainerState::Done
        } else if self.epoch == 0 {
            TrainerState::Unstarted
        } else {
            TrainerState::Running { epoch: self.epoch }
        }
    }

    /// Runs the next epoch. Returns `None` once all epochs have run.
    pub fn run_epoch(&mut self) -> Option<TrainingProgress> {
        if self.epoch >= self.config.epochs {
            return None;
        }

        let epoch = self.epoch;
        let total = self.config.epochs;
        let learning_rate = self.config.learning_rate.decay(epoch, total);
        let radius = self.config.radius.decay(epoch, total);
        let neighborhood = self.config.neighborhood;

        self.order.shuffle(&mut self.rng);

        let mut dist_sum = 0.0;
        for &row in &self.order {
            let sample = sample_row(&self.tables, row);
            let (bmu, dist) = self.som.find_bmu_unchecked(&sample);
            dist_sum += dist;
            self.som.update_unchecked(&sample, bmu, learning_rate, radius, neighborhood);
        }

        let topographic_error = self.config.map_metric.map(|metric| {
            let errors = (0..self.rows)
                .filter(|&row| {
                    let sample = sample_row(&self.tables, row);
                    match self.som.find_k_nearest_unchecked(&sample, 2)[..] {
                        [(first, _), (second, _)] => {
                            let (x1, y1) = self.som.coords(first);
                            let (x2, y2) = self.som.coords(second);
                            !metric.adjacent(x1, y1, x2, y2)
                        }
                        _ => false,
                    }
                })
                .count();
            mean(errors as f64, self.rows)
        });

        self.epoch += 1;

        let progress = TrainingProgress {
            epoch,
            learning_rate,
            radius,
            mean_distance: mean(dist_sum, self.rows),
            topographic_error,
        };
        debug!(
            "Epoch {}/{}: lr={:.4}, radius={:.2}, mean dist={:.5}",
            epoch + 1,
            total,
            learning_rate,
            radius,
            progress.mean_distance
        );

        Some(progress)
    }

    /// Runs all remaining epochs, returning one snapshot per epoch.
    pub fn train(&mut self) -> Vec<TrainingProgress> {
        info!(
            "Training SOM: {} rows, {} nodes, {} epochs",
            self.rows,
            self.som.nodes(),
            self.config.epochs
        );

        let mut progress = Vec::with_capacity(self.config.epochs.saturating_sub(self.epoch));
        while let Some(p) = self.run_epoch() {
            progress.push(p);
        }

        info!("SOM training completed");
        progress
    }

    /// Trains on a worker thread, streaming progress through a channel of
    /// the given capacity.
    ///
    /// Dropping the returned handle stops training after the epoch in
    /// flight.
    pub fn train_async(self, capacity: usize) -> TrainingHandle {
        let (sender, receiver) = mpsc::sync_channel(capacity);

        let worker = thread::spawn(move || {
            let mut trainer = self;
            info!(
                "Training SOM in background: {} rows, {} epochs",
                trainer.rows, trainer.config.epochs
            );
            while let Some(progress) = trainer.run_epoch() {
                if sender.send(progress).is_err() {
                    debug!("Progress receiver dropped, stopping after epoch {}", progress.epoch);
                    break;
                }
            }
            trainer
        });

        TrainingHandle { receiver, worker }
    }

    /// Semi-supervised label propagation into a categorical layer.
    ///
    /// `labels` holds one-hot class rows aligned with the training rows;
    /// unlabeled rows are entirely missing (see [`Table::one_hot`]). For
    /// every epoch of the configured schedule, each labeled row finds its
    /// BMU through the other layers only, and only the class layer is
    /// pulled towards the row's label. Unlabeled rows are skipped.
    pub fn propagate_labels(&mut self, layer: &str, labels: &Table) -> Result<Vec<TrainingProgress>> {
        let index = self.som.layer_index(layer)?;
        let class_layer = &self.som.layers()[index];

        if !class_layer.is_categorical() {
            return Err(KohonenError::Config(format!(
                "label layer '{}' must be categorical",
                layer
            )));
        }
        class_layer.check_table(labels)?;
        if labels.rows() != self.rows {
            return Err(KohonenError::RowMismatch {
                expected: self.rows,
                found: labels.rows(),
            });
        }
        if !self
            .tables
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.is_some())
        {
            return Err(KohonenError::Config(
                "label propagation needs another layer with data".to_string(),
            ));
        }

        let labels = class_layer.normalize_table(labels);
        let mut labeled: Vec<usize> = (0..labels.rows())
            .filter(|&row| !labels.is_row_missing(row))
            .collect();
        if labeled.is_empty() {
            return Err(KohonenError::Training("no labeled rows".to_string()));
        }

        info!(
            "Propagating labels into '{}': {} of {} rows labeled",
            layer,
            labeled.len(),
            self.rows
        );

        let total = self.config.epochs;
        let mut progress = Vec::with_capacity(total);
        for epoch in 0..total {
            let learning_rate = self.config.learning_rate.decay(epoch, total);
            let radius = self.config.radius.decay(epoch, total);
            labeled.shuffle(&mut self.rng);

            let mut dist_sum = 0.0;
            for &row in &labeled {
                let mut search = sample_row(&self.tables, row);
                search[index] = None;
                let (bmu, dist) = self.som.find_bmu_unchecked(&search);
                dist_sum += dist;

                let mut target: Vec<Option<&[f64]>> = vec![None; search.len()];
                target[index] = Some(labels.row(row));
                self.som
                    .update_unchecked(&target, bmu, learning_rate, radius, self.config.neighborhood);
            }

            progress.push(TrainingProgress {
                epoch,
                learning_rate,
                radius,
                mean_distance: mean(dist_sum, labeled.len()),
                topographic_error: None,
            });
        }

        Ok(progress)
    }
}

#[inline]
fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Handle to a training run on a worker thread.
///
/// Iterating yields progress snapshots until training completes.
pub struct TrainingHandle {
    receiver: Receiver<TrainingProgress>,
    worker: JoinHandle<Trainer>,
}

impl TrainingHandle {
    /// Waits for training to complete and returns the trainer.
    ///
    /// Snapshots not yet consumed are discarded.
    pub fn finish(self) -> Result<Trainer> {
        let TrainingHandle { receiver, worker } = self;
        for _ in receiver.iter() {}
        worker
            .join()
            .map_err(|_| KohonenError::Training("training thread panicked".to_string()))
    }
}

impl Iterator for TrainingHandle {
    type Item = TrainingProgress;

    fn next(&mut self) -> Option<TrainingProgress> {
        self.receiver.recv().ok()
    }
}
