//! C8 — SomWorker: asynchronous Self-Organising Map over top-scored frames.
//!
//! Background-thread pattern grounded on `CambrianTech-continuum`'s
//! `LoggerModule` (a dedicated worker thread fed by snapshots, cooperatively
//! cancelled rather than killed) since the teacher crate has no equivalent
//! of its own.

mod grid;

pub use grid::Grid;

use crate::frame_store::FrameId;
use rand::seq::index::sample_weighted;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Sentinel written into an empty grid cell.
pub const IMAGE_ID_ERR_VAL: FrameId = FrameId::MAX;

const TRAINING_ITERATIONS: usize = 500;
const LEARNING_RATE_START: f32 = 0.5;

struct TrainedMap {
    /// Every frame assigned to each cell, row-major.
    members: Vec<Vec<FrameId>>,
}

struct SharedState {
    /// Bumped by every `start_work` call; a training thread compares its own
    /// generation against this to detect cancellation.
    generation: AtomicU64,
    /// The generation whose training has finished, or 0 if none has.
    ready_generation: AtomicU64,
    map: Mutex<Option<TrainedMap>>,
}

/// One Kohonen map trainer over a fixed-size toroidal grid.
pub struct SomWorker {
    grid: Grid,
    state: Arc<SharedState>,
    // Keeping the handle isn't required for correctness (cancellation is
    // cooperative and the old thread detaches cleanly), but it lets tests
    // wait deterministically.
    handle: Option<thread::JoinHandle<()>>,
}

impl SomWorker {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid: Grid::new(width, height),
            state: Arc::new(SharedState {
                generation: AtomicU64::new(0),
                ready_generation: AtomicU64::new(0),
                map: Mutex::new(None),
            }),
            handle: None,
        }
    }

    /// Cancels any in-flight job, snapshots `dim`-wide `feature_rows` and the
    /// per-frame `weights` (the inverse-score vector to sample by), and
    /// begins training a fresh map. Returns immediately.
    pub fn start_work(&mut self, feature_rows: Arc<Vec<Vec<f32>>>, weights: Arc<Vec<f32>>) {
        let my_gen = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::clone(&self.state);
        let grid = self.grid;

        let handle = thread::spawn(move || {
            train(&state, grid, my_gen, &feature_rows, &weights);
        });
        self.handle = Some(handle);
    }

    /// True once training plus cell assignment has completed since the last
    /// `start_work`.
    pub fn map_ready(&self) -> bool {
        let generation = self.state.generation.load(Ordering::SeqCst);
        generation != 0 && self.state.ready_generation.load(Ordering::SeqCst) == generation
    }

    /// Per cell, the highest-scoring member frame under the current live
    /// `scores`, or [`IMAGE_ID_ERR_VAL`] if the cell has no members. Returns
    /// an all-sentinel grid if the map isn't ready; callers that must never
    /// block should check [`Self::map_ready`] first.
    pub fn get_display(&self, scores: &[f32]) -> Vec<FrameId> {
        let cells = self.grid.cells();
        if !self.map_ready() {
            return vec![IMAGE_ID_ERR_VAL; cells];
        }
        let guard = self.state.map.lock().expect("som map mutex poisoned");
        let Some(map) = guard.as_ref() else {
            return vec![IMAGE_ID_ERR_VAL; cells];
        };

        map.members
            .iter()
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .max_by(|a, b| {
                        scores[*a as usize]
                            .partial_cmp(&scores[*b as usize])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(IMAGE_ID_ERR_VAL)
            })
            .collect()
    }

    #[cfg(test)]
    fn join_for_test(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn train(state: &SharedState, grid: Grid, my_gen: u64, feature_rows: &[Vec<f32>], weights: &[f32]) {
    let n = feature_rows.len();
    if n == 0 {
        return;
    }
    let dim = feature_rows[0].len();
    let cells = grid.cells();

    let mut rng = rand::thread_rng();
    let mut weights_buf = vec![0.0f32; dim];

    // Seed each cell with a weighted random sample.
    let mut cell_weights: Vec<Vec<f32>> = (0..cells)
        .map(|_| {
            let idx = sample_weighted(&mut rng, n, |i| weights[i].max(1e-6) as f64, 1)
                .map(|ids| ids.index(0))
                .unwrap_or(0);
            feature_rows[idx].clone()
        })
        .collect();

    let initial_radius = grid.initial_radius();

    for t in 0..TRAINING_ITERATIONS {
        if state.generation.load(Ordering::SeqCst) != my_gen {
            return; // cancelled by a newer start_work
        }

        let progress = t as f32 / TRAINING_ITERATIONS.max(1) as f32;
        let radius = (initial_radius + (1.0 - initial_radius) * progress).max(1.0);
        let learning_rate = LEARNING_RATE_START * (1.0 - progress);

        let Ok(sample_idx) = sample_weighted(&mut rng, n, |i| weights[i].max(1e-6) as f64, 1) else {
            continue;
        };
        let sample = &feature_rows[sample_idx.index(0)];

        let bmu = best_matching_unit(&cell_weights, sample, &mut weights_buf);

        for cell in 0..cells {
            let d = grid.toroidal_distance(bmu, cell);
            if d > radius {
                continue;
            }
            let influence = (-(d * d) / (2.0 * radius * radius)).exp();
            for (w, s) in cell_weights[cell].iter_mut().zip(sample) {
                *w += learning_rate * influence * (s - *w);
            }
        }
    }

    if state.generation.load(Ordering::SeqCst) != my_gen {
        return;
    }

    // Assign every frame to its nearest cell.
    let mut members: Vec<Vec<FrameId>> = vec![Vec::new(); cells];
    let mut buf = vec![0.0f32; dim];
    for (frame_id, row) in feature_rows.iter().enumerate() {
        let bmu = best_matching_unit(&cell_weights, row, &mut buf);
        members[bmu].push(frame_id as FrameId);
    }

    if state.generation.load(Ordering::SeqCst) != my_gen {
        return;
    }

    *state.map.lock().expect("som map mutex poisoned") = Some(TrainedMap { members });
    state.ready_generation.store(my_gen, Ordering::SeqCst);
}

fn best_matching_unit(cell_weights: &[Vec<f32>], sample: &[f32], scratch: &mut [f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (cell, w) in cell_weights.iter().enumerate() {
        for (s, (a, b)) in scratch.iter_mut().zip(w.iter().zip(sample)) {
            *s = a - b;
        }
        let dist: f32 = scratch.iter().map(|x| x * x).sum();
        if dist < best_dist {
            best_dist = dist;
            best = cell;
        }
    }
    best
}
