//! C2 — FeatureStore: primary/secondary feature matrices and similarity.
//!
//! Rows are L2-normalised at construction so cosine similarity reduces to a
//! dot product, the same simplification `embeddings::local::cosine_similarity`
//! relies on in the teacher crate.

use crate::caps::select_with_caps;
use crate::frame_store::{FrameId, FrameStore};
use rayon::prelude::*;

/// An `N x d` row-major matrix of L2-normalised feature vectors.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f32>>,
    dim: usize,
}

impl FeatureMatrix {
    /// Normalises every row to unit length at construction. Rows that are
    /// exactly zero are left as-is (cosine similarity against them is
    /// defined to be zero).
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|row| {
                debug_assert_eq!(row.len(), dim, "all rows must share the same dimension");
                normalize(row)
            })
            .collect();
        Self { rows, dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, frame_id: FrameId) -> Option<&[f32]> {
        self.rows.get(frame_id as usize).map(|r| r.as_slice())
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }
}

fn normalize(row: Vec<f32>) -> Vec<f32> {
    let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        row
    } else {
        row.into_iter().map(|x| x / norm).collect()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Holds the primary matrix (used by canvas, relocation, and feedback
/// scoring) and an optional secondary matrix (an alternative text-scoring
/// path).
#[derive(Debug, Clone)]
pub struct FeatureStore {
    primary: FeatureMatrix,
    secondary: Option<FeatureMatrix>,
}

impl FeatureStore {
    pub fn new(primary: FeatureMatrix, secondary: Option<FeatureMatrix>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &FeatureMatrix {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&FeatureMatrix> {
        self.secondary.as_ref()
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Writes `1 - cos(query_vec, row_i)` into `out_inv_scores[i]` for every
    /// frame. Smaller means more similar, so the accumulation in
    /// [`crate::score_model::ScoreModel`] works additively.
    pub fn score_vs(&self, matrix: &FeatureMatrix, query_vec: &[f32], out_inv_scores: &mut [f32]) {
        assert_eq!(out_inv_scores.len(), matrix.len());
        out_inv_scores
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, out)| {
                let row = &matrix.rows[i];
                *out = 1.0 - cosine_similarity(query_vec, row);
            });
    }

    /// Ranks frames by cosine similarity to `example_frame_id`'s primary row
    /// and returns them with the presentation caps applied. Tie-break:
    /// lower `frame_id` first.
    pub fn top_knn(
        &self,
        example_frame_id: FrameId,
        frame_store: &FrameStore,
        limit: usize,
        per_video_cap: usize,
        per_shot_cap: usize,
    ) -> Vec<FrameId> {
        let Some(example) = self.primary.row(example_frame_id) else {
            return Vec::new();
        };

        let scored: Vec<(FrameId, f32)> = self
            .primary
            .rows
            .par_iter()
            .enumerate()
            .map(|(i, row)| (i as FrameId, cosine_similarity(example, row)))
            .collect();

        select_with_caps(scored, frame_store, limit, per_video_cap, per_shot_cap)
    }
}
