//! C6 — ScoreModel: the mutable score vector(s) and their arithmetic.
//!
//! The arithmetic heart of a rescore. State is `scores[N]`, `mask[N]`, and
//! `temp[K][N]` where `K = MAX_TEMPORAL_SIZE`. Every public mutator
//! invalidates the cached `top_n` result (§4.6: "cached until the next
//! mutation of ScoreModel").

use crate::caps::select_with_caps;
use crate::feature_store::{cosine_similarity, FeatureMatrix};
use crate::frame_store::{FrameId, FrameStore};
use crate::query::MAX_TEMPORAL_SIZE;
use rand::seq::index::sample_weighted;
use rayon::prelude::*;

/// The target every active `temp[k]` is rescaled to sum to over unmasked
/// frames (§9 Open Questions: "sum=1" reading of the normalisation base).
pub const NORMALIZE_TARGET: f32 = 1.0;

#[derive(Clone)]
pub struct ScoreModel {
    n: usize,
    scores: Vec<f32>,
    mask: Vec<bool>,
    temp: Vec<Vec<f32>>,
    cached_top_n: Option<(usize, usize, usize, Vec<FrameId>)>,
}

impl PartialEq for ScoreModel {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n && self.scores == other.scores && self.mask == other.mask && self.temp == other.temp
    }
}

impl std::fmt::Debug for ScoreModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreModel")
            .field("n", &self.n)
            .field("scores_len", &self.scores.len())
            .finish()
    }
}

impl ScoreModel {
    pub fn new(n: usize) -> Self {
        let mut model = Self {
            n,
            scores: vec![1.0; n],
            mask: vec![true; n],
            temp: (0..MAX_TEMPORAL_SIZE).map(|_| vec![1.0; n]).collect(),
            cached_top_n: None,
        };
        model.reset(1.0);
        model
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn temp(&self, k: usize) -> &[f32] {
        &self.temp[k]
    }

    pub fn temp_mut(&mut self, k: usize) -> &mut [f32] {
        self.cached_top_n = None;
        &mut self.temp[k]
    }

    /// `scores[i] = v` for all i, all `temp[k]` set to `v`, mask cleared to
    /// admit all. Does *not* touch `used_tools` — that lives on
    /// `SearchContext` and is cleared by the caller as a sibling operation
    /// (see `SPEC_FULL.md` B.1).
    pub fn reset(&mut self, v: f32) {
        self.scores.fill(v);
        for t in self.temp.iter_mut() {
            t.fill(v);
        }
        self.mask.fill(true);
        self.cached_top_n = None;
    }

    pub fn reset_mask(&mut self) {
        self.mask.fill(true);
        self.cached_top_n = None;
    }

    pub fn set_mask(&mut self, frame_id: FrameId, admit: bool) {
        self.mask[frame_id as usize] = admit;
        self.cached_top_n = None;
    }

    /// Rescales each active `temp[k]` to sum to `NORMALIZE_TARGET` over
    /// unmasked frames; leaves it untouched if its unmasked sum is zero.
    pub fn normalize(&mut self, k_active: usize) {
        for k in 0..k_active {
            let sum: f32 = self
                .temp[k]
                .iter()
                .zip(&self.mask)
                .filter(|(_, &m)| m)
                .map(|(v, _)| *v)
                .sum();
            if sum > 0.0 {
                let scale = NORMALIZE_TARGET / sum;
                for v in self.temp[k].iter_mut() {
                    *v *= scale;
                }
            }
        }
        self.cached_top_n = None;
    }

    /// Chain-matches each frame through `k_active` temporal moments: moment
    /// 0 is the frame itself; moment `k >= 1` picks the minimum-inverse-score
    /// frame in the same video whose `frame_number` is strictly after the
    /// `k-1` chosen frame. A frame with no valid successor at some moment
    /// contributes zero. Masked frames always score zero.
    pub fn apply_temporals(&mut self, k_active: usize, frame_store: &FrameStore, power: f32) {
        let temp = &self.temp;
        let mask = &self.mask;
        let scores: Vec<f32> = (0..self.n)
            .into_par_iter()
            .map(|i| {
                if !mask[i] {
                    return 0.0;
                }
                let Some(frame) = frame_store.get(i as FrameId) else {
                    return 0.0;
                };
                if k_active == 0 {
                    return 1.0;
                }

                let mut product = (-power * temp[0][i]).exp();
                let mut chosen_frame_number = frame.frame_number;
                let video_frames = frame_store.all_frames_of_video(frame.video_id);

                for k in 1..k_active {
                    let next = video_frames
                        .iter()
                        .filter(|f| f.frame_number > chosen_frame_number)
                        .min_by(|a, b| {
                            temp[k][a.frame_id as usize]
                                .partial_cmp(&temp[k][b.frame_id as usize])
                                .unwrap_or(std::cmp::Ordering::Equal)
                        });
                    match next {
                        Some(f) => {
                            product *= (-power * temp[k][f.frame_id as usize]).exp();
                            chosen_frame_number = f.frame_number;
                        }
                        None => {
                            product = 0.0;
                            break;
                        }
                    }
                }
                product
            })
            .collect();

        self.scores = scores;
        self.cached_top_n = None;
    }

    /// Multiplies every frame's score by the product, over every like, of a
    /// softmax weight of its primary-feature similarity to that like
    /// relative to the shown set (see `SPEC_FULL.md` D.4). A no-op if
    /// `likes` is empty.
    pub fn apply_bayes(&mut self, likes: &[FrameId], shown: &[FrameId], features: &FeatureMatrix) {
        if likes.is_empty() {
            return;
        }

        for &like in likes {
            let Some(like_row) = features.row(like) else {
                continue;
            };
            let shown_sims: Vec<f32> = shown
                .iter()
                .filter_map(|&s| features.row(s).map(|r| cosine_similarity(r, like_row)))
                .collect();

            for i in 0..self.n {
                let Some(row) = features.row(i as FrameId) else {
                    continue;
                };
                let sim = cosine_similarity(row, like_row);
                let weight = if shown_sims.is_empty() {
                    1.0
                } else {
                    let numerator = sim.exp();
                    let denom = numerator + shown_sims.iter().map(|s| s.exp()).sum::<f32>();
                    numerator / denom
                };
                self.scores[i] *= weight;
            }
        }
        self.cached_top_n = None;
    }

    /// Returns up to `limit` frame IDs in descending score, honouring the
    /// per-video/per-shot presentation caps. Cached until the next
    /// mutation.
    pub fn top_n(
        &mut self,
        frame_store: &FrameStore,
        limit: usize,
        per_video_cap: usize,
        per_shot_cap: usize,
    ) -> Vec<FrameId> {
        if let Some((l, pv, ps, cached)) = &self.cached_top_n {
            if *l == limit && *pv == per_video_cap && *ps == per_shot_cap {
                return cached.clone();
            }
        }

        let scored: Vec<(FrameId, f32)> = self
            .scores
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as FrameId, s))
            .collect();
        let result = select_with_caps(scored, frame_store, limit, per_video_cap, per_shot_cap);
        self.cached_top_n = Some((limit, per_video_cap, per_shot_cap, result.clone()));
        result
    }

    /// Same as [`Self::top_n`] but for each selected frame also includes its
    /// immediate temporal neighbours in the same video, adjacent to the
    /// anchor, preserving order.
    pub fn top_n_with_context(
        &mut self,
        frame_store: &FrameStore,
        limit: usize,
        per_video_cap: usize,
        per_shot_cap: usize,
    ) -> Vec<FrameId> {
        let anchors = self.top_n(frame_store, limit, per_video_cap, per_shot_cap);
        let mut out = Vec::with_capacity(anchors.len() * 3);
        for anchor in anchors {
            let Some(frame) = frame_store.get(anchor) else {
                out.push(anchor);
                continue;
            };
            let video_frames = frame_store.all_frames_of_video(frame.video_id);
            let pos = video_frames
                .iter()
                .position(|f| f.frame_id == anchor)
                .unwrap_or(0);
            if pos > 0 {
                out.push(video_frames[pos - 1].frame_id);
            }
            out.push(anchor);
            if pos + 1 < video_frames.len() {
                out.push(video_frames[pos + 1].frame_id);
            }
        }
        out
    }

    /// Draws `k` frame IDs without replacement with probability proportional
    /// to `scores[i]^temperature` among unmasked frames.
    pub fn weighted_sample(&self, k: usize, temperature: f32) -> Vec<FrameId> {
        let candidates: Vec<(usize, f32)> = self
            .mask
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| (i, self.scores[i].max(0.0).powf(temperature)))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        let weights: Vec<f32> = candidates.iter().map(|(_, w)| *w).collect();
        let k = k.min(candidates.len());

        let mut rng = rand::thread_rng();
        match sample_weighted(&mut rng, candidates.len(), |i| weights[i], k) {
            Ok(indices) => indices.into_iter().map(|idx| candidates[idx].0 as FrameId).collect(),
            Err(_) => candidates.iter().take(k).map(|(i, _)| *i as FrameId).collect(),
        }
    }

    /// Position of `frame_id` in descending sort (0-based); ties broken as
    /// in `top_n` (lower frame_id first).
    pub fn frame_rank(&self, frame_id: FrameId) -> usize {
        let target = self.scores[frame_id as usize];
        let mut rank = 0;
        for i in 0..self.n {
            if i as FrameId == frame_id {
                continue;
            }
            let beats = self.scores[i] > target
                || (self.scores[i] == target && (i as FrameId) < frame_id);
            if beats {
                rank += 1;
            }
        }
        rank
    }
}
