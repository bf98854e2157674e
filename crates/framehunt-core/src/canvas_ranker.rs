//! C4 — CanvasRanker: positioned sub-queries (text/bitmap on a rectangle).

use crate::feature_store::{cosine_similarity, FeatureStore};
use crate::keyword_ranker::KeywordRanker;
use crate::query::{CanvasPayload, CanvasSubquery, Rect};

/// External collaborator: a pure function `image -> vec`, supplied by the
/// (out-of-scope) image feature extractor.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, w: u32, h: u32, rgb: &[u8]) -> Vec<f32>;
}

/// The fixed grid of rectangles the `frame x regions x d` tensor is indexed
/// by.
pub struct RegionGrid {
    pub regions: Vec<Rect>,
}

impl RegionGrid {
    /// The region with maximum IoU against `rect`; query-independent, so it
    /// is computed once per sub-query rather than per frame (see
    /// `SPEC_FULL.md` D.5). Ties broken by lowest region index.
    pub fn best_region(&self, rect: &Rect) -> usize {
        self.regions
            .iter()
            .enumerate()
            .map(|(i, region)| (i, region.iou(rect)))
            .fold((0usize, f32::MIN), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            })
            .0
    }
}

/// `frame x region -> d-dim vector`, pre-stored per frame.
pub struct RegionTensor {
    /// `regions[frame_id][region_index]`.
    pub frames: Vec<Vec<Vec<f32>>>,
}

impl RegionTensor {
    pub fn region_vec(&self, frame_id: usize, region: usize) -> Option<&[f32]> {
        self.frames
            .get(frame_id)
            .and_then(|regions| regions.get(region))
            .map(|v| v.as_slice())
    }
}

pub struct CanvasRanker {
    grid: std::sync::Arc<RegionGrid>,
    tensor: std::sync::Arc<RegionTensor>,
}

impl CanvasRanker {
    pub fn new(grid: std::sync::Arc<RegionGrid>, tensor: std::sync::Arc<RegionTensor>) -> Self {
        Self { grid, tensor }
    }

    fn subquery_vec(
        &self,
        keyword_ranker: &KeywordRanker,
        image_encoder: &dyn ImageEncoder,
        subquery: &CanvasSubquery,
    ) -> Option<Vec<f32>> {
        match &subquery.payload {
            CanvasPayload::Text(text) => keyword_ranker.embed(text),
            CanvasPayload::Bitmap { w, h, rgb } => Some(image_encoder.encode(*w, *h, rgb)),
        }
    }

    /// Accumulates `1 - cos(sub_query_vec, region_vec)` over every
    /// sub-query. `positioned` selects rectangle-aware region scoring versus
    /// a positionless fallback against the whole-frame primary embedding.
    pub fn score(
        &self,
        feature_store: &FeatureStore,
        keyword_ranker: &KeywordRanker,
        image_encoder: &dyn ImageEncoder,
        subqueries: &[CanvasSubquery],
        positioned: bool,
        out_inv_scores: &mut [f32],
    ) -> bool {
        out_inv_scores.fill(0.0);
        let mut any_resolved = false;

        for subquery in subqueries {
            let Some(vec) = self.subquery_vec(keyword_ranker, image_encoder, subquery) else {
                continue;
            };
            any_resolved = true;

            if positioned {
                let region = self.grid.best_region(&subquery.rect);
                for (frame_id, out) in out_inv_scores.iter_mut().enumerate() {
                    if let Some(region_vec) = self.tensor.region_vec(frame_id, region) {
                        *out += 1.0 - cosine_similarity(&vec, region_vec);
                    }
                }
            } else {
                for (frame_id, out) in out_inv_scores.iter_mut().enumerate() {
                    if let Some(row) = feature_store.primary().row(frame_id as u32) {
                        *out += 1.0 - cosine_similarity(&vec, row);
                    }
                }
            }
        }

        any_resolved
    }
}
