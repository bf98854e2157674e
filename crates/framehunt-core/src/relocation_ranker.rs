//! C5 — RelocationRanker: query-by-example using one frame's primary row.

use crate::feature_store::FeatureStore;
use crate::frame_store::FrameId;

pub struct RelocationRanker;

impl RelocationRanker {
    /// Scores every frame against `example_frame_id`'s primary row. Returns
    /// `false` (a no-op) if the example frame is unknown; the caller is
    /// responsible for setting `used_tools.relocation_used` on success.
    pub fn score(
        &self,
        feature_store: &FeatureStore,
        example_frame_id: FrameId,
        out_inv_scores: &mut [f32],
    ) -> bool {
        let Some(example) = feature_store.primary().row(example_frame_id) else {
            return false;
        };
        let example = example.to_vec();
        feature_store.score_vs(feature_store.primary(), &example, out_inv_scores);
        true
    }
}
