//! Shared per-video / per-shot capped top-N selection.
//!
//! Used by both [`crate::feature_store::FeatureStore::top_knn`] and
//! [`crate::score_model::ScoreModel::top_n`] — the cap policy (§4.9) is the
//! same selection rule wherever a frame list is presented.

use crate::frame_store::{FrameId, FrameStore};
use std::collections::HashMap;

/// A cap of `0` means "uncapped".
pub fn select_with_caps(
    mut scored: Vec<(FrameId, f32)>,
    frame_store: &FrameStore,
    limit: usize,
    per_video_cap: usize,
    per_shot_cap: usize,
) -> Vec<FrameId> {
    // Descending score, tie-break by ascending frame_id.
    scored.sort_by(|(ida, sa), (idb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ida.cmp(idb))
    });

    let mut per_video: HashMap<u32, usize> = HashMap::new();
    let mut per_shot: HashMap<(u32, u32), usize> = HashMap::new();
    let mut out = Vec::with_capacity(limit.min(scored.len()));

    for (frame_id, _) in scored {
        if out.len() >= limit {
            break;
        }
        let Some(frame) = frame_store.get(frame_id) else {
            continue;
        };

        if per_video_cap > 0 {
            let count = per_video.entry(frame.video_id).or_insert(0);
            if *count >= per_video_cap {
                continue;
            }
        }
        if per_shot_cap > 0 {
            let count = per_shot.entry((frame.video_id, frame.shot_id)).or_insert(0);
            if *count >= per_shot_cap {
                continue;
            }
        }

        *per_video.entry(frame.video_id).or_insert(0) += 1;
        *per_shot.entry((frame.video_id, frame.shot_id)).or_insert(0) += 1;
        out.push(frame_id);
    }

    out
}
