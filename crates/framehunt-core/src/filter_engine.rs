//! C7 — FilterEngine: dataset-/day-/hour-/year-based frame masks.

use crate::frame_store::FrameStore;
use crate::query::Filters;
use crate::score_model::ScoreModel;

pub struct FilterEngine;

impl FilterEngine {
    /// When the filters are default *and* the dataset lacks temporal
    /// metadata, this is a no-op — it does not even reset the mask.
    /// Otherwise it always resets the mask before re-applying, so the pass
    /// is idempotent.
    pub fn apply(
        &self,
        scores: &mut ScoreModel,
        frame_store: &FrameStore,
        filters: &Filters,
        dataset_parts_interval: [(usize, usize); 2],
    ) {
        if filters.is_default() && !frame_store.has_temporal_metadata() {
            return;
        }

        scores.reset_mask();

        for frame_id in 0..frame_store.len() as u32 {
            let Some(frame) = frame_store.get(frame_id) else {
                continue;
            };

            let mut admit = true;
            if let Some(weekday) = frame.weekday {
                if filters.weekdays & (1 << weekday) == 0 {
                    admit = false;
                }
            }
            if let Some(hour) = frame.hour {
                if hour < filters.hour_from || hour > filters.hour_to {
                    admit = false;
                }
            }
            if let Some(year) = frame.year {
                if year < filters.year_from || year > filters.year_to {
                    admit = false;
                }
            }

            let idx = frame_id as usize;
            let in_part_0 = idx >= dataset_parts_interval[0].0 && idx < dataset_parts_interval[0].1;
            let in_part_1 = idx >= dataset_parts_interval[1].0 && idx < dataset_parts_interval[1].1;
            let part_ok = (filters.dataset_parts[0] && in_part_0)
                || (filters.dataset_parts[1] && in_part_1);
            if !part_ok {
                admit = false;
            }

            if !admit {
                scores.set_mask(frame_id, false);
            }
        }
    }
}
