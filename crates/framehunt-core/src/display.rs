//! C9 — DisplayRouter: the seven presentation views, paging, and the
//! "shown" / result-log side channels.

use crate::feature_store::FeatureStore;
use crate::frame_store::{FrameId, FrameStore};
use crate::score_model::ScoreModel;
use crate::som::{SomWorker, IMAGE_ID_ERR_VAL};
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayType {
    Rand,
    TopN,
    TopNContext,
    Som,
    Relocation,
    VideoDetail,
    TopKnn,
}

pub struct DisplayRequest {
    pub disp_type: DisplayType,
    /// The example frame for `Relocation`/`VideoDetail`/`TopKnn`.
    pub example_frame: Option<FrameId>,
    /// Which per-moment SOM worker to use for `Relocation`.
    pub relocation_moment: usize,
    pub page: usize,
    pub force_log: bool,
}

pub struct DisplayConfig {
    pub page_size: usize,
    pub per_video_cap: usize,
    pub per_shot_cap: usize,
    /// How many frames to precompute into `current_display` for the
    /// list-based views (TopN, TopNContext, TopKnn, Rand, VideoDetail).
    /// SOM/Relocation views are bounded by the worker's fixed grid instead.
    pub total_limit: usize,
}

/// Mutable session-owned state the router reads and updates in place.
pub struct DisplayState {
    pub current_display: Vec<FrameId>,
    pub curr_disp_type: DisplayType,
    pub shown: BTreeSet<FrameId>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            current_display: Vec::new(),
            curr_disp_type: DisplayType::TopN,
            shown: BTreeSet::new(),
        }
    }
}

pub struct ShowOutcome {
    /// The page the caller should render.
    pub page_frames: Vec<FrameId>,
    /// Whether a "shown this display" log event should be emitted (page 0
    /// of a freshly computed display only).
    pub should_log_show: bool,
    /// Whether the result-log side channel should fire (§4.9).
    pub should_log_results: bool,
}

pub struct DisplayRouter;

impl DisplayRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn show(
        &self,
        request: &DisplayRequest,
        state: &mut DisplayState,
        config: &DisplayConfig,
        frame_store: &FrameStore,
        feature_store: &FeatureStore,
        scores: &mut ScoreModel,
        som_worker: &SomWorker,
        relocation_som_workers: &[SomWorker],
    ) -> DisplayResult {
        let previous_disp_type = state.curr_disp_type;
        let recompute = request.page == 0 || request.disp_type != previous_disp_type;

        if recompute {
            let ids = Self::compute(
                request,
                config,
                frame_store,
                feature_store,
                scores,
                som_worker,
                relocation_som_workers,
            );
            match ids {
                Some(ids) => state.current_display = ids,
                None => return DisplayResult::NotReady,
            }
            state.curr_disp_type = request.disp_type;
        }

        let start = request.page * config.page_size;
        let end = (start + config.page_size).min(state.current_display.len());
        let page_frames = if start >= state.current_display.len() {
            Vec::new()
        } else {
            state.current_display[start..end].to_vec()
        };

        for &id in &page_frames {
            if id != IMAGE_ID_ERR_VAL {
                state.shown.insert(id);
            }
        }

        let should_log_show = recompute && request.page == 0;
        let transitioned_from_topknn_to_list = previous_disp_type == DisplayType::TopKnn
            && matches!(
                request.disp_type,
                DisplayType::TopN | DisplayType::TopNContext | DisplayType::Rand | DisplayType::Som
            );
        let should_log_results = request.force_log
            || transitioned_from_topknn_to_list
            || (recompute && request.disp_type == DisplayType::TopKnn);

        DisplayResult::Shown(ShowOutcome {
            page_frames,
            should_log_show,
            should_log_results,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn compute(
        request: &DisplayRequest,
        config: &DisplayConfig,
        frame_store: &FrameStore,
        feature_store: &FeatureStore,
        scores: &mut ScoreModel,
        som_worker: &SomWorker,
        relocation_som_workers: &[SomWorker],
    ) -> Option<Vec<FrameId>> {
        match request.disp_type {
            DisplayType::TopN => Some(scores.top_n(
                frame_store,
                config.total_limit,
                config.per_video_cap,
                config.per_shot_cap,
            )),
            DisplayType::TopNContext => Some(scores.top_n_with_context(
                frame_store,
                config.total_limit,
                config.per_video_cap,
                config.per_shot_cap,
            )),
            DisplayType::Rand => {
                let mut ids: Vec<FrameId> = (0..frame_store.len() as FrameId)
                    .filter(|&id| scores.mask()[id as usize])
                    .collect();
                let mut rng = rand::thread_rng();
                ids.shuffle(&mut rng);
                ids.truncate(config.total_limit);
                Some(ids)
            }
            DisplayType::Som => {
                if !som_worker.map_ready() {
                    return None;
                }
                Some(som_worker.get_display(scores.scores()))
            }
            DisplayType::Relocation => {
                let worker = relocation_som_workers.get(request.relocation_moment)?;
                if !worker.map_ready() {
                    return None;
                }
                Some(worker.get_display(scores.scores()))
            }
            DisplayType::VideoDetail => {
                let frame_id = request.example_frame?;
                let video_id = frame_store.video_of(frame_id)?;
                Some(
                    frame_store
                        .all_frames_of_video(video_id)
                        .iter()
                        .map(|f| f.frame_id)
                        .collect(),
                )
            }
            DisplayType::TopKnn => {
                let frame_id = request.example_frame?;
                Some(feature_store.top_knn(
                    frame_id,
                    frame_store,
                    config.total_limit,
                    config.per_video_cap,
                    config.per_shot_cap,
                ))
            }
        }
    }
}

pub enum DisplayResult {
    Shown(ShowOutcome),
    /// A SOM-backed display was requested before the map was ready; the
    /// router never blocks for it (§5).
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_store::{FeatureMatrix, FeatureStore};
    use crate::frame_store::Frame;

    fn setup(n: u32) -> (FrameStore, FeatureStore, ScoreModel) {
        let frame_store = FrameStore::new(
            (0..n)
                .map(|i| Frame {
                    frame_id: i,
                    video_id: 0,
                    shot_id: 0,
                    frame_number: i,
                    weekday: None,
                    hour: None,
                    year: None,
                })
                .collect(),
        );
        let feature_store = FeatureStore::new(
            FeatureMatrix::new((0..n).map(|_| vec![1.0, 0.0]).collect()),
            None,
        );
        let scores = ScoreModel::new(n as usize);
        (frame_store, feature_store, scores)
    }

    #[test]
    fn topn_display_populates_shown_and_logs_on_page_zero() {
        let (frame_store, feature_store, mut scores) = setup(5);
        let som_worker = SomWorker::new(2, 2);
        let mut state = DisplayState::default();
        let config = DisplayConfig { page_size: 2, per_video_cap: 0, per_shot_cap: 0, total_limit: 5 };
        let request = DisplayRequest {
            disp_type: DisplayType::TopN,
            example_frame: None,
            relocation_moment: 0,
            page: 0,
            force_log: false,
        };
        let result = DisplayRouter.show(
            &request, &mut state, &config, &frame_store, &feature_store, &mut scores, &som_worker, &[],
        );
        match result {
            DisplayResult::Shown(outcome) => {
                assert_eq!(outcome.page_frames.len(), 2);
                assert!(outcome.should_log_show);
            }
            DisplayResult::NotReady => panic!("expected Shown"),
        }
        assert_eq!(state.shown.len(), 2);
    }

    #[test]
    fn som_display_not_ready_returns_not_ready() {
        let (frame_store, feature_store, mut scores) = setup(4);
        let som_worker = SomWorker::new(2, 2);
        let mut state = DisplayState::default();
        let config = DisplayConfig { page_size: 4, per_video_cap: 0, per_shot_cap: 0, total_limit: 4 };
        let request = DisplayRequest {
            disp_type: DisplayType::Som,
            example_frame: None,
            relocation_moment: 0,
            page: 0,
            force_log: false,
        };
        let result = DisplayRouter.show(
            &request, &mut state, &config, &frame_store, &feature_store, &mut scores, &som_worker, &[],
        );
        assert!(matches!(result, DisplayResult::NotReady));
    }

    #[test]
    fn topknn_logs_results_on_first_computed_page() {
        let (frame_store, feature_store, mut scores) = setup(5);
        let som_worker = SomWorker::new(2, 2);
        let mut state = DisplayState::default();
        let config = DisplayConfig { page_size: 2, per_video_cap: 0, per_shot_cap: 0, total_limit: 5 };
        let request = DisplayRequest {
            disp_type: DisplayType::TopKnn,
            example_frame: Some(0),
            relocation_moment: 0,
            page: 0,
            force_log: false,
        };
        let result = DisplayRouter.show(
            &request, &mut state, &config, &frame_store, &feature_store, &mut scores, &som_worker, &[],
        );
        match result {
            DisplayResult::Shown(outcome) => {
                assert!(outcome.should_log_results);
                assert!(outcome.should_log_show);
            }
            DisplayResult::NotReady => panic!("expected Shown"),
        }
    }

    #[test]
    fn topknn_does_not_relog_results_when_paging_same_display() {
        let (frame_store, feature_store, mut scores) = setup(5);
        let som_worker = SomWorker::new(2, 2);
        let mut state = DisplayState::default();
        state.curr_disp_type = DisplayType::TopKnn;
        state.current_display = (0..5).collect();
        let config = DisplayConfig { page_size: 2, per_video_cap: 0, per_shot_cap: 0, total_limit: 5 };
        let request = DisplayRequest {
            disp_type: DisplayType::TopKnn,
            example_frame: Some(0),
            relocation_moment: 0,
            page: 1,
            force_log: false,
        };
        let result = DisplayRouter.show(
            &request, &mut state, &config, &frame_store, &feature_store, &mut scores, &som_worker, &[],
        );
        match result {
            DisplayResult::Shown(outcome) => {
                assert!(!outcome.should_log_results);
                assert!(!outcome.should_log_show);
            }
            DisplayResult::NotReady => panic!("expected Shown"),
        }
    }
}
