//! C10 — SessionCore: the top-level orchestrator.
//!
//! Owns a [`SearchContext`], the history stack, and the current query;
//! drives a rescore through the strict `ranker -> normalize ->
//! apply_temporals -> filter -> bayes` sequence (§5), and exposes the
//! public session API.

use crate::canvas_ranker::{CanvasRanker, ImageEncoder};
use crate::display::{DisplayConfig, DisplayRequest, DisplayResult, DisplayRouter, DisplayState, DisplayType};
use crate::error::{EngineError, Result};
use crate::eval_client::{EvalClient, SubmitResult};
use crate::feature_store::FeatureStore;
use crate::filter_engine::FilterEngine;
use crate::frame_store::{FrameId, FrameStore};
use crate::keyword_ranker::KeywordRanker;
use crate::logging::SessionLog;
use crate::query::{Filters, Query, TemporalQuery, MAX_TEMPORAL_SIZE};
use crate::relocation_ranker::RelocationRanker;
use crate::score_model::ScoreModel;
use crate::som::SomWorker;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Exponent used by `apply_temporals` to turn inverse-scores into a
/// probability-like distribution (§4.10 step 4: "power = 50").
const TEMPORAL_POWER: f32 = 50.0;
const SOM_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which rankers contributed to the current score, for display/logging and
/// for diagnosing a session's behaviour — not consulted by the arithmetic
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsedTools {
    pub text_used: bool,
    pub canvas_used: bool,
    pub relocation_used: bool,
    pub temporal_query_used: bool,
    pub bayes_used: bool,
    pub filters_used: bool,
}

/// One full snapshot of session state (§3).
#[derive(Clone, PartialEq)]
pub struct SearchContext {
    pub id: Uuid,
    pub scores: ScoreModel,
    pub likes: BTreeSet<FrameId>,
    pub shown: BTreeSet<FrameId>,
    pub last_temporal_queries: Vec<TemporalQuery>,
    pub filters: Filters,
    pub used_tools: UsedTools,
    pub current_display: Vec<FrameId>,
    pub curr_disp_type: DisplayType,
    pub temporal_size: usize,
    pub prev_query: Option<Query>,
    pub screenshot_path: Option<String>,
    pub label: Option<String>,
    pub targets: Vec<FrameId>,
}

impl SearchContext {
    fn new(n: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            scores: ScoreModel::new(n),
            likes: BTreeSet::new(),
            shown: BTreeSet::new(),
            last_temporal_queries: Vec::new(),
            filters: Filters::default(),
            used_tools: UsedTools::default(),
            current_display: Vec::new(),
            curr_disp_type: DisplayType::TopN,
            temporal_size: 0,
            prev_query: None,
            screenshot_path: None,
            label: None,
            targets: Vec::new(),
        }
    }
}

/// The session-owned state that survives a context switch (§3).
struct UserContext {
    ctx: SearchContext,
    history: Vec<SearchContext>,
    bookmarks: BTreeSet<FrameId>,
    videos_seen: BTreeSet<u32>,
    force_result_log: bool,
}

pub struct RescoreResult {
    pub id: Uuid,
    pub history: Vec<SearchContext>,
    pub targets: Vec<FrameId>,
    pub target_position: Option<usize>,
}

pub struct SessionCore {
    frame_store: Arc<FrameStore>,
    feature_store: Arc<FeatureStore>,
    keyword_ranker: Arc<KeywordRanker>,
    canvas_ranker: CanvasRanker,
    image_encoder: Arc<dyn ImageEncoder>,
    filter_engine: FilterEngine,
    relocation_ranker: RelocationRanker,
    som_worker: SomWorker,
    temp_som_workers: Vec<SomWorker>,
    logger: Arc<dyn SessionLog>,
    eval_client: Arc<dyn EvalClient>,
    display_config: DisplayConfig,
    dataset_parts_interval: [(usize, usize); 2],
    has_metadata: bool,
    user: UserContext,
}

impl SessionCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame_store: Arc<FrameStore>,
        feature_store: Arc<FeatureStore>,
        keyword_ranker: Arc<KeywordRanker>,
        canvas_ranker: CanvasRanker,
        image_encoder: Arc<dyn ImageEncoder>,
        logger: Arc<dyn SessionLog>,
        eval_client: Arc<dyn EvalClient>,
        display_config: DisplayConfig,
        som_grid: (usize, usize),
        has_metadata: bool,
    ) -> Self {
        let n = frame_store.len();
        Self {
            frame_store,
            feature_store,
            keyword_ranker,
            canvas_ranker,
            image_encoder,
            filter_engine: FilterEngine,
            relocation_ranker: RelocationRanker,
            som_worker: SomWorker::new(som_grid.0, som_grid.1),
            temp_som_workers: (0..MAX_TEMPORAL_SIZE).map(|_| SomWorker::new(som_grid.0, som_grid.1)).collect(),
            logger,
            eval_client,
            display_config,
            dataset_parts_interval: [(0, n), (0, n)],
            has_metadata,
            user: UserContext {
                ctx: SearchContext::new(n),
                history: Vec::new(),
                bookmarks: BTreeSet::new(),
                videos_seen: BTreeSet::new(),
                force_result_log: false,
            },
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.has_metadata
    }

    fn current_result(&self) -> RescoreResult {
        RescoreResult {
            id: self.user.ctx.id,
            history: self.user.history.clone(),
            targets: self.user.ctx.targets.clone(),
            target_position: None,
        }
    }

    fn primary_rows_snapshot(&self) -> Arc<Vec<Vec<f32>>> {
        Arc::new(self.feature_store.primary().rows().to_vec())
    }

    /// §4.10: the central orchestration step.
    pub fn rescore(&mut self, query: Query, benchmark: bool) -> Result<RescoreResult> {
        query.validate()?;
        if benchmark {
            self.reset_search_session()?;
        }
        self.do_rescore(query, benchmark)
    }

    fn do_rescore(&mut self, mut query: Query, benchmark: bool) -> Result<RescoreResult> {
        let history_len = self.user.history.len();
        if query.src_search_ctx_id > history_len {
            // Inconsistent client state (§7 error kind 5): return the
            // current state unchanged rather than mutating or erroring.
            return Ok(self.current_result());
        }

        if query.src_search_ctx_id == history_len {
            backfill_screenshot(&mut self.user.ctx, &query);
        } else {
            backfill_screenshot(&mut self.user.history[query.src_search_ctx_id], &query);
        }

        self.user.ctx.id = Uuid::new_v4();

        for &id in &query.relevance_feedback {
            self.user.ctx.likes.insert(id);
        }

        if query.temporal_queries != self.user.ctx.last_temporal_queries {
            self.user.ctx.scores.reset(1.0);
            self.user.ctx.used_tools = UsedTools::default();

            let n = self.frame_store.len();
            let mut moment = 0usize;

            for query_moment in query.temporal_queries.iter() {
                if query_moment.is_empty() {
                    continue;
                }
                let mut inv = vec![0.0f32; n];
                match query_moment {
                    TemporalQuery::Empty => unreachable!(),
                    TemporalQuery::Textual(text) => {
                        let wrote = self.keyword_ranker.score(&self.feature_store, text, &mut inv);
                        self.user.ctx.used_tools.text_used |= wrote;
                    }
                    TemporalQuery::Canvas(subqueries) => {
                        let wrote = self.canvas_ranker.score(
                            &self.feature_store,
                            &self.keyword_ranker,
                            self.image_encoder.as_ref(),
                            subqueries,
                            true,
                            &mut inv,
                        );
                        self.user.ctx.used_tools.canvas_used |= wrote;
                    }
                    TemporalQuery::Relocation(frame_id) => {
                        let wrote = self.relocation_ranker.score(&self.feature_store, *frame_id, &mut inv);
                        self.user.ctx.used_tools.relocation_used |= wrote;
                    }
                }
                self.user.ctx.scores.temp_mut(moment).copy_from_slice(&inv);
                moment += 1;
            }

            let k = moment;
            self.user.ctx.used_tools.temporal_query_used = k > 1;
            self.user.ctx.temporal_size = k;
            self.user.ctx.scores.normalize(k);
            self.user.ctx.scores.apply_temporals(k, &self.frame_store, TEMPORAL_POWER);
            self.user.ctx.scores.normalize(k);
            self.user.ctx.last_temporal_queries = query.temporal_queries.clone();
        }

        self.user.ctx.curr_disp_type = DisplayType::TopN;

        self.filter_engine.apply(
            &mut self.user.ctx.scores,
            &self.frame_store,
            &query.filters,
            self.dataset_parts_interval,
        );
        self.user.ctx.filters = query.filters;
        self.user.ctx.used_tools.filters_used = !query.filters.is_default();

        self.ensure_shown_seeded();
        let likes: Vec<FrameId> = self.user.ctx.likes.iter().copied().collect();
        let shown: Vec<FrameId> = self.user.ctx.shown.iter().copied().collect();
        if !likes.is_empty() {
            self.user.ctx.scores.apply_bayes(&likes, &shown, self.feature_store.primary());
            self.user.ctx.used_tools.bayes_used = true;
        }

        let rows = self.primary_rows_snapshot();
        let main_weights = Arc::new(self.user.ctx.scores.scores().to_vec());
        self.som_worker.start_work(Arc::clone(&rows), main_weights);
        for i in 0..self.user.ctx.temporal_size.min(self.temp_som_workers.len()) {
            let weights = Arc::new(self.user.ctx.scores.temp(i).to_vec());
            self.temp_som_workers[i].start_work(Arc::clone(&rows), weights);
        }

        self.user.ctx.shown.clear();
        self.user.ctx.likes.clear();
        self.user.ctx.prev_query = Some(query);

        if !benchmark {
            self.push_search_ctx();
        }

        let top_n = self.user.ctx.scores.top_n(
            &self.frame_store,
            self.display_config.total_limit,
            self.display_config.per_video_cap,
            self.display_config.per_shot_cap,
        );
        self.logger.log_rescore(self.user.ctx.temporal_size, &top_n);
        self.logger.log_results(&top_n);

        Ok(self.current_result())
    }

    fn push_search_ctx(&mut self) {
        self.user.history.push(self.user.ctx.clone());
    }

    /// Seeds `shown` from page 0 of the top-N display before applying Bayes
    /// so a like is never compared against an empty shown set
    /// (`SPEC_FULL.md` B.5).
    fn ensure_shown_seeded(&mut self) {
        if !self.user.ctx.likes.is_empty() && self.user.ctx.shown.is_empty() {
            let ids = self.user.ctx.scores.top_n(
                &self.frame_store,
                self.display_config.page_size,
                self.display_config.per_video_cap,
                self.display_config.per_shot_cap,
            );
            self.user.ctx.shown.extend(ids);
        }
    }

    /// Clears shown/likes/last-temporal-queries, resets scores to uniform,
    /// restarts every SOM worker, regenerates known-item targets, then runs
    /// a phony rescore to produce the initial display.
    pub fn reset_search_session(&mut self) -> Result<RescoreResult> {
        self.user.ctx.shown.clear();
        self.user.ctx.likes.clear();
        self.user.ctx.last_temporal_queries.clear();
        self.user.ctx.scores.reset(1.0);
        self.logger.log_reset_search();

        let rows = self.primary_rows_snapshot();
        let uniform = Arc::new(vec![1.0f32; self.frame_store.len()]);
        self.som_worker.start_work(Arc::clone(&rows), Arc::clone(&uniform));
        for worker in self.temp_som_workers.iter_mut() {
            worker.start_work(Arc::clone(&rows), Arc::clone(&uniform));
        }

        // Known-item target regeneration is driven by the benchmark harness,
        // which is out of scope (§1); there is nothing to regenerate here.
        self.user.ctx.targets = Vec::new();

        self.do_rescore(Query { src_search_ctx_id: self.user.history.len(), ..Query::default() }, false)
    }

    pub fn like_frames(&mut self, ids: &[FrameId]) -> Vec<bool> {
        let logger = Arc::clone(&self.logger);
        toggle_membership(&mut self.user.ctx.likes, ids, |id, liked| logger.log_like(id, liked))
    }

    pub fn bookmark_frames(&mut self, ids: &[FrameId]) -> Vec<bool> {
        let logger = Arc::clone(&self.logger);
        toggle_membership(&mut self.user.bookmarks, ids, |id, bookmarked| logger.log_bookmark(id, bookmarked))
    }

    /// Returns the requested page, or an empty list if a SOM-backed display
    /// was requested before its map was ready (§7 error kind 3 — recovered
    /// locally, never propagated).
    pub fn get_display(&mut self, mut request: DisplayRequest) -> Vec<FrameId> {
        self.logger.poll();
        request.force_log = request.force_log || self.user.force_result_log;

        let mut state = DisplayState {
            current_display: self.user.ctx.current_display.clone(),
            curr_disp_type: self.user.ctx.curr_disp_type,
            shown: self.user.ctx.shown.clone(),
        };

        let result = DisplayRouter.show(
            &request,
            &mut state,
            &self.display_config,
            &self.frame_store,
            &self.feature_store,
            &mut self.user.ctx.scores,
            &self.som_worker,
            &self.temp_som_workers,
        );

        self.user.ctx.current_display = state.current_display;
        self.user.ctx.curr_disp_type = state.curr_disp_type;
        self.user.ctx.shown = state.shown;

        for frame_id in &self.user.ctx.current_display {
            if let Some(video_id) = self.frame_store.video_of(*frame_id) {
                self.user.videos_seen.insert(video_id);
            }
        }

        match result {
            DisplayResult::NotReady => Vec::new(),
            DisplayResult::Shown(outcome) => {
                if outcome.should_log_show {
                    self.logger.log_show_display(self.user.ctx.curr_disp_type);
                }
                if outcome.should_log_results {
                    let top_n = self.user.ctx.scores.top_n(
                        &self.frame_store,
                        self.display_config.total_limit,
                        self.display_config.per_video_cap,
                        self.display_config.per_shot_cap,
                    );
                    self.logger.log_results(&top_n);
                }
                self.user.force_result_log = false;
                outcome.page_frames
            }
        }
    }

    /// Blocks (busy-waiting with 10ms sleeps, §5) until the main SOM is
    /// ready, then replaces `ctx` with a copy of `history[index]`.
    ///
    /// `src_search_ctx_id` addresses the history entry the screenshot/label
    /// backfill applies to (the *source* context the client was viewing when
    /// it captured them), which is not necessarily `index` (the target
    /// being switched to).
    pub fn switch_search_context(
        &mut self,
        index: usize,
        src_search_ctx_id: usize,
        screenshot_path: Option<String>,
        label: Option<String>,
    ) -> Result<()> {
        while !self.som_worker.map_ready() {
            std::thread::sleep(SOM_POLL_INTERVAL);
        }

        if let Some(src) = self.user.history.get_mut(src_search_ctx_id) {
            if src.screenshot_path.is_none() {
                src.screenshot_path = screenshot_path;
                src.label = label;
            }
        }

        if index >= self.user.history.len() {
            return Err(EngineError::OutOfRange { what: "history index", value: index as i64 });
        }

        self.logger.log_search_context_switch(index);
        self.user.ctx = self.user.history[index].clone();

        let rows = self.primary_rows_snapshot();
        let main_weights = Arc::new(self.user.ctx.scores.scores().to_vec());
        self.som_worker.start_work(Arc::clone(&rows), main_weights);
        for i in 0..self.user.ctx.temporal_size.min(self.temp_som_workers.len()) {
            let weights = Arc::new(self.user.ctx.scores.temp(i).to_vec());
            self.temp_som_workers[i].start_work(Arc::clone(&rows), weights);
        }

        self.user.force_result_log = true;
        Ok(())
    }

    pub fn submit(&self, frame_id: FrameId) -> SubmitResult {
        let result = self.eval_client.submit(frame_id);
        self.logger.log_submit(frame_id, result == SubmitResult::Correct);
        result
    }

    /// Case-insensitive at the call boundary (`SPEC_FULL.md` B.6); an empty
    /// prefix short-circuits to empty.
    pub fn autocomplete_keywords(&self, prefix: &str, count: usize) -> Vec<u32> {
        if prefix.is_empty() {
            return Vec::new();
        }
        self.keyword_ranker.find(&prefix.to_lowercase(), count)
    }

    pub fn ctx(&self) -> &SearchContext {
        &self.user.ctx
    }

    pub fn history(&self) -> &[SearchContext] {
        &self.user.history
    }
}

fn backfill_screenshot(ctx: &mut SearchContext, query: &Query) {
    if ctx.screenshot_path.is_none() {
        ctx.screenshot_path = query.screenshot_path.clone();
        ctx.label = query.label.clone();
    }
}

fn toggle_membership(
    set: &mut BTreeSet<FrameId>,
    ids: &[FrameId],
    mut log: impl FnMut(FrameId, bool),
) -> Vec<bool> {
    ids.iter()
        .map(|&id| {
            let now_present = if set.remove(&id) {
                false
            } else {
                set.insert(id);
                true
            };
            log(id, now_present);
            now_present
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas_ranker::{RegionGrid, RegionTensor};
    use crate::eval_client::NullEvalClient;
    use crate::feature_store::{FeatureMatrix, FeatureStore};
    use crate::frame_store::Frame;
    use crate::logging::NullSessionLog;
    use crate::query::Rect;

    struct StubEncoder;
    impl ImageEncoder for StubEncoder {
        fn encode(&self, _w: u32, _h: u32, _rgb: &[u8]) -> Vec<f32> {
            vec![1.0, 0.0]
        }
    }

    fn build_session(n: u32) -> SessionCore {
        let frame_store = Arc::new(FrameStore::new(
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
        ));
        let feature_store = Arc::new(FeatureStore::new(
            FeatureMatrix::new((0..n).map(|i| vec![(i % 2) as f32, ((i + 1) % 2) as f32]).collect()),
            None,
        ));
        let keyword_ranker = Arc::new(KeywordRanker::new(
            vec![crate::query::Keyword { synset_id: 44, synset_strs: vec!["cat".into()] }],
            vec![vec![1.0, 0.0]],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            "+",
        ));
        let grid = Arc::new(RegionGrid { regions: vec![Rect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }] });
        let tensor = Arc::new(RegionTensor { frames: (0..n as usize).map(|_| vec![vec![1.0, 0.0]]).collect() });
        let canvas_ranker = CanvasRanker::new(grid, tensor);

        SessionCore::new(
            frame_store,
            feature_store,
            keyword_ranker,
            canvas_ranker,
            Arc::new(StubEncoder),
            Arc::new(NullSessionLog),
            Arc::new(NullEvalClient),
            DisplayConfig { page_size: 2, per_video_cap: 0, per_shot_cap: 0, total_limit: n as usize },
            (2, 2),
            false,
        )
    }

    #[test]
    fn rescore_pushes_history_and_clears_likes() {
        let mut session = build_session(4);
        let query = Query {
            temporal_queries: vec![TemporalQuery::Textual("cat".into())],
            src_search_ctx_id: 0,
            ..Default::default()
        };
        session.rescore(query, false).unwrap();
        assert_eq!(session.history().len(), 1);
        assert!(session.ctx().likes.is_empty());
        assert_eq!(session.history().last().unwrap(), session.ctx());
    }

    #[test]
    fn liking_a_frame_twice_is_a_noop() {
        let mut session = build_session(4);
        session.like_frames(&[1]);
        let result = session.like_frames(&[1]);
        assert_eq!(result, vec![false]);
        assert!(session.ctx().likes.is_empty());
    }

    #[test]
    fn inconsistent_history_index_is_a_silent_noop() {
        let mut session = build_session(4);
        let before = session.history().len();
        let query = Query { src_search_ctx_id: 99, ..Default::default() };
        session.rescore(query, false).unwrap();
        assert_eq!(session.history().len(), before);
    }

    #[test]
    fn autocomplete_empty_prefix_short_circuits() {
        let session = build_session(4);
        assert!(session.autocomplete_keywords("", 10).is_empty());
    }

    #[test]
    fn switch_search_context_rejects_out_of_range_index() {
        let mut session = build_session(4);
        let err = session.switch_search_context(0, 0, None, None).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { .. }));
    }
}
