//! Synthetic fixtures for exercising `SessionCore` without a real SOMHunter
//! dataset: a handful of videos, each a short run of frames with simple,
//! separable feature rows so similarity/temporal assertions are exact rather
//! than approximate.

use framehunt_core::{
    CanvasRanker, EngineError, Frame, FrameId, FrameStore, ImageEncoder, KeywordRanker, Keyword,
    NullEvalClient, NullSessionLog, RegionGrid, RegionTensor, Rect,
};
use framehunt_core::{DisplayConfig, FeatureMatrix, FeatureStore, SessionCore};
use std::sync::Arc;

pub const DIM: usize = 4;

pub struct StubImageEncoder;
impl ImageEncoder for StubImageEncoder {
    fn encode(&self, _w: u32, _h: u32, _rgb: &[u8]) -> Vec<f32> {
        vec![1.0, 0.0, 0.0, 0.0]
    }
}

/// 3 videos of 5 frames each, frames in a video share a basis direction so
/// `relocation`/`top_knn` scoring within a video is unambiguous.
pub fn frame_store() -> FrameStore {
    let mut frames = Vec::new();
    let mut frame_id: FrameId = 0;
    for video_id in 0..3u32 {
        for frame_number in 0..5u32 {
            frames.push(Frame {
                frame_id,
                video_id,
                shot_id: video_id * 10 + frame_number / 2,
                frame_number,
                weekday: Some((frame_id % 7) as u8),
                hour: Some((frame_id % 24) as u8),
                year: Some(2020 + (video_id as i32)),
            });
            frame_id += 1;
        }
    }
    FrameStore::new(frames)
}

pub fn feature_store() -> FeatureStore {
    let frame_store = frame_store();
    let rows: Vec<Vec<f32>> = (0..frame_store.len())
        .map(|i| {
            let mut row = vec![0.0; DIM];
            let video = (i / 5) % DIM;
            row[video] = 1.0;
            row
        })
        .collect();
    FeatureStore::new(FeatureMatrix::new(rows), None)
}

pub fn keyword_ranker() -> Arc<KeywordRanker> {
    Arc::new(KeywordRanker::new(
        vec![
            Keyword { synset_id: 1, synset_strs: vec!["car".into(), "automobile".into()] },
            Keyword { synset_id: 2, synset_strs: vec!["dog".into()] },
        ],
        vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
        vec![0.0; DIM],
        vec![0.0; DIM],
        (0..DIM).map(|i| (0..DIM).map(|j| if i == j { 1.0 } else { 0.0 }).collect()).collect(),
        "+",
    ))
}

pub fn canvas_ranker(n: usize) -> CanvasRanker {
    let grid = Arc::new(RegionGrid { regions: vec![Rect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }] });
    let tensor = Arc::new(RegionTensor { frames: (0..n).map(|_| vec![vec![1.0, 0.0, 0.0, 0.0]]).collect() });
    CanvasRanker::new(grid, tensor)
}

pub fn session() -> SessionCore {
    let frame_store = Arc::new(frame_store());
    let feature_store = Arc::new(feature_store());
    let n = frame_store.len();
    SessionCore::new(
        frame_store,
        feature_store,
        keyword_ranker(),
        canvas_ranker(n),
        Arc::new(StubImageEncoder),
        Arc::new(NullSessionLog),
        Arc::new(NullEvalClient),
        DisplayConfig { page_size: 4, per_video_cap: 2, per_shot_cap: 1, total_limit: n },
        (3, 3),
        true,
    )
}

pub fn is_out_of_range(err: &EngineError) -> bool {
    matches!(err, EngineError::OutOfRange { .. })
}
