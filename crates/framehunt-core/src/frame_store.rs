//! C1 — FrameStore: the immutable catalogue of keyframes.

use std::ops::Range;

/// A stable integer identifier into the frame catalogue, dense `0..N`.
pub type FrameId = u32;
pub type VideoId = u32;
pub type ShotId = u32;

/// One sampled keyframe. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub frame_id: FrameId,
    pub video_id: VideoId,
    pub shot_id: ShotId,
    /// Position within the video, used to order temporal chains.
    pub frame_number: u32,
    pub weekday: Option<u8>,
    pub hour: Option<u8>,
    pub year: Option<i32>,
}

/// The immutable catalogue. Frames sharing a `video_id` are stored
/// contiguously by `frame_id` in ascending `frame_number` order, which is
/// what lets [`FrameStore::all_frames_of_video`] return a live range rather
/// than a copy.
#[derive(Debug, Clone)]
pub struct FrameStore {
    frames: Vec<Frame>,
    video_ranges: Vec<Range<usize>>,
}

impl FrameStore {
    /// Builds a store from frames already in `frame_id` order. Panics if the
    /// contiguous-by-video invariant is violated; this is a load-time
    /// invariant, not a runtime condition the caller can recover from.
    pub fn new(frames: Vec<Frame>) -> Self {
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(f.frame_id as usize, i, "frame_id must equal its index");
        }

        let mut video_ranges: Vec<Range<usize>> = Vec::new();
        let mut start = 0usize;
        for i in 1..=frames.len() {
            let boundary = i == frames.len() || frames[i].video_id != frames[start].video_id;
            if boundary {
                let video_id = frames[start].video_id as usize;
                if video_ranges.len() <= video_id {
                    video_ranges.resize(video_id + 1, 0..0);
                }
                video_ranges[video_id] = start..i;
                start = i;
            }
        }

        Self { frames, video_ranges }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame_id: FrameId) -> Option<&Frame> {
        self.frames.get(frame_id as usize)
    }

    pub fn video_of(&self, frame_id: FrameId) -> Option<VideoId> {
        self.get(frame_id).map(|f| f.video_id)
    }

    /// Returns the contiguous slice of frames belonging to `video_id`, in
    /// ascending `frame_number` order.
    pub fn all_frames_of_video(&self, video_id: VideoId) -> &[Frame] {
        match self.video_ranges.get(video_id as usize) {
            Some(range) => &self.frames[range.clone()],
            None => &[],
        }
    }

    pub fn ids_to_frames<'a>(&'a self, ids: &'a [FrameId]) -> Vec<Option<&'a Frame>> {
        ids.iter().map(|&id| self.get(id)).collect()
    }

    pub fn has_temporal_metadata(&self) -> bool {
        self.frames
            .iter()
            .any(|f| f.weekday.is_some() || f.hour.is_some() || f.year.is_some())
    }
}
